//! Loading complete model directories from disk.

use std::fs;
use std::path::Path;

use serde_json::json;

use langid_core::LangIdError;
use langid_core::model::identifier::LanguageIdentifier;

/// Writes a one-layer softmax model mapping n-gram `i` to language `i`.
fn write_model_dir(dir: &Path, ngrams: &[&str], languages: &[&str]) {
	fs::create_dir_all(dir).unwrap();
	let size = ngrams.len();
	let mut kernel = vec![0.0f32; size * languages.len()];
	for i in 0..size.min(languages.len()) {
		kernel[i * languages.len() + i] = 2.0;
	}
	let bias = vec![0.0f32; languages.len()];
	let bytes: Vec<u8> = kernel.iter().chain(&bias).flat_map(|x| x.to_le_bytes()).collect();
	fs::write(dir.join("group1-shard1of1.bin"), bytes).unwrap();

	let model = json!({
		"format": "layers-model",
		"generatedBy": "keras v2.4.0",
		"convertedBy": "TensorFlow.js Converter v2.7.0",
		"modelTopology": {
			"keras_version": "2.4.0",
			"backend": "tensorflow",
			"model_config": {
				"class_name": "Sequential",
				"config": {
					"name": "sequential",
					"layers": [{
						"class_name": "Dense",
						"config": {"name": "dense", "units": languages.len(), "activation": "softmax", "use_bias": true, "batch_input_shape": [null, size]}
					}]
				}
			}
		},
		"weightsManifest": [{
			"paths": ["group1-shard1of1.bin"],
			"weights": [
				{"name": "dense/kernel", "shape": [size, languages.len()], "dtype": "float32"},
				{"name": "dense/bias", "shape": [languages.len()], "dtype": "float32"}
			]
		}]
	});
	fs::write(dir.join("model.json"), model.to_string()).unwrap();
	fs::write(dir.join("vocabulary.json"), json!(ngrams).to_string()).unwrap();
	fs::write(dir.join("languages.json"), json!(languages).to_string()).unwrap();
}

#[test]
fn loads_and_guesses() {
	let data = tempfile::tempdir().unwrap();
	write_model_dir(&data.path().join("europe"), &["the", " le ", "der"], &["English", "French", "German"]);

	let identifier = LanguageIdentifier::open(data.path(), "europe").unwrap();
	assert_eq!(identifier.name(), "europe");
	assert_eq!(identifier.vocabulary().len(), 3);
	assert_eq!(identifier.encode("der Hund und der Ball"), vec![0, 0, 2]);

	let prediction = identifier.guess("der Hund und der Ball").unwrap();
	assert_eq!(prediction.len(), 3);
	assert_eq!(prediction.best().unwrap().language, "German");
	let total: f32 = prediction.scores().iter().map(|s| s.probability).sum();
	assert!((total - 1.0).abs() < 1e-5);
}

#[test]
fn lists_model_directories() {
	let data = tempfile::tempdir().unwrap();
	write_model_dir(&data.path().join("b"), &["x"], &["X"]);
	write_model_dir(&data.path().join("a"), &["y"], &["Y"]);
	fs::create_dir(data.path().join("notes")).unwrap();

	let models = LanguageIdentifier::list_models(data.path()).unwrap();
	assert_eq!(models, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn vocabulary_must_match_network() {
	let data = tempfile::tempdir().unwrap();
	let dir = data.path().join("broken");
	write_model_dir(&dir, &["a", "b"], &["A", "B"]);
	fs::write(dir.join("vocabulary.json"), r#"["a", "b", "c"]"#).unwrap();

	let err = LanguageIdentifier::new(&dir).unwrap_err();
	assert!(matches!(err, LangIdError::ShapeMismatch { expected: 3, actual: 2, .. }));
}

#[test]
fn malformed_languages_file() {
	let data = tempfile::tempdir().unwrap();
	let dir = data.path().join("broken");
	write_model_dir(&dir, &["a"], &["A"]);
	fs::write(dir.join("languages.json"), "not json").unwrap();

	let err = LanguageIdentifier::new(&dir).unwrap_err();
	assert!(matches!(err, LangIdError::Json(_)));
}

#[test]
fn missing_directory() {
	let data = tempfile::tempdir().unwrap();
	let err = LanguageIdentifier::open(data.path(), "nothing").unwrap_err();
	assert!(matches!(err, LangIdError::ModelNotFound(_)));
}

#[test]
fn bundled_demo_model() {
	// Copy so the cache file is written to a scratch directory
	let data = tempfile::tempdir().unwrap();
	let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/demo");
	let target = data.path().join("demo");
	fs::create_dir(&target).unwrap();
	for entry in fs::read_dir(&source).unwrap() {
		let path = entry.unwrap().path();
		if path.extension().is_some_and(|ext| ext != "cache") {
			fs::copy(&path, target.join(path.file_name().unwrap())).unwrap();
		}
	}

	let identifier = LanguageIdentifier::open(data.path(), "demo").unwrap();
	let cases = [
		("The quick brown fox jumps over the lazy dog", "English"),
		("Le chat est sur la table de la cuisine", "French"),
		("Der Hund und die Katze schlafen in der Sonne", "German"),
		("El perro y el gato duermen en la casa", "Spanish"),
	];
	for (text, language) in cases {
		assert_eq!(identifier.guess(text).unwrap().best().unwrap().language, language, "{text}");
	}
	assert!(target.join("model.cache").is_file());
}
