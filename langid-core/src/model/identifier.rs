use std::fmt;
use std::path::Path;

use log::{debug, info, warn};

use super::encoder::{FeatureVector, NGramEncoder};
use super::languages::Languages;
use super::network::{Classifier, DenseNetwork, MODEL_FILE};
use super::prediction::Prediction;
use super::vocabulary::Vocabulary;
use crate::error::{LangIdError, Result};
use crate::io;

/// Vocabulary file inside a model directory.
pub const VOCABULARY_FILE: &str = "vocabulary.json";

/// Language list inside a model directory.
pub const LANGUAGES_FILE: &str = "languages.json";

/// Guesses the language of texts with one loaded model.
///
/// A model directory holds:
/// - `vocabulary.json`: JSON array of n-grams
/// - `languages.json`: JSON array of language names
/// - `model.json` + weight shards: TensorFlow.js layers model
///
/// # Responsibilities
/// - Load and cross-check the three parts
/// - Encode texts into feature vectors
/// - Run the classifier and pair its output with the language names
pub struct LanguageIdentifier {
	name: String,
	vocabulary: Vocabulary,
	languages: Languages,
	encoder: NGramEncoder,
	classifier: Box<dyn Classifier>,
}

impl LanguageIdentifier {
	/// Loads a model directory.
	///
	/// The model name is the directory name. Both `"folder"` and `"folder/"`
	/// are accepted.
	///
	/// # Errors
	/// - The path is not a directory
	/// - A file is missing or malformed
	/// - The network input size differs from the vocabulary size
	pub fn new<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
		let string_path = model_dir
			.as_ref()
			.to_str()
			.ok_or_else(|| LangIdError::InvalidPath(model_dir.as_ref().display().to_string()))?;
		let folder = io::normalize_folder(string_path);

		if !folder.is_dir() {
			return Err(LangIdError::ModelNotFound(folder.display().to_string()));
		}

		let name = io::get_filename(&folder)?;
		let vocabulary = Vocabulary::from_file(folder.join(VOCABULARY_FILE))?;
		let languages = Languages::from_file(folder.join(LANGUAGES_FILE))?;
		let network = DenseNetwork::load(&folder)?;

		info!(
			"Loaded model '{}': {} n-grams, {} languages",
			name,
			vocabulary.len(),
			languages.len()
		);
		Self::from_parts(name, vocabulary, languages, Box::new(network))
	}

	/// Loads the model called `name` from `data_dir`.
	///
	/// # Errors
	/// Returns [`LangIdError::InvalidPath`] if `name` is not a plain directory name.
	pub fn open<P: AsRef<Path>>(data_dir: P, name: &str) -> Result<Self> {
		let plain = !name.is_empty()
			&& name != "."
			&& name != ".."
			&& !name.contains(['/', '\\']);
		if !plain {
			return Err(LangIdError::InvalidPath(name.to_owned()));
		}
		Self::new(data_dir.as_ref().join(name))
	}

	/// Builds an identifier around any classifier.
	///
	/// # Errors
	/// Returns an error if `classifier.input_size() != vocabulary.len()`.
	/// A classifier output size different from the language count is only
	/// logged: predictions are truncated to the shorter list.
	pub fn from_parts(
		name: impl Into<String>,
		vocabulary: Vocabulary,
		languages: Languages,
		classifier: Box<dyn Classifier>,
	) -> Result<Self> {
		if classifier.input_size() != vocabulary.len() {
			return Err(LangIdError::ShapeMismatch {
				context: "network input vs vocabulary".to_owned(),
				expected: vocabulary.len(),
				actual: classifier.input_size(),
			});
		}
		if classifier.output_size() != languages.len() {
			warn!(
				"Network has {} outputs for {} languages",
				classifier.output_size(),
				languages.len()
			);
		}

		let encoder = NGramEncoder::from_vocabulary(&vocabulary);
		Ok(Self { name: name.into(), vocabulary, languages, encoder, classifier })
	}

	/// Names of the model directories found in `data_dir`, sorted.
	pub fn list_models<P: AsRef<Path>>(data_dir: P) -> Result<Vec<String>> {
		Ok(io::list_dirs_with(data_dir, MODEL_FILE)?)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocabulary
	}

	pub fn languages(&self) -> &Languages {
		&self.languages
	}

	/// Feature vector of `text` against this model's vocabulary.
	pub fn encode(&self, text: &str) -> FeatureVector {
		self.encoder.encode(text)
	}

	/// Guesses the language of one text.
	pub fn guess(&self, text: &str) -> Result<Prediction> {
		let features = self.encode(text);
		let prediction = self.predict_features(&features)?;
		debug!("Guessed {:?} for {} chars", prediction.best().map(|s| &s.language), text.chars().count());
		Ok(prediction)
	}

	/// Guesses the language of several texts; encoding runs in parallel.
	pub fn guess_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Result<Vec<Prediction>> {
		self.encoder
			.encode_batch(texts)
			.iter()
			.map(|features| self.predict_features(features))
			.collect()
	}

	fn predict_features(&self, features: &[u32]) -> Result<Prediction> {
		let input: Vec<f32> = features.iter().map(|&count| count as f32).collect();
		let probabilities = self.classifier.predict(&input)?;
		Ok(Prediction::new(&self.languages, &probabilities))
	}
}

impl fmt::Debug for LanguageIdentifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LanguageIdentifier")
			.field("name", &self.name)
			.field("vocabulary", &self.vocabulary.len())
			.field("languages", &self.languages)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::network::{Activation, DenseLayer, Layer};

	/// Scores each language by the count of its single n-gram.
	fn one_hot_identifier(ngrams: &[&str], languages: &[&str]) -> LanguageIdentifier {
		let size = ngrams.len();
		let mut kernel = vec![0.0; size * size];
		for i in 0..size {
			kernel[i * size + i] = 1.0;
		}
		let dense = DenseLayer::new(size, size, kernel, None, Activation::Softmax).unwrap();
		let network = DenseNetwork::new(vec![Layer::Dense(dense)]).unwrap();
		LanguageIdentifier::from_parts(
			"test",
			Vocabulary::new(ngrams.iter().map(|s| s.to_string()).collect()).unwrap(),
			Languages::new(languages.iter().map(|s| s.to_string()).collect()),
			Box::new(network),
		)
		.unwrap()
	}

	#[test]
	fn guesses_dominant_ngram() {
		let identifier = one_hot_identifier(&["the", "le "], &["English", "French"]);
		let prediction = identifier.guess("the cat and the dog").unwrap();
		assert_eq!(prediction.best().unwrap().language, "English");

		let prediction = identifier.guess("le chat et le chien").unwrap();
		assert_eq!(prediction.best().unwrap().language, "French");
	}

	#[test]
	fn empty_text_is_uniform() {
		let identifier = one_hot_identifier(&["a", "b"], &["A", "B"]);
		let prediction = identifier.guess("").unwrap();
		assert_eq!(prediction.render(), "A              50.00%\nB              50.00%");
	}

	#[test]
	fn batch_matches_single_guesses() {
		let identifier = one_hot_identifier(&["the", "le "], &["English", "French"]);
		let texts = ["the end", "le début", "", "the le the"];
		let batch = identifier.guess_batch(&texts).unwrap();
		for (text, prediction) in texts.iter().zip(batch) {
			assert_eq!(prediction, identifier.guess(text).unwrap());
		}
	}

	#[test]
	fn rejects_vocabulary_size_mismatch() {
		let dense = DenseLayer::new(3, 2, vec![0.0; 6], None, Activation::Softmax).unwrap();
		let network = DenseNetwork::new(vec![Layer::Dense(dense)]).unwrap();
		let err = LanguageIdentifier::from_parts(
			"test",
			Vocabulary::new(vec!["a".into()]).unwrap(),
			Languages::new(vec!["A".into(), "B".into()]),
			Box::new(network),
		)
		.unwrap_err();
		assert!(matches!(err, LangIdError::ShapeMismatch { expected: 1, actual: 3, .. }));
	}

	#[test]
	fn output_mismatch_truncates() {
		let identifier = one_hot_identifier(&["a", "b"], &["A"]);
		assert_eq!(identifier.guess("ab").unwrap().len(), 1);
	}

	#[test]
	fn open_rejects_path_like_names() {
		for name in ["", ".", "..", "../etc", "a/b", "a\\b"] {
			let err = LanguageIdentifier::open("./data", name).unwrap_err();
			assert!(matches!(err, LangIdError::InvalidPath(_)), "{name}");
		}
	}
}
