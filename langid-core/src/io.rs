use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{env, fs, io};

use serde::de::DeserializeOwned;

/// Reads a JSON file and deserializes it into `T`.
pub(crate) fn read_json<T, P>(filename: P) -> crate::Result<T>
where
	T: DeserializeOwned,
	P: AsRef<Path>,
{
	let reader = BufReader::new(File::open(filename)?);
	Ok(serde_json::from_reader(reader)?)
}

/// Reads a whole binary file.
pub(crate) fn read_bytes<P: AsRef<Path>>(filename: P) -> io::Result<Vec<u8>> {
	let mut contents = Vec::new();
	File::open(filename)?.read_to_end(&mut contents)?;
	Ok(contents)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/demo/model.json` + `"cache"` → `data/demo/model.cache`
pub(crate) fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the last path component.
///
/// Examples:
/// - `"./data/demo"` → `"demo"`
/// - `"demo/"` → `"demo"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let name = input_path
		.as_ref()
		.file_name()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(name.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists the sub-directories of `dir` that contain a file named `marker`.
///
/// Returns directory names only (no paths), sorted.
pub(crate) fn list_dirs_with<P: AsRef<Path>>(dir: P, marker: &str) -> io::Result<Vec<String>> {
	let mut dirs = Vec::new();

	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();

		if path.is_dir() && path.join(marker).is_file() {
			if let Some(name) = path.file_name() {
				dirs.push(name.to_string_lossy().to_string());
			}
		}
	}

	dirs.sort();
	Ok(dirs)
}

/// Returns true when `derived` exists and is at least as recent as `source`.
///
/// Missing timestamps count as stale.
pub(crate) fn is_up_to_date<P, Q>(derived: P, source: Q) -> bool
where
	P: AsRef<Path>,
	Q: AsRef<Path>,
{
	let modified = |p: &Path| -> Option<SystemTime> { fs::metadata(p).ok()?.modified().ok() };
	match (modified(derived.as_ref()), modified(source.as_ref())) {
		(Some(derived), Some(source)) => derived >= source,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_swaps_extension() {
		let path = build_output_path("data/demo/model.json", "cache").unwrap();
		assert_eq!(path, PathBuf::from("data/demo/model.cache"));
	}

	#[test]
	fn filename_is_last_component() {
		assert_eq!(get_filename("./data/demo").unwrap(), "demo");
		assert_eq!(get_filename("demo/").unwrap(), "demo");
	}

	#[test]
	fn lists_only_model_directories() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir(dir.path().join("english")).unwrap();
		fs::write(dir.path().join("english/model.json"), "{}").unwrap();
		fs::create_dir(dir.path().join("empty")).unwrap();
		fs::write(dir.path().join("stray.json"), "{}").unwrap();

		let dirs = list_dirs_with(dir.path(), "model.json").unwrap();
		assert_eq!(dirs, vec!["english".to_owned()]);
	}

	#[test]
	fn missing_derived_file_is_stale() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("model.json");
		fs::write(&source, "{}").unwrap();
		assert!(!is_up_to_date(dir.path().join("model.cache"), &source));

		let derived = dir.path().join("model.cache");
		fs::write(&derived, "x").unwrap();
		assert!(is_up_to_date(&derived, &source));
	}
}
