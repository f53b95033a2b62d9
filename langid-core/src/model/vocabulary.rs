use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LangIdError, Result};
use crate::io::read_json;

/// Ordered list of n-grams defining the feature space.
///
/// The position of an n-gram in the list is the index of its counter in
/// every feature vector produced from this vocabulary.
///
/// # Invariants
/// - Immutable once built
/// - Order is preserved exactly as loaded
/// - Duplicates are kept; each occupies its own slot
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct Vocabulary {
	ngrams: Vec<String>,
}

impl Vocabulary {
	/// Builds a vocabulary from an ordered list of n-grams.
	///
	/// # Errors
	/// Returns an error if an n-gram is empty.
	pub fn new(ngrams: Vec<String>) -> Result<Self> {
		if let Some(index) = ngrams.iter().position(|ngram| ngram.is_empty()) {
			return Err(LangIdError::InvalidVocabulary(format!("empty n-gram at index {index}")));
		}
		Ok(Self { ngrams })
	}

	/// Loads a vocabulary from a JSON array of strings.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::new(read_json(path)?)
	}

	/// Parses a vocabulary from a JSON array of strings.
	pub fn from_json(json: &str) -> Result<Self> {
		Self::new(serde_json::from_str(json)?)
	}

	pub fn len(&self) -> usize {
		self.ngrams.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ngrams.is_empty()
	}

	pub fn as_slice(&self) -> &[String] {
		&self.ngrams
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.ngrams.iter().map(String::as_str)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_order_and_duplicates() {
		let vocabulary = Vocabulary::from_json(r#"["th", "a", "th"]"#).unwrap();
		assert_eq!(vocabulary.iter().collect::<Vec<_>>(), vec!["th", "a", "th"]);
		assert_eq!(vocabulary.len(), 3);
	}

	#[test]
	fn rejects_empty_ngram() {
		let err = Vocabulary::from_json(r#"["a", ""]"#).unwrap_err();
		assert!(matches!(err, LangIdError::InvalidVocabulary(_)));
	}

	#[test]
	fn rejects_malformed_json() {
		let err = Vocabulary::from_json(r#"["a", 3]"#).unwrap_err();
		assert!(matches!(err, LangIdError::Json(_)));
	}
}
