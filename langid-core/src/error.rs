use std::io;

use thiserror::Error;

/// Errors raised while loading or running a language identification model.
///
/// The encoder itself never fails; every variant here belongs to loading
/// configuration, loading the network, or feeding it a badly shaped input.
#[derive(Debug, Error)]
pub enum LangIdError {
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("malformed JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("model cache error: {0}")]
	Cache(#[from] postcard::Error),

	#[error("invalid path: {0}")]
	InvalidPath(String),

	#[error("invalid vocabulary: {0}")]
	InvalidVocabulary(String),

	#[error("unsupported model: {0}")]
	UnsupportedModel(String),

	#[error("shape mismatch in {context}: expected {expected}, got {actual}")]
	ShapeMismatch {
		context: String,
		expected: usize,
		actual: usize,
	},

	#[error("model not found: {0}")]
	ModelNotFound(String),
}

pub type Result<T> = std::result::Result<T, LangIdError>;
