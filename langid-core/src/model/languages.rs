use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::read_json;

/// Ordered list of language names.
///
/// Index `i` names the `i`-th output of the network.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Languages {
	names: Vec<String>,
}

impl Languages {
	pub fn new(names: Vec<String>) -> Self {
		Self { names }
	}

	/// Loads the label list from a JSON array of strings.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		Ok(Self::new(read_json(path)?))
	}

	/// Parses the label list from a JSON array of strings.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(Self::new(serde_json::from_str(json)?))
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	pub fn as_slice(&self) -> &[String] {
		&self.names
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.names.iter().map(String::as_str)
	}
}
