use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use super::languages::Languages;

/// Width of the language column in rendered output.
const LANGUAGE_WIDTH: usize = 15;

/// Probability assigned to one language.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LanguageScore {
	pub language: String,
	pub probability: f32,
}

impl fmt::Display for LanguageScore {
	/// `English        42.17%`
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:<width$}{:.2}%", self.language, self.probability * 100.0, width = LANGUAGE_WIDTH)
	}
}

/// Languages paired with their probabilities, in label order.
///
/// # Invariants
/// - `scores.len() == min(languages.len(), probabilities.len())` at construction
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct Prediction {
	scores: Vec<LanguageScore>,
}

impl Prediction {
	/// Pairs `languages[i]` with `probabilities[i]`.
	///
	/// If the two lists differ in length, pairing stops at the shorter one
	/// and a warning is logged.
	pub fn new(languages: &Languages, probabilities: &[f32]) -> Self {
		if languages.len() != probabilities.len() {
			warn!(
				"{} languages for {} probabilities, truncating",
				languages.len(),
				probabilities.len()
			);
		}

		let scores = languages
			.iter()
			.zip(probabilities)
			.map(|(language, &probability)| LanguageScore { language: language.to_owned(), probability })
			.collect();
		Self { scores }
	}

	pub fn scores(&self) -> &[LanguageScore] {
		&self.scores
	}

	pub fn len(&self) -> usize {
		self.scores.len()
	}

	pub fn is_empty(&self) -> bool {
		self.scores.is_empty()
	}

	/// Highest-probability language. The first one wins ties.
	pub fn best(&self) -> Option<&LanguageScore> {
		let mut best: Option<&LanguageScore> = None;
		for score in &self.scores {
			match best {
				Some(current) if score.probability <= current.probability => (),
				_ => best = Some(score),
			}
		}
		best
	}

	/// One line per language, in label order.
	pub fn render(&self) -> String {
		self.scores.iter().map(LanguageScore::to_string).collect::<Vec<_>>().join("\n")
	}
}

impl fmt::Display for Prediction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.render())
	}
}
