use std::collections::{BTreeMap, HashMap};
use std::iter;
use std::sync::mpsc;
use std::thread;

use super::vocabulary::Vocabulary;

/// Count vector aligned with a vocabulary: one counter per n-gram slot.
pub type FeatureVector = Vec<u32>;

/// Counts the occurrences of every vocabulary n-gram in `text`.
///
/// `result[j]` is the number of offsets `i` (in characters) such that the
/// `vocabulary[j].len()` characters of `text` starting at `i` equal
/// `vocabulary[j]`. Overlapping matches are counted independently, matching
/// is case-sensitive, and n-grams running past the end of the text simply do
/// not match.
///
/// The result always has `vocabulary.len()` entries. For repeated encodings
/// against the same vocabulary, build an [`NGramEncoder`] once instead.
pub fn encode<S: AsRef<str>>(text: &str, vocabulary: &[S]) -> FeatureVector {
	NGramEncoder::new(vocabulary).encode(text)
}

/// Precomputed n-gram lookup for a fixed vocabulary.
///
/// N-grams are grouped by length (in characters). Encoding scans the text
/// once per distinct length and looks every window up in a hash map, instead
/// of comparing each vocabulary entry at each offset.
///
/// # Invariants
/// - Every vocabulary slot appears exactly once across all groups
/// - `groups` is sorted by increasing n-gram length
#[derive(Clone, Debug)]
pub struct NGramEncoder {
	/// Number of vocabulary slots (length of every produced vector)
	size: usize,

	/// (n-gram length, n-gram -> slots holding that n-gram)
	groups: Vec<(usize, HashMap<String, Vec<usize>>)>,
}

impl NGramEncoder {
	/// Builds the lookup tables for `vocabulary`.
	///
	/// Duplicate n-grams keep all their slots; each one is incremented on
	/// every match.
	pub fn new<S: AsRef<str>>(vocabulary: &[S]) -> Self {
		let mut by_length: BTreeMap<usize, HashMap<String, Vec<usize>>> = BTreeMap::new();
		for (slot, ngram) in vocabulary.iter().enumerate() {
			let ngram = ngram.as_ref();
			by_length
				.entry(ngram.chars().count())
				.or_default()
				.entry(ngram.to_owned())
				.or_default()
				.push(slot);
		}

		Self { size: vocabulary.len(), groups: by_length.into_iter().collect() }
	}

	pub fn from_vocabulary(vocabulary: &Vocabulary) -> Self {
		Self::new(vocabulary.as_slice())
	}

	/// Length of the vectors produced by this encoder.
	pub fn len(&self) -> usize {
		self.size
	}

	pub fn is_empty(&self) -> bool {
		self.size == 0
	}

	/// Encodes one text into its feature vector.
	pub fn encode(&self, text: &str) -> FeatureVector {
		let mut counts = vec![0; self.size];
		if self.size == 0 || text.is_empty() {
			return counts;
		}

		// Byte offset of every character, plus the end of the text
		let boundaries: Vec<usize> = text
			.char_indices()
			.map(|(offset, _)| offset)
			.chain(iter::once(text.len()))
			.collect();
		let chars = boundaries.len() - 1;

		for (length, table) in &self.groups {
			if *length > chars {
				break;
			}
			for start in 0..chars {
				let end = start + length;
				if end > chars {
					break;
				}
				if let Some(slots) = table.get(&text[boundaries[start]..boundaries[end]]) {
					for &slot in slots {
						counts[slot] += 1;
					}
				}
			}
		}

		counts
	}

	/// Encodes several texts in parallel.
	///
	/// The input is split into at most one chunk per CPU, each chunk encoded
	/// on its own thread. Output order matches input order.
	pub fn encode_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<FeatureVector> {
		if texts.len() <= 1 {
			return texts.iter().map(|text| self.encode(text.as_ref())).collect();
		}

		let workers = num_cpus::get().clamp(1, texts.len());
		let chunk_size = texts.len().div_ceil(workers);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for (index, chunk) in texts.chunks(chunk_size).enumerate() {
				let tx = tx.clone();
				scope.spawn(move || {
					let encoded: Vec<FeatureVector> = chunk.iter().map(|text| self.encode(text.as_ref())).collect();
					// The receiver lives until every worker has joined
					let _ = tx.send((index, encoded));
				});
			}
		});
		drop(tx);

		let mut parts: Vec<(usize, Vec<FeatureVector>)> = rx.iter().collect();
		parts.sort_by_key(|(index, _)| *index);
		parts.into_iter().flat_map(|(_, encoded)| encoded).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_text_gives_zeros() {
		assert_eq!(encode("", &["a", "bc", "a"]), vec![0, 0, 0]);
	}

	#[test]
	fn empty_vocabulary_gives_empty_vector() {
		let vocabulary: [&str; 0] = [];
		assert!(encode("hello", &vocabulary).is_empty());
	}

	#[test]
	fn overlapping_matches_are_counted() {
		assert_eq!(encode("aaa", &["aa"]), vec![2]);
	}

	#[test]
	fn no_match() {
		assert_eq!(encode("hello", &["xyz"]), vec![0]);
	}

	#[test]
	fn mixed_length_vocabulary() {
		assert_eq!(encode("abcabc", &["a", "ab", "abc", "xyz"]), vec![2, 2, 2, 0]);
	}

	#[test]
	fn ngram_longer_than_text() {
		assert_eq!(encode("ab", &["abc", "ab", "b"]), vec![0, 1, 1]);
	}

	#[test]
	fn duplicates_fill_every_slot() {
		assert_eq!(encode("the theme", &["th", "e", "th"]), vec![2, 3, 2]);
	}

	#[test]
	fn matching_is_case_sensitive() {
		assert_eq!(encode("The the", &["the", "The"]), vec![1, 1]);
	}

	#[test]
	fn offsets_are_characters() {
		// 'é' is two bytes but a single offset
		assert_eq!(encode("été", &["é", "té", "ét", "t"]), vec![2, 1, 1, 1]);
		assert_eq!(encode("日本語の本", &["本", "日本"]), vec![2, 1]);
	}

	#[test]
	fn batch_preserves_order() {
		let encoder = NGramEncoder::new(&["a", "b"]);
		let texts: Vec<String> = (0..100).map(|i| "a".repeat(i % 7) + &"b".repeat(i % 3)).collect();

		let batch = encoder.encode_batch(&texts);
		assert_eq!(batch.len(), texts.len());
		for (text, encoded) in texts.iter().zip(&batch) {
			assert_eq!(encoded, &encoder.encode(text));
		}
	}

	#[test]
	fn batch_of_nothing() {
		let encoder = NGramEncoder::new(&["a"]);
		let texts: [&str; 0] = [];
		assert!(encoder.encode_batch(&texts).is_empty());
	}
}
