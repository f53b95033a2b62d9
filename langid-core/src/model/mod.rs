//! Top-level module for language identification.
//!
//! This module provides:
//! - Vocabulary and language lists (`Vocabulary`, `Languages`)
//! - The n-gram encoder (`encode`, `NGramEncoder`)
//! - The inference collaborator (`Classifier`, `DenseNetwork`)
//! - Prediction rendering (`Prediction`)
//! - A high-level identifier tying them together (`LanguageIdentifier`)

/// Text to bag-of-n-grams count vector.
pub mod encoder;

/// High-level model loading and language guessing.
pub mod identifier;

/// Ordered language names.
pub mod languages;

/// Feed-forward network runner and TensorFlow.js loader.
///
/// Supports dense layers with the usual Keras activations, plus a
/// postcard cache of the converted network.
pub mod network;

/// Language / probability pairs and their text rendering.
pub mod prediction;

/// Ordered n-gram list defining the feature space.
pub mod vocabulary;
