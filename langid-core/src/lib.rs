//! Language identification from bag-of-n-grams features.
//!
//! This crate provides the pieces needed to guess the language of a text:
//! - Vocabulary and language lists loaded from JSON
//! - The n-gram encoder turning text into a count vector
//! - A dense neural network runner for TensorFlow.js layers models
//! - Prediction rendering (language / percentage pairs)
//!
//! The high-level entry point is [`model::identifier::LanguageIdentifier`].

/// Encoder, network, and identifier types.
pub mod model;

/// Error type shared by the whole crate.
pub mod error;

/// I/O utilities (JSON loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use error::{LangIdError, Result};
