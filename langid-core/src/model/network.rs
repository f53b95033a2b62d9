use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{LangIdError, Result};
use crate::io::{build_output_path, is_up_to_date, read_bytes, read_json};

/// File name of the TensorFlow.js topology inside a model directory.
pub const MODEL_FILE: &str = "model.json";

/// Extension of the serialized network written next to `model.json`.
pub const CACHE_EXTENSION: &str = "cache";

/// Inference collaborator: maps a feature vector to one score per language.
///
/// Implementations must be usable from several threads at once.
pub trait Classifier: Send + Sync {
	/// Expected length of the feature vector.
	fn input_size(&self) -> usize;

	/// Length of the returned distribution.
	fn output_size(&self) -> usize;

	/// Runs inference on a single feature vector.
	///
	/// # Errors
	/// Returns [`LangIdError::ShapeMismatch`] if `features.len() != input_size()`.
	fn predict(&self, features: &[f32]) -> Result<Vec<f32>>;
}

/// Element-wise (or vector-wise, for softmax) output function of a layer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
	Linear,
	Relu,
	Sigmoid,
	Tanh,
	Softmax,
}

impl Activation {
	/// Parses a Keras activation name.
	pub fn from_name(name: &str) -> Result<Self> {
		match name {
			"linear" => Ok(Self::Linear),
			"relu" => Ok(Self::Relu),
			"sigmoid" => Ok(Self::Sigmoid),
			"tanh" => Ok(Self::Tanh),
			"softmax" => Ok(Self::Softmax),
			other => Err(LangIdError::UnsupportedModel(format!("activation '{other}'"))),
		}
	}

	fn apply(self, values: &mut [f32]) {
		match self {
			Self::Linear => (),
			Self::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
			Self::Sigmoid => values.iter_mut().for_each(|v| *v = 1.0 / (1.0 + (-*v).exp())),
			Self::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
			Self::Softmax => {
				let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
				let mut sum = 0.0;
				for v in values.iter_mut() {
					*v = (*v - max).exp();
					sum += *v;
				}
				if sum > 0.0 {
					values.iter_mut().for_each(|v| *v /= sum);
				}
			}
		}
	}
}

/// Fully connected layer: `activation(x · kernel + bias)`.
///
/// # Invariants
/// - `kernel.len() == inputs * outputs`, stored row-major as `[inputs][outputs]`
/// - `bias.len() == outputs`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
	inputs: usize,
	outputs: usize,
	kernel: Vec<f32>,
	bias: Vec<f32>,
	activation: Activation,
}

impl DenseLayer {
	/// Creates a dense layer. A `None` bias is all zeros.
	///
	/// # Errors
	/// Returns an error if the kernel or bias length disagrees with the shape.
	pub fn new(
		inputs: usize,
		outputs: usize,
		kernel: Vec<f32>,
		bias: Option<Vec<f32>>,
		activation: Activation,
	) -> Result<Self> {
		let size = inputs.checked_mul(outputs).ok_or_else(|| {
			LangIdError::UnsupportedModel(format!("dense layer {inputs} x {outputs} is too large"))
		})?;
		if kernel.len() != size {
			return Err(LangIdError::ShapeMismatch {
				context: "dense kernel".to_owned(),
				expected: size,
				actual: kernel.len(),
			});
		}
		let bias = bias.unwrap_or_else(|| vec![0.0; outputs]);
		if bias.len() != outputs {
			return Err(LangIdError::ShapeMismatch {
				context: "dense bias".to_owned(),
				expected: outputs,
				actual: bias.len(),
			});
		}
		Ok(Self { inputs, outputs, kernel, bias, activation })
	}

	fn forward(&self, input: &[f32]) -> Vec<f32> {
		let mut output = self.bias.clone();
		for (i, &x) in input.iter().enumerate() {
			// Count vectors are mostly zeros
			if x == 0.0 {
				continue;
			}
			let row = &self.kernel[i * self.outputs..(i + 1) * self.outputs];
			for (o, w) in output.iter_mut().zip(row) {
				*o += x * w;
			}
		}
		self.activation.apply(&mut output);
		output
	}
}

/// One step of a sequential network.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Layer {
	Dense(DenseLayer),
	Activation(Activation),
}

/// Sequential stack of dense layers.
///
/// Built either directly from layers or from a TensorFlow.js "layers-model"
/// directory (see [`DenseNetwork::load`]).
///
/// # Invariants
/// - Contains at least one dense layer
/// - Each dense layer's `inputs` equals the previous dense layer's `outputs`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseNetwork {
	input_size: usize,
	output_size: usize,
	layers: Vec<Layer>,
}

impl DenseNetwork {
	/// Chains layers into a network.
	///
	/// # Errors
	/// Returns an error if there is no dense layer or consecutive shapes disagree.
	pub fn new(layers: Vec<Layer>) -> Result<Self> {
		let mut input_size = None;
		let mut size: Option<usize> = None;
		for layer in &layers {
			if let Layer::Dense(dense) = layer {
				if let Some(previous) = size {
					if previous != dense.inputs {
						return Err(LangIdError::ShapeMismatch {
							context: "layer chain".to_owned(),
							expected: previous,
							actual: dense.inputs,
						});
					}
				}
				if input_size.is_none() {
					input_size = Some(dense.inputs);
				}
				size = Some(dense.outputs);
			}
		}

		match (input_size, size) {
			(Some(input_size), Some(output_size)) => Ok(Self { input_size, output_size, layers }),
			_ => Err(LangIdError::UnsupportedModel("network has no dense layer".to_owned())),
		}
	}

	/// Loads a network from a TensorFlow.js model directory.
	///
	/// - Uses `model.cache` if it exists and is newer than `model.json`
	/// - Otherwise converts `model.json` and its weight shards, then writes the cache
	/// - A cache that cannot be read, decoded or validated is logged and rebuilt;
	///   a cache that cannot be written is logged and skipped
	pub fn load<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
		let model_path = model_dir.as_ref().join(MODEL_FILE);
		if !model_path.is_file() {
			return Err(LangIdError::ModelNotFound(model_path.display().to_string()));
		}

		let cache_path = build_output_path(&model_path, CACHE_EXTENSION)?;
		if is_up_to_date(&cache_path, &model_path) {
			match Self::read_cache(&cache_path) {
				Ok(network) => {
					info!("Loaded network from cache {}", cache_path.display());
					return Ok(network);
				}
				Err(e) => warn!("Ignoring unreadable cache {}: {e}", cache_path.display()),
			}
		}

		let network = Self::from_tfjs(&model_path)?;
		info!(
			"Converted {} ({} -> {}, {} layers)",
			model_path.display(),
			network.input_size,
			network.output_size,
			network.layers.len()
		);

		let bytes = postcard::to_stdvec(&network)?;
		match fs::write(&cache_path, bytes) {
			Ok(()) => debug!("Wrote network cache {}", cache_path.display()),
			Err(e) => warn!("Could not write cache {}: {e}", cache_path.display()),
		}

		Ok(network)
	}

	/// Decodes a cache file and checks it against the layer invariants.
	fn read_cache(cache_path: &Path) -> Result<Self> {
		let network: DenseNetwork = postcard::from_bytes(&read_bytes(cache_path)?)?;
		let layers = network
			.layers
			.into_iter()
			.map(|layer| match layer {
				Layer::Dense(dense) => {
					DenseLayer::new(dense.inputs, dense.outputs, dense.kernel, Some(dense.bias), dense.activation)
						.map(Layer::Dense)
				}
				other => Ok(other),
			})
			.collect::<Result<Vec<_>>>()?;
		Self::new(layers)
	}

	/// Converts a TensorFlow.js `model.json` and its shards, without any cache.
	pub fn from_tfjs<P: AsRef<Path>>(model_path: P) -> Result<Self> {
		let model_path = model_path.as_ref();
		let model: tfjs::ModelJson = read_json(model_path)?;
		let base = model_path.parent().unwrap_or_else(|| Path::new("."));
		let tensors = tfjs::read_weights(base, &model.weights_manifest)?;
		let specs = tfjs::sequential_layers(model.model_topology)?;
		tfjs::build_layers(specs, tensors).and_then(Self::new)
	}

	pub fn layers(&self) -> &[Layer] {
		&self.layers
	}
}

impl Classifier for DenseNetwork {
	fn input_size(&self) -> usize {
		self.input_size
	}

	fn output_size(&self) -> usize {
		self.output_size
	}

	fn predict(&self, features: &[f32]) -> Result<Vec<f32>> {
		if features.len() != self.input_size {
			return Err(LangIdError::ShapeMismatch {
				context: "feature vector".to_owned(),
				expected: self.input_size,
				actual: features.len(),
			});
		}

		let mut values = features.to_vec();
		for layer in &self.layers {
			match layer {
				Layer::Dense(dense) => values = dense.forward(&values),
				Layer::Activation(activation) => activation.apply(&mut values),
			}
		}
		Ok(values)
	}
}

/// TensorFlow.js "layers-model" file format.
///
/// Only sequential models made of `Dense`, `Activation`, `Dropout` and
/// `InputLayer` layers with float32 weights are understood.
mod tfjs {
	use std::path::Path;

	use serde::Deserialize;
	use serde_json::Value;

	use super::{Activation, DenseLayer, Layer};
	use crate::error::{LangIdError, Result};
	use crate::io::read_bytes;

	#[derive(Deserialize)]
	#[serde(rename_all = "camelCase")]
	pub struct ModelJson {
		pub model_topology: Value,
		pub weights_manifest: Vec<WeightGroup>,
	}

	#[derive(Deserialize)]
	struct ModelConfig {
		class_name: String,
		config: SequentialConfig,
	}

	/// Keras 2 serializes either a bare layer list or `{"name", "layers"}`.
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum SequentialConfig {
		Layers(Vec<LayerSpec>),
		Named { layers: Vec<LayerSpec> },
	}

	#[derive(Deserialize)]
	pub struct LayerSpec {
		class_name: String,
		#[serde(default)]
		config: Value,
	}

	#[derive(Deserialize)]
	struct DenseConfig {
		units: usize,
		#[serde(default = "linear")]
		activation: String,
		#[serde(default = "yes")]
		use_bias: bool,
		#[serde(default, alias = "batch_shape")]
		batch_input_shape: Option<Vec<Option<usize>>>,
	}

	#[derive(Deserialize)]
	struct ActivationConfig {
		activation: String,
	}

	fn linear() -> String {
		"linear".to_owned()
	}

	fn yes() -> bool {
		true
	}

	#[derive(Deserialize)]
	pub struct WeightGroup {
		paths: Vec<String>,
		weights: Vec<WeightSpec>,
	}

	#[derive(Deserialize)]
	struct WeightSpec {
		name: String,
		shape: Vec<usize>,
		dtype: String,
		#[serde(default)]
		quantization: Option<Value>,
	}

	/// A decoded weight tensor.
	pub struct Tensor {
		name: String,
		shape: Vec<usize>,
		values: Vec<f32>,
	}

	/// Extracts the layer list of a sequential topology.
	///
	/// Accepts either `{"model_config": {...}}` (converter output) or the
	/// model config itself.
	pub fn sequential_layers(mut topology: Value) -> Result<Vec<LayerSpec>> {
		let config = if topology.get("model_config").is_some() {
			topology["model_config"].take()
		} else {
			topology
		};
		let config: ModelConfig = serde_json::from_value(config)?;
		if config.class_name != "Sequential" {
			return Err(LangIdError::UnsupportedModel(format!("model class '{}'", config.class_name)));
		}
		Ok(match config.config {
			SequentialConfig::Layers(layers) => layers,
			SequentialConfig::Named { layers } => layers,
		})
	}

	/// Reads every weight group, in manifest order.
	///
	/// Shards of a group are concatenated and then sliced per weight,
	/// 4 little-endian bytes per value.
	pub fn read_weights(base: &Path, manifest: &[WeightGroup]) -> Result<Vec<Tensor>> {
		let mut tensors = Vec::new();
		for group in manifest {
			let mut bytes = Vec::new();
			for path in &group.paths {
				bytes.extend(read_bytes(base.join(path))?);
			}

			let mut offset = 0;
			for spec in &group.weights {
				if spec.dtype != "float32" || spec.quantization.is_some() {
					return Err(LangIdError::UnsupportedModel(format!(
						"weight '{}' is not plain float32",
						spec.name
					)));
				}
				let end = spec
					.shape
					.iter()
					.try_fold(4usize, |size, &dim| size.checked_mul(dim))
					.and_then(|size| size.checked_add(offset))
					.ok_or_else(|| {
						LangIdError::UnsupportedModel(format!("weight '{}' has an oversized shape", spec.name))
					})?;
				if end > bytes.len() {
					return Err(LangIdError::ShapeMismatch {
						context: format!("weight data for '{}'", spec.name),
						expected: end,
						actual: bytes.len(),
					});
				}
				let values = bytes[offset..end]
					.chunks_exact(4)
					.map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
					.collect();
				tensors.push(Tensor { name: spec.name.clone(), shape: spec.shape.clone(), values });
				offset = end;
			}
		}
		Ok(tensors)
	}

	/// Pairs layer specs with tensors, consumed in order (kernel then bias).
	pub fn build_layers(specs: Vec<LayerSpec>, tensors: Vec<Tensor>) -> Result<Vec<Layer>> {
		let mut tensors = tensors.into_iter();
		let mut declared_input: Option<usize> = None;
		let mut layers = Vec::new();

		for spec in specs {
			match spec.class_name.as_str() {
				"InputLayer" => {
					let config: InputShape = serde_json::from_value(spec.config)?;
					declared_input = config.last_dim();
				}
				"Dropout" => (),
				"Activation" => {
					let config: ActivationConfig = serde_json::from_value(spec.config)?;
					layers.push(Layer::Activation(Activation::from_name(&config.activation)?));
				}
				"Dense" => {
					let config: DenseConfig = serde_json::from_value(spec.config)?;
					let kernel = tensors
						.next()
						.ok_or_else(|| LangIdError::UnsupportedModel("missing dense kernel".to_owned()))?;
					let [inputs, outputs] = kernel.shape[..] else {
						return Err(LangIdError::UnsupportedModel(format!(
							"kernel '{}' is not 2-dimensional",
							kernel.name
						)));
					};
					if outputs != config.units {
						return Err(LangIdError::ShapeMismatch {
							context: format!("kernel '{}'", kernel.name),
							expected: config.units,
							actual: outputs,
						});
					}
					let declared = config
						.batch_input_shape
						.and_then(|shape| shape.last().copied().flatten())
						.or(declared_input.take());
					if let Some(expected) = declared {
						if expected != inputs {
							return Err(LangIdError::ShapeMismatch {
								context: format!("input of '{}'", kernel.name),
								expected,
								actual: inputs,
							});
						}
					}
					let bias = if config.use_bias {
						let bias = tensors
							.next()
							.ok_or_else(|| LangIdError::UnsupportedModel("missing dense bias".to_owned()))?;
						Some(bias.values)
					} else {
						None
					};
					let activation = Activation::from_name(&config.activation)?;
					layers.push(Layer::Dense(DenseLayer::new(inputs, outputs, kernel.values, bias, activation)?));
				}
				other => return Err(LangIdError::UnsupportedModel(format!("layer '{other}'"))),
			}
		}

		if let Some(extra) = tensors.next() {
			return Err(LangIdError::UnsupportedModel(format!("unused weight '{}'", extra.name)));
		}
		Ok(layers)
	}

	#[derive(Deserialize)]
	struct InputShape {
		#[serde(default, alias = "batch_shape")]
		batch_input_shape: Option<Vec<Option<usize>>>,
	}

	impl InputShape {
		fn last_dim(&self) -> Option<usize> {
			self.batch_input_shape.as_ref()?.last().copied().flatten()
		}
	}
}
