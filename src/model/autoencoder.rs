use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::layers::Param;
use crate::math::matrix::Matrix;
use crate::model::compile::CompileConfig;
use crate::network::network::Network;

/// Position of the encoder in an assembled model. Latent extraction reads
/// this layer directly, bypassing the decoder.
pub const ENCODER_INDEX: usize = 1;

/// Restores the decoder output to the input shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reshape {
    pub target_shape: (usize, usize),
    #[serde(skip)]
    source_shape: Option<(usize, usize)>,
}

impl Reshape {
    pub fn new(target_shape: (usize, usize)) -> Reshape {
        Reshape { target_shape, source_shape: None }
    }

    fn apply(x: &Matrix, shape: (usize, usize)) -> Result<Matrix> {
        x.reshape(shape.0, shape.1).ok_or_else(|| Error::ShapeMismatch {
            expected: vec![shape.0, shape.1],
            got: vec![x.rows, x.cols],
        })
    }

    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        Reshape::apply(x, self.target_shape)
    }

    pub fn forward(&mut self, x: &Matrix) -> Result<Matrix> {
        self.source_shape = Some(x.shape());
        self.predict(x)
    }

    pub fn backward(&self, grad: &Matrix) -> Result<Matrix> {
        Reshape::apply(grad, self.source_shape.unwrap_or(self.target_shape))
    }
}

/// One top-level layer of the assembled auto-encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelLayer {
    Input { shape: (usize, usize) },
    Encoder(Network),
    Decoder(Network),
    Reshape(Reshape),
}

impl ModelLayer {
    pub fn name(&self) -> &str {
        match self {
            ModelLayer::Input { .. } => "input_layer",
            ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => &n.name,
            ModelLayer::Reshape(_) => "output_layer",
        }
    }
}

/// End-to-end model `input → encoder → decoder → reshape`, plus the compile
/// settings used by the training loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoEncoder {
    pub layers: Vec<ModelLayer>,
    #[serde(default)]
    compiled: Option<CompileConfig>,
}

impl AutoEncoder {
    pub fn new(input_shape: (usize, usize), encoder: Network, decoder: Network) -> AutoEncoder {
        AutoEncoder {
            layers: vec![
                ModelLayer::Input { shape: input_shape },
                ModelLayer::Encoder(encoder),
                ModelLayer::Decoder(decoder),
                ModelLayer::Reshape(Reshape::new(input_shape)),
            ],
            compiled: None,
        }
    }

    pub fn compile(&mut self, config: CompileConfig) {
        self.compiled = Some(config);
    }

    pub fn compile_config(&self) -> Option<&CompileConfig> {
        self.compiled.as_ref()
    }

    /// Drops the compile settings, leaving an inference-only model.
    pub fn into_uncompiled(mut self) -> AutoEncoder {
        self.compiled = None;
        self
    }

    pub fn input_shape(&self) -> Result<(usize, usize)> {
        match self.layers.first() {
            Some(ModelLayer::Input { shape }) => Ok(*shape),
            _ => Err(Error::Layout("first layer is not an input layer".into())),
        }
    }

    /// The encoder sub-model, which must sit at [`ENCODER_INDEX`].
    pub fn encoder(&self) -> Result<&Network> {
        match self.layers.get(ENCODER_INDEX) {
            Some(ModelLayer::Encoder(network)) => Ok(network),
            other => Err(Error::Layout(format!(
                "expected the encoder at layer {ENCODER_INDEX}, found {}",
                other.map_or("no layer", |l| l.name())
            ))),
        }
    }

    fn check_input(shape: (usize, usize), x: &Matrix) -> Result<()> {
        if x.shape() != shape {
            return Err(Error::ShapeMismatch {
                expected: vec![shape.0, shape.1],
                got: vec![x.rows, x.cols],
            });
        }
        Ok(())
    }

    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        let mut current = x.clone();
        for layer in &self.layers {
            current = match layer {
                ModelLayer::Input { shape } => {
                    AutoEncoder::check_input(*shape, &current)?;
                    current
                }
                ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => n.predict(&current),
                ModelLayer::Reshape(r) => r.predict(&current)?,
            };
        }
        Ok(current)
    }

    /// Training forward pass; caches activations for `backward`.
    pub fn forward(&mut self, x: &Matrix) -> Result<Matrix> {
        let mut current = x.clone();
        for layer in &mut self.layers {
            current = match layer {
                ModelLayer::Input { shape } => {
                    AutoEncoder::check_input(*shape, &current)?;
                    current
                }
                ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => n.forward(&current),
                ModelLayer::Reshape(r) => r.forward(&current)?,
            };
        }
        Ok(current)
    }

    /// Accumulates parameter gradients for ∂L/∂output of the last `forward`.
    pub fn backward(&mut self, grad: &Matrix) -> Result<()> {
        let mut delta = grad.clone();
        for layer in self.layers.iter_mut().rev() {
            delta = match layer {
                ModelLayer::Input { .. } => delta,
                ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => n.backward(&delta),
                ModelLayer::Reshape(r) => r.backward(&delta)?,
            };
        }
        Ok(())
    }

    pub fn output_shape(&self) -> Result<(usize, usize)> {
        let mut shape = self.input_shape()?;
        for layer in &self.layers {
            shape = match layer {
                ModelLayer::Input { .. } => shape,
                ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => n.output_shape(shape),
                ModelLayer::Reshape(r) => r.target_shape,
            };
        }
        Ok(shape)
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut()
            .flat_map(|layer| match layer {
                ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => n.params_mut(),
                _ => Vec::new(),
            })
            .collect()
    }

    pub fn param_count(&self) -> usize {
        self.layers.iter()
            .map(|layer| match layer {
                ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => n.param_count(),
                _ => 0,
            })
            .sum()
    }

    /// One line per top-level layer: name, output shape and parameter count.
    pub fn summary(&self) -> Vec<String> {
        let mut shape = match self.input_shape() {
            Ok(s) => s,
            Err(_) => return vec!["<invalid model>".to_string()],
        };
        let mut lines = Vec::with_capacity(self.layers.len() + 1);
        for layer in &self.layers {
            let params = match layer {
                ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => {
                    shape = n.output_shape(shape);
                    n.param_count()
                }
                ModelLayer::Reshape(r) => {
                    shape = r.target_shape;
                    0
                }
                ModelLayer::Input { .. } => 0,
            };
            lines.push(format!("{:<14} {:>14} {:>10}", layer.name(), format!("{shape:?}"), params));
        }
        lines.push(format!("total params: {}", self.param_count()));
        lines
    }

    /// Drops every per-layer forward cache.
    pub fn release_buffers(&mut self) {
        for layer in &mut self.layers {
            match layer {
                ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => n.clear_cache(),
                ModelLayer::Reshape(r) => r.source_shape = None,
                ModelLayer::Input { .. } => {}
            }
        }
        for param in self.params_mut() {
            param.grad = Matrix::default();
        }
    }

    /// True while forward caches or gradient buffers are still allocated.
    pub(crate) fn has_cached_state(&self) -> bool {
        self.layers.iter().any(|layer| match layer {
            ModelLayer::Encoder(n) | ModelLayer::Decoder(n) => {
                n.has_cache() || n.params().iter().any(|p| !p.grad.is_empty())
            }
            ModelLayer::Reshape(r) => r.source_shape.is_some(),
            ModelLayer::Input { .. } => false,
        })
    }

    /// Serializes the model (architecture, weights, compile settings) to a
    /// pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a model previously written by `save_json`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<AutoEncoder> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
