//! The DGCNN graph classifier.
//!
//! ```text
//! (A~, D^-1, X)
//!   -> 4 x graph conv (c -> 32 -> 32 -> 32 -> 1), tanh
//!   -> sort pooling on layer 4, embedding = concat(layers 1..3)   top_k x 96
//!   -> flatten                                                     1 x (96 * top_k)
//!   -> conv1d A (16 filters, width 96, stride 96)                  16 x top_k
//!   -> conv1d B (32 filters, width 5, stride 1)                    32 x (top_k - 4)
//!   -> dense 128 + ReLU (+ dropout while training)
//!   -> dense 2 -> softmax cross-entropy
//! ```
//!
//! Every graph is its own batch of one: adjacency shapes differ between
//! graphs, so nothing is stacked across examples.

use crate::conv::{propagation_matrix, GraphConv, GraphConvStack};
use crate::pool::sort_pool;
use crate::{Error, Result};
use candle_core::{DType, Device, Shape, Tensor, Var, D};
use candle_nn::{loss, AdamW, Conv1d, Conv1dConfig, Linear, Module, Optimizer, ParamsAdamW, VarMap};
use dgcnn_core::{GraphSample, GraphTensors};
use rand::prelude::*;
use rand_distr::Normal;
use rand_xorshift::XorShiftRng;
use tracing::debug;

/// Channels of each hidden graph convolution layer.
pub const GRAPH_CONV_CHANNELS: usize = 32;
/// Hidden graph convolution layers feeding the embedding.
pub const GRAPH_CONV_HIDDEN_LAYERS: usize = 3;
/// Per-node embedding width after concatenating the hidden layers.
pub const EMBEDDING_WIDTH: usize = GRAPH_CONV_CHANNELS * GRAPH_CONV_HIDDEN_LAYERS;
/// Filters of the first 1-D convolution.
pub const CONV1D_A_CHANNELS: usize = 16;
/// Filters of the second 1-D convolution.
pub const CONV1D_B_CHANNELS: usize = 32;
/// Kernel width of the second 1-D convolution; also the smallest usable `top_k`.
pub const CONV1D_B_WIDTH: usize = 5;
pub const DENSE_UNITS: usize = 128;
pub const NUM_CLASSES: usize = 2;
pub const DEFAULT_DROPOUT: f32 = 0.5;
pub const DEFAULT_LEARNING_RATE: f64 = 1e-4;

const INIT_STDDEV: f32 = 0.1;
const OUTPUT_INIT_STDDEV: f32 = 1.0;

/// Model configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DgcnnConfig {
    /// Width `c` of the input feature matrix.
    pub input_channels: usize,
    /// Sort-pooling cutoff, fixed for the dataset.
    pub top_k: usize,
    /// Adam learning rate (default: 1e-4).
    pub learning_rate: f64,
    /// Dropout on the dense layer while training (default: 0.5).
    pub dropout_rate: f32,
    /// Seed for parameter initialization and dropout masks (default: 42).
    pub seed: u64,
}

impl DgcnnConfig {
    pub fn new(input_channels: usize, top_k: usize) -> Self {
        Self {
            input_channels,
            top_k,
            learning_rate: DEFAULT_LEARNING_RATE,
            dropout_rate: DEFAULT_DROPOUT,
            seed: 42,
        }
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_dropout_rate(mut self, rate: f32) -> Self {
        self.dropout_rate = rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Length of the flattened second convolution output.
    pub fn flattened_width(&self) -> usize {
        CONV1D_B_CHANNELS * (self.top_k + 1).saturating_sub(CONV1D_B_WIDTH)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k < CONV1D_B_WIDTH {
            return Err(Error::InvalidConfig(format!(
                "top_k must be at least {CONV1D_B_WIDTH}, got {}",
                self.top_k
            )));
        }
        if self.input_channels == 0 {
            return Err(Error::InvalidConfig("input_channels must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(Error::InvalidConfig(format!(
                "dropout_rate must be within [0, 1), got {}",
                self.dropout_rate
            )));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Loss and logits of one forward pass.
pub struct ForwardOutput {
    /// Scalar softmax cross-entropy.
    pub loss: Tensor,
    /// Shape `(1, 2)`.
    pub logits: Tensor,
}

impl ForwardOutput {
    pub fn loss_value(&self) -> Result<f32> {
        Ok(self.loss.to_scalar::<f32>()?)
    }

    pub fn predicted_class(&self) -> Result<u32> {
        argmax(&self.logits)
    }
}

fn argmax(logits: &Tensor) -> Result<u32> {
    let classes: Vec<u32> = logits.argmax(D::Minus1)?.flatten_all()?.to_vec1()?;
    classes
        .first()
        .copied()
        .ok_or_else(|| Error::InvalidInput("empty logits".into()))
}

/// Creates seeded parameters and registers them in a [`VarMap`].
struct ParamInit<'a> {
    varmap: &'a VarMap,
    device: &'a Device,
    rng: XorShiftRng,
}

impl ParamInit<'_> {
    /// TensorFlow-style truncated normal: draws beyond two standard deviations
    /// are resampled.
    fn truncated_normal<S: Into<Shape>>(&mut self, name: &str, shape: S, stddev: f32) -> Result<Tensor> {
        let shape = shape.into();
        let normal = Normal::new(0f32, stddev).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let values: Vec<f32> = (0..shape.elem_count())
            .map(|_| loop {
                let v = normal.sample(&mut self.rng);
                if v.abs() <= 2.0 * stddev {
                    break v;
                }
            })
            .collect();
        self.register(name, Tensor::from_vec(values, shape, self.device)?)
    }

    fn zeros<S: Into<Shape>>(&mut self, name: &str, shape: S) -> Result<Tensor> {
        self.register(name, Tensor::zeros(shape, DType::F32, self.device)?)
    }

    fn register(&mut self, name: &str, init: Tensor) -> Result<Tensor> {
        let var = Var::from_tensor(&init)?;
        let tensor = var.as_tensor().clone();
        self.varmap
            .data()
            .lock()
            .map_err(|_| Error::InvalidConfig("parameter store lock poisoned".into()))?
            .insert(name.to_string(), var);
        Ok(tensor)
    }
}

/// Sort-pooling graph classifier.
///
/// Owns its parameters and the Adam state; only [`Dgcnn::update`] mutates them.
///
/// # Example
///
/// ```rust,ignore
/// let mut model = Dgcnn::new(DgcnnConfig::new(split.channels, split.top_k), &Device::Cpu)?;
/// for sample in &split.train {
///     let loss = model.train_step(sample)?;
/// }
/// let class = model.predict(&split.test[0].tensors)?;
/// ```
pub struct Dgcnn {
    config: DgcnnConfig,
    device: Device,
    varmap: VarMap,
    graph_convs: GraphConvStack,
    conv_a: Conv1d,
    conv_b: Conv1d,
    dense: Linear,
    output: Linear,
    optimizer: AdamW,
    dropout_rng: XorShiftRng,
    step: usize,
}

impl Dgcnn {
    /// Build a model with freshly initialized parameters.
    pub fn new(config: DgcnnConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let varmap = VarMap::new();
        let mut init = ParamInit {
            varmap: &varmap,
            device,
            rng: XorShiftRng::seed_from_u64(config.seed),
        };

        let mut hidden = Vec::with_capacity(GRAPH_CONV_HIDDEN_LAYERS);
        let mut in_features = config.input_channels;
        for layer in 0..GRAPH_CONV_HIDDEN_LAYERS {
            let w = init.truncated_normal(
                &format!("graph_conv.{layer}.weight"),
                (in_features, GRAPH_CONV_CHANNELS),
                INIT_STDDEV,
            )?;
            hidden.push(GraphConv::new(w));
            in_features = GRAPH_CONV_CHANNELS;
        }
        let score = GraphConv::new(init.truncated_normal(
            &format!("graph_conv.{GRAPH_CONV_HIDDEN_LAYERS}.weight"),
            (GRAPH_CONV_CHANNELS, 1),
            INIT_STDDEV,
        )?);
        let graph_convs = GraphConvStack::new(hidden, score);

        // Conv1d kernels are (out_channels, in_channels, width).
        let conv_a = Conv1d::new(
            init.truncated_normal("conv1d_a.weight", (CONV1D_A_CHANNELS, 1, EMBEDDING_WIDTH), INIT_STDDEV)?,
            None,
            Conv1dConfig {
                stride: EMBEDDING_WIDTH,
                ..Default::default()
            },
        );
        let conv_b = Conv1d::new(
            init.truncated_normal(
                "conv1d_b.weight",
                (CONV1D_B_CHANNELS, CONV1D_A_CHANNELS, CONV1D_B_WIDTH),
                INIT_STDDEV,
            )?,
            None,
            Conv1dConfig::default(),
        );

        // Linear weights are (out_features, in_features).
        let dense = Linear::new(
            init.truncated_normal("dense.weight", (DENSE_UNITS, config.flattened_width()), INIT_STDDEV)?,
            Some(init.zeros("dense.bias", DENSE_UNITS)?),
        );
        let output = Linear::new(
            init.truncated_normal("output.weight", (NUM_CLASSES, DENSE_UNITS), OUTPUT_INIT_STDDEV)?,
            Some(init.zeros("output.bias", NUM_CLASSES)?),
        );
        let dropout_rng = init.rng;

        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: config.learning_rate,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        Ok(Self {
            config,
            device: device.clone(),
            varmap,
            graph_convs,
            conv_a,
            conv_b,
            dense,
            output,
            optimizer,
            dropout_rng,
            step: 0,
        })
    }

    pub fn config(&self) -> &DgcnnConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Number of optimizer steps taken so far.
    pub fn step(&self) -> usize {
        self.step
    }

    /// A named parameter, e.g. `"graph_conv.0.weight"` or `"output.bias"`.
    pub fn parameter(&self, name: &str) -> Option<Tensor> {
        let data = self.varmap.data().lock().ok()?;
        data.get(name).map(|var| var.as_tensor().clone())
    }

    /// Sorted parameter names.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .varmap
            .data()
            .lock()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn num_parameters(&self) -> usize {
        self.varmap.all_vars().iter().map(|v| v.elem_count()).sum()
    }

    fn check_input(&self, tensors: &GraphTensors) -> Result<()> {
        let n = tensors.node_size;
        if n == 0 {
            return Err(Error::InvalidInput("graph has no nodes".into()));
        }
        for t in [&tensors.adjacency, &tensors.inv_degree] {
            let (rows, cols) = t.dims2()?;
            if rows != n || cols != n {
                return Err(Error::DimensionMismatch {
                    expected: n,
                    got: if rows != n { rows } else { cols },
                });
            }
        }
        let (rows, channels) = tensors.features.dims2()?;
        if rows != n {
            return Err(Error::DimensionMismatch { expected: n, got: rows });
        }
        if channels != self.config.input_channels {
            return Err(Error::DimensionMismatch {
                expected: self.config.input_channels,
                got: channels,
            });
        }
        Ok(())
    }

    /// Logits for one graph; `dropout` scales the dense activations when set.
    fn forward_logits(&self, tensors: &GraphTensors, dropout: Option<&Tensor>) -> Result<Tensor> {
        self.check_input(tensors)?;
        let top_k = self.config.top_k;

        let propagation = propagation_matrix(&tensors.inv_degree, &tensors.adjacency)?;
        let convs = self.graph_convs.forward(&tensors.features, &propagation)?;
        let pooled = sort_pool(&convs.embedding, &convs.scores, top_k)?;

        let sequence = pooled.reshape((1, 1, top_k * EMBEDDING_WIDTH))?;
        let a = self.conv_a.forward(&sequence)?;
        let b = self.conv_b.forward(&a)?;
        let flat = b.flatten_from(1)?;

        let mut h = self.dense.forward(&flat)?.relu()?;
        if let Some(mask) = dropout {
            h = h.broadcast_mul(mask)?;
        }
        Ok(self.output.forward(&h)?)
    }

    /// Inverted dropout mask of shape `(1, DENSE_UNITS)`.
    fn dropout_mask(&mut self) -> Result<Option<Tensor>> {
        let rate = self.config.dropout_rate;
        if rate == 0.0 {
            return Ok(None);
        }
        let scale = 1.0 / (1.0 - rate);
        let mask: Vec<f32> = (0..DENSE_UNITS)
            .map(|_| if self.dropout_rng.gen::<f32>() < rate { 0.0 } else { scale })
            .collect();
        Ok(Some(Tensor::from_vec(mask, (1, DENSE_UNITS), &self.device)?))
    }

    /// Forward pass with loss. Dropout is active only when `train` is true.
    pub fn forward(&mut self, sample: &GraphSample, train: bool) -> Result<ForwardOutput> {
        let mask = if train { self.dropout_mask()? } else { None };
        let logits = self.forward_logits(&sample.tensors, mask.as_ref())?;
        let target = Tensor::new(&[sample.label], &self.device)?;
        let loss = loss::cross_entropy(&logits, &target)?;
        Ok(ForwardOutput { loss, logits })
    }

    /// Evaluation logits, shape `(1, 2)`. Never applies dropout.
    pub fn logits(&self, tensors: &GraphTensors) -> Result<Tensor> {
        self.forward_logits(tensors, None)
    }

    /// Predicted class (argmax of the evaluation logits).
    pub fn predict(&self, tensors: &GraphTensors) -> Result<u32> {
        argmax(&self.logits(tensors)?)
    }

    /// One Adam step on the loss of `output`.
    pub fn update(&mut self, output: &ForwardOutput) -> Result<()> {
        self.optimizer.backward_step(&output.loss)?;
        self.step += 1;
        Ok(())
    }

    /// Forward with dropout, then update. Returns the loss before the update.
    pub fn train_step(&mut self, sample: &GraphSample) -> Result<f32> {
        let output = self.forward(sample, true)?;
        let loss = output.loss_value()?;
        self.update(&output)?;
        debug!(step = self.step, loss, "train step");
        Ok(loss)
    }
}
