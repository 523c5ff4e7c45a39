//! Training loop for the DGCNN classifier.
//!
//! Each epoch performs one optimizer step per training graph (batch size 1)
//! and then measures accuracy on the full training and test sets with dropout
//! disabled.
//!
//! Graphs are visited in a fixed rotation rather than reshuffled every epoch:
//! the cursor is advanced *before* each step and wraps at the end, so an epoch
//! over `n` graphs visits `1, 2, ..., n - 1, 0`. See [`rotation_order`].
//!
//! # Example
//!
//! ```rust,ignore
//! use dgcnn_nn::training::{Trainer, TrainingConfig};
//!
//! let trainer = Trainer::new(TrainingConfig::default().with_epochs(10));
//! let mut model = trainer.build_model(&split, &Device::Cpu)?;
//! let result = trainer.fit(&mut model, &split, &mut ())?;
//! println!("test acc {}", result.final_test_accuracy());
//! ```

use crate::model::{Dgcnn, DgcnnConfig, DEFAULT_DROPOUT, DEFAULT_LEARNING_RATE};
use crate::summary::ParameterSummary;
use crate::{Error, Result};
use candle_core::Device;
use dgcnn_core::{GraphSample, TrainTestSplit};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Passes over the training set (default: 100).
    pub epochs: usize,
    /// Adam learning rate (default: 1e-4).
    pub learning_rate: f64,
    /// Dense-layer dropout while training (default: 0.5).
    pub dropout_rate: f32,
    /// Seed for parameter initialization and dropout (default: 42).
    pub seed: u64,
    /// Report statistics of the first graph-conv weight every epoch.
    pub debug: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: DEFAULT_LEARNING_RATE,
            dropout_rate: DEFAULT_DROPOUT,
            seed: 42,
            debug: false,
        }
    }
}

impl TrainingConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
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

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Visiting order for one epoch over `len` training graphs.
pub fn rotation_order(len: usize) -> impl Iterator<Item = usize> {
    (0..len).map(move |i| (i + 1) % len)
}

/// Metrics reported after each epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// Loss of the last training step of the epoch.
    pub loss: f32,
    pub train_accuracy: f32,
    pub test_accuracy: f32,
    /// Optimizer steps taken so far.
    pub step: usize,
    /// First graph-conv weight statistics, when debugging.
    pub summary: Option<ParameterSummary>,
}

/// Outcome of [`Trainer::fit`].
#[derive(Debug, Clone)]
pub struct TrainingResult {
    pub history: Vec<EpochReport>,
    pub elapsed: Duration,
}

impl TrainingResult {
    pub fn final_test_accuracy(&self) -> f32 {
        self.history.last().map_or(0.0, |r| r.test_accuracy)
    }

    pub fn final_train_accuracy(&self) -> f32 {
        self.history.last().map_or(0.0, |r| r.train_accuracy)
    }
}

/// Hooks for progress reporting. All methods default to no-ops.
pub trait TrainingObserver {
    fn on_epoch_start(&mut self, _epoch: usize, _steps: usize) {}
    fn on_step(&mut self, _step: usize, _loss: f32) {}
    fn on_epoch_end(&mut self, _report: &EpochReport) {}
}

impl TrainingObserver for () {}

/// Runs epochs of per-graph updates followed by evaluation.
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Model configuration for `split` under this training configuration.
    pub fn model_config(&self, split: &TrainTestSplit) -> DgcnnConfig {
        DgcnnConfig::new(split.channels, split.top_k)
            .with_learning_rate(self.config.learning_rate)
            .with_dropout_rate(self.config.dropout_rate)
            .with_seed(self.config.seed)
    }

    pub fn build_model(&self, split: &TrainTestSplit, device: &Device) -> Result<Dgcnn> {
        Dgcnn::new(self.model_config(split), device)
    }

    /// One epoch of single-graph updates. Returns the last loss.
    pub fn train_epoch(
        &self,
        model: &mut Dgcnn,
        train: &[GraphSample],
        observer: &mut impl TrainingObserver,
    ) -> Result<f32> {
        if train.is_empty() {
            return Err(Error::Data(dgcnn_core::Error::EmptyDataset));
        }
        let mut loss = 0.0;
        for index in rotation_order(train.len()) {
            loss = model.train_step(&train[index])?;
            observer.on_step(model.step(), loss);
        }
        Ok(loss)
    }

    /// Fraction of `samples` whose argmax prediction matches the label.
    ///
    /// Evaluation passes are independent and run in parallel. An empty set
    /// scores 0.
    pub fn evaluate(model: &Dgcnn, samples: &[GraphSample]) -> Result<f32> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let hits = samples
            .par_iter()
            .map(|s| model.predict(&s.tensors).map(|class| usize::from(class == s.label)))
            .collect::<Result<Vec<usize>>>()?;
        Ok(hits.iter().sum::<usize>() as f32 / samples.len() as f32)
    }

    /// Train for `config.epochs` epochs.
    pub fn fit(
        &self,
        model: &mut Dgcnn,
        split: &TrainTestSplit,
        observer: &mut impl TrainingObserver,
    ) -> Result<TrainingResult> {
        info!(
            learning_rate = self.config.learning_rate,
            epochs = self.config.epochs,
            "start training"
        );
        let start = Instant::now();
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 0..self.config.epochs {
            observer.on_epoch_start(epoch, split.train.len());
            let loss = self.train_epoch(model, &split.train, observer)?;
            let train_accuracy = Self::evaluate(model, &split.train)?;
            let test_accuracy = Self::evaluate(model, &split.test)?;

            let summary = if self.config.debug {
                model
                    .parameter("graph_conv.0.weight")
                    .map(|w| ParameterSummary::of(&w))
                    .transpose()?
            } else {
                None
            };
            if let Some(summary) = &summary {
                info!("debug: {summary}");
            }

            let report = EpochReport {
                epoch,
                loss,
                train_accuracy,
                test_accuracy,
                step: model.step(),
                summary,
            };
            info!(
                "After {:>5} epoch, the loss is {:.6}, training acc {:.6}, test acc {:.6}.",
                epoch, loss, train_accuracy, test_accuracy
            );
            observer.on_epoch_end(&report);
            history.push(report);
        }

        let elapsed = start.elapsed();
        info!("time consumption: {:.2?}", elapsed);
        Ok(TrainingResult { history, elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dgcnn_core::{assemble, split_train_test, AssembleConfig, Dataset, RawGraph};

    fn split() -> TrainTestSplit {
        // Paths (label 0) versus cliques (label 1) of 5..=8 nodes.
        let mut graphs = Vec::new();
        for n in 5..=8 {
            graphs.push(RawGraph::new(n, (1..n).map(|v| (v - 1, v)).collect(), 0));
            let clique = (0..n).flat_map(|u| (u + 1..n).map(move |v| (u, v))).collect();
            graphs.push(RawGraph::new(n, clique, 1));
        }
        let ds = Dataset::new(graphs, 0).unwrap();
        let data = assemble(&ds, &AssembleConfig::default(), &Device::Cpu).unwrap();
        split_train_test(data, 0.25, 7).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        epochs_started: usize,
        steps: Vec<usize>,
        reports: usize,
    }

    impl TrainingObserver for Recorder {
        fn on_epoch_start(&mut self, _epoch: usize, _steps: usize) {
            self.epochs_started += 1;
        }
        fn on_step(&mut self, step: usize, _loss: f32) {
            self.steps.push(step);
        }
        fn on_epoch_end(&mut self, _report: &EpochReport) {
            self.reports += 1;
        }
    }

    #[test]
    fn test_rotation_order_wraps() {
        assert_eq!(rotation_order(4).collect::<Vec<_>>(), vec![1, 2, 3, 0]);
        assert_eq!(rotation_order(1).collect::<Vec<_>>(), vec![0]);
        assert_eq!(rotation_order(0).count(), 0);
    }

    #[test]
    fn test_fit_reports_every_epoch() {
        let split = split();
        let trainer = Trainer::new(TrainingConfig::default().with_epochs(2).with_debug(true));
        let mut model = trainer.build_model(&split, &Device::Cpu).unwrap();
        let mut recorder = Recorder::default();

        let result = trainer.fit(&mut model, &split, &mut recorder).unwrap();

        assert_eq!(result.history.len(), 2);
        assert_eq!(recorder.epochs_started, 2);
        assert_eq!(recorder.reports, 2);
        assert_eq!(recorder.steps.len(), 2 * split.train.len());
        assert_eq!(model.step(), 2 * split.train.len());
        for report in &result.history {
            assert!(report.loss.is_finite());
            assert!((0.0..=1.0).contains(&report.train_accuracy));
            assert!((0.0..=1.0).contains(&report.test_accuracy));
            assert!(report.summary.is_some());
        }
        assert_eq!(result.history[1].step, model.step());
    }

    #[test]
    fn test_evaluate_empty_is_zero() {
        let split = split();
        let trainer = Trainer::new(TrainingConfig::default());
        let model = trainer.build_model(&split, &Device::Cpu).unwrap();
        assert_eq!(Trainer::evaluate(&model, &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_evaluate_matches_sequential_predictions() {
        let split = split();
        let trainer = Trainer::new(TrainingConfig::default());
        let model = trainer.build_model(&split, &Device::Cpu).unwrap();
        let expected = split
            .train
            .iter()
            .filter(|s| model.predict(&s.tensors).unwrap() == s.label)
            .count() as f32
            / split.train.len() as f32;
        assert_eq!(Trainer::evaluate(&model, &split.train).unwrap(), expected);
    }

    #[test]
    fn test_train_epoch_rejects_empty() {
        let split = split();
        let trainer = Trainer::new(TrainingConfig::default());
        let mut model = trainer.build_model(&split, &Device::Cpu).unwrap();
        assert!(trainer.train_epoch(&mut model, &[], &mut ()).is_err());
    }

    #[test]
    fn test_training_is_reproducible() {
        let split = split();
        let trainer = Trainer::new(TrainingConfig::default().with_epochs(1).with_seed(3));
        let run = || {
            let mut model = trainer.build_model(&split, &Device::Cpu).unwrap();
            trainer.fit(&mut model, &split, &mut ()).unwrap().history[0].loss
        };
        assert_eq!(run(), run());
    }
}
