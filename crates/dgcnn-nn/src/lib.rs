//! DGCNN: sort-pooling graph classification on candle.
//!
//! `dgcnn-nn` holds the network and its training loop. Graph preparation
//! (tensorization, `top_k`, splitting) lives in `dgcnn-core`.
//!
//! # Modules
//!
//! - [`conv`]: Random-walk graph convolutions `tanh(D^-1 A~ Z W)`
//! - [`pool`]: Sort pooling to a fixed `top_k x 96` sequence
//! - [`model`]: The full classifier and its Adam update
//! - [`training`]: Epoch loop, evaluation, progress hooks
//! - [`summary`]: Parameter statistics for debug output
//!
//! # Example
//!
//! ```rust,ignore
//! use dgcnn_core::{assemble, split_train_test, AssembleConfig, DatasetDescriptor};
//! use dgcnn_nn::training::{Trainer, TrainingConfig};
//! use candle_core::Device;
//!
//! let dataset = DatasetDescriptor::from_json_file("MUTAG.json")?.into_dataset()?;
//! let data = assemble(&dataset, &AssembleConfig::default(), &Device::Cpu)?;
//! let split = split_train_test(data, 0.1, 42)?;
//!
//! let trainer = Trainer::new(TrainingConfig::default().with_learning_rate(5e-5));
//! let mut model = trainer.build_model(&split, &Device::Cpu)?;
//! let result = trainer.fit(&mut model, &split, &mut ())?;
//! ```

pub mod conv;
pub mod error;
pub mod model;
pub mod pool;
pub mod summary;
pub mod training;

pub use error::{Error, Result};
pub use model::{Dgcnn, DgcnnConfig, ForwardOutput};
pub use summary::ParameterSummary;
pub use training::{EpochReport, Trainer, TrainingConfig, TrainingObserver, TrainingResult};
