// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

//! Graph data preparation for sort-pooling graph classifiers.
//!
//! This crate turns a labelled graph corpus into the dense tensors a DGCNN
//! consumes:
//!
//! - [`RawGraph`] / [`Dataset`] - edge lists, optional tags and features, labels
//! - [`formats::descriptor`] - JSON dataset descriptor loader
//! - [`mod@tensorize`] - `A~ = A + I`, `D^-1`, feature matrix `X` for one graph
//! - [`mod@assemble`] - whole-dataset tensorization and the pooling cutoff `top_k`
//! - [`split`] - seeded co-shuffle and train/test split
//!
//! # Example
//!
//! ```rust
//! use candle_core::Device;
//! use dgcnn_core::{assemble, split_train_test, AssembleConfig, Dataset, RawGraph};
//!
//! let complete4 = vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
//! let dataset = Dataset::new(
//!     vec![
//!         RawGraph::new(3, vec![(0, 1), (1, 2)], 0),
//!         RawGraph::new(4, complete4, 1),
//!     ],
//!     0,
//! )?;
//!
//! let data = assemble(&dataset, &AssembleConfig::default(), &Device::Cpu)?;
//! assert_eq!(data.top_k, 3);
//!
//! let split = split_train_test(data, 0.5, 42)?;
//! assert_eq!(split.train.len(), 1);
//! # Ok::<(), dgcnn_core::Error>(())
//! ```

pub mod assemble;
mod error;
pub mod formats;
mod graph;
pub mod split;
pub mod tensorize;

pub use assemble::{assemble, percentile, top_k, AssembleConfig, AssembledDataset, GraphSample, LabelCounts};
pub use error::{Error, ErrorKind, Result};
pub use formats::DatasetDescriptor;
pub use graph::{Dataset, DatasetStats, RawGraph};
pub use split::{split_train_test, TrainTestSplit, DEFAULT_TEST_FRACTION};
pub use tensorize::{tensorize, FeatureEncoding, GraphTensors};
