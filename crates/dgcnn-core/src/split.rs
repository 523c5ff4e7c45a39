//! Train/test splitting.
//!
//! One seeded permutation reorders every per-graph sample; since adjacency,
//! inverse degree, features, label and node size of a graph travel together in
//! one [`GraphSample`], index `i` of every parallel view still describes the
//! same graph after shuffling. The test set is the tail.

use crate::assemble::{AssembledDataset, GraphSample, LabelCounts};
use crate::{Error, Result};
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use tracing::{info, warn};

/// Default held-out fraction.
pub const DEFAULT_TEST_FRACTION: f64 = 0.1;

/// Result of [`split_train_test`].
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<GraphSample>,
    pub test: Vec<GraphSample>,
    pub channels: usize,
    pub top_k: usize,
}

impl TrainTestSplit {
    pub fn train_counts(&self) -> LabelCounts {
        LabelCounts::from_labels(self.train.iter().map(|s| s.label))
    }

    pub fn test_counts(&self) -> LabelCounts {
        LabelCounts::from_labels(self.test.iter().map(|s| s.label))
    }
}

/// Seeded permutation of `0..len`.
pub fn permutation(len: usize, seed: u64) -> Vec<usize> {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(&mut rng);
    order
}

/// Shuffle all samples with one permutation and hold out the tail.
///
/// The training set has `trunc(len * (1 - test_fraction))` graphs.
pub fn split_train_test(data: AssembledDataset, test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(Error::InvalidTestFraction(test_fraction));
    }
    let AssembledDataset {
        samples,
        channels,
        top_k,
        ..
    } = data;

    let len = samples.len();
    let order = permutation(len, seed);
    let mut slots: Vec<Option<GraphSample>> = samples.into_iter().map(Some).collect();
    let mut shuffled: Vec<GraphSample> = order.iter().filter_map(|&i| slots[i].take()).collect();

    let train_len = (len as f64 * (1.0 - test_fraction)) as usize;
    if train_len == 0 {
        return Err(Error::EmptyDataset);
    }
    let test = shuffled.split_off(train_len);
    let split = TrainTestSplit {
        train: shuffled,
        test,
        channels,
        top_k,
    };

    let (train, test) = (split.train_counts(), split.test_counts());
    info!(
        "train ({}): positive examples {}, negative examples {}",
        train.total(),
        train.positive,
        train.negative
    );
    info!(
        "test ({}): positive examples {}, negative examples {}",
        test.total(),
        test.positive,
        test.negative
    );
    if split.test.is_empty() {
        warn!("test set is empty; test accuracy will be reported as 0");
    }
    Ok(split)
}
