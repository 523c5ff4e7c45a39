//! Dataset assembly.
//!
//! Tensorizes every graph of a [`Dataset`] with a single, dataset-wide feature
//! encoding and derives the sort-pooling cutoff `top_k` from the node-count
//! distribution. Any malformed graph aborts the whole assembly.

use crate::tensorize::{tensorize, FeatureEncoding, GraphTensors};
use crate::{Dataset, Error, Result};
use candle_core::{Device, Tensor};
use tracing::info;

/// Assembly configuration.
#[derive(Debug, Clone, Copy)]
pub struct AssembleConfig {
    /// Percentile of the node-count distribution used as `top_k` (default: 60).
    pub percentile: f64,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self { percentile: 60.0 }
    }
}

impl AssembleConfig {
    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile;
        self
    }
}

/// Linear-interpolation percentile (numpy's default method).
///
/// `q` is in `[0, 100]`.
pub fn percentile(values: &[usize], q: f64) -> Result<f64> {
    if !(0.0..=100.0).contains(&q) {
        return Err(Error::InvalidPercentile(q));
    }
    if values.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (a, b) = (sorted[lo] as f64, sorted[hi] as f64);
    Ok(a + (b - a) * (pos - lo as f64))
}

/// Pooling cutoff: the truncated percentile of the node counts.
pub fn top_k(node_counts: &[usize], q: f64) -> Result<usize> {
    Ok(percentile(node_counts, q)?.trunc() as usize)
}

/// Positive / negative example counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
}

impl LabelCounts {
    pub fn from_labels(labels: impl IntoIterator<Item = u32>) -> Self {
        labels.into_iter().fold(Self::default(), |mut acc, y| {
            if y == 1 {
                acc.positive += 1;
            } else {
                acc.negative += 1;
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

/// One tensorized, labelled graph.
#[derive(Debug, Clone)]
pub struct GraphSample {
    /// Position of the graph in the source dataset.
    pub source_index: usize,
    pub tensors: GraphTensors,
    /// Class index, 0 or 1.
    pub label: u32,
}

/// All graphs of a dataset, tensorized and aligned.
#[derive(Debug, Clone)]
pub struct AssembledDataset {
    pub samples: Vec<GraphSample>,
    /// Feature width shared by every graph.
    pub channels: usize,
    pub top_k: usize,
    pub encoding: FeatureEncoding,
}

impl AssembledDataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn adjacencies(&self) -> Vec<&Tensor> {
        self.samples.iter().map(|s| &s.tensors.adjacency).collect()
    }

    pub fn inv_degrees(&self) -> Vec<&Tensor> {
        self.samples.iter().map(|s| &s.tensors.inv_degree).collect()
    }

    pub fn features(&self) -> Vec<&Tensor> {
        self.samples.iter().map(|s| &s.tensors.features).collect()
    }

    pub fn labels(&self) -> Vec<u32> {
        self.samples.iter().map(|s| s.label).collect()
    }

    pub fn node_sizes(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.tensors.node_size).collect()
    }

    pub fn label_counts(&self) -> LabelCounts {
        LabelCounts::from_labels(self.labels())
    }
}

/// Tensorize a whole dataset.
pub fn assemble(dataset: &Dataset, config: &AssembleConfig, device: &Device) -> Result<AssembledDataset> {
    let offset = dataset.index_from();
    let top_k = top_k(&dataset.node_counts(), config.percentile)?;
    info!(
        "{}% graphs have nodes less than {}.",
        config.percentile, top_k
    );

    let encoding = match dataset.tag_vocabulary() {
        Some(vocabulary) => {
            info!(vocabulary, "X: one-hot vertex tag");
            FeatureEncoding::OneHot { vocabulary }
        }
        None => {
            info!("X: normalized node degree");
            FeatureEncoding::Degree
        }
    };

    let mut samples = Vec::with_capacity(dataset.len());
    let mut channels = None;
    for (index, raw) in dataset.graphs().iter().enumerate() {
        let tensors = tensorize(raw, index, offset, encoding, device)?;
        let c = tensors.channels();
        match channels {
            None => channels = Some(c),
            Some(expected) if expected != c => {
                return Err(Error::InconsistentFeatureWidth {
                    graph: index,
                    expected,
                    got: c,
                })
            }
            Some(_) => {}
        }
        samples.push(GraphSample {
            source_index: index,
            tensors,
            label: raw.class(),
        });
    }
    let channels = channels.ok_or(Error::EmptyDataset)?;

    let assembled = AssembledDataset {
        samples,
        channels,
        top_k,
        encoding,
    };
    let counts = assembled.label_counts();
    info!(
        positive = counts.positive,
        negative = counts.negative,
        channels,
        "assembled {} graphs",
        assembled.len()
    );
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawGraph;

    fn toy() -> Dataset {
        let complete4 = vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        Dataset::new(
            vec![
                RawGraph::new(3, vec![(0, 1), (1, 2)], 0),
                RawGraph::new(4, complete4, 1),
            ],
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        assert_eq!(percentile(&[1, 2, 3, 4], 50.0).unwrap(), 2.5);
        assert_eq!(percentile(&[10], 60.0).unwrap(), 10.0);
        assert_eq!(percentile(&[5, 1, 3], 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&[5, 1, 3], 100.0).unwrap(), 5.0);
        // pos = 0.6 * 4 = 2.4 over [10, 20, 30, 40, 50]
        assert!((percentile(&[50, 10, 40, 20, 30], 60.0).unwrap() - 34.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_rejects_out_of_range() {
        assert!(matches!(percentile(&[1], 101.0), Err(Error::InvalidPercentile(_))));
        assert!(matches!(percentile(&[1], -1.0), Err(Error::InvalidPercentile(_))));
        assert!(matches!(percentile(&[], 50.0), Err(Error::EmptyDataset)));
    }

    #[test]
    fn test_top_k_truncates() {
        // 3 + 0.6 * (4 - 3) = 3.6
        assert_eq!(top_k(&[3, 4], 60.0).unwrap(), 3);
    }

    #[test]
    fn test_assemble_toy() {
        let data = assemble(&toy(), &AssembleConfig::default(), &Device::Cpu).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.top_k, 3);
        assert_eq!(data.channels, 1);
        assert_eq!(data.encoding, FeatureEncoding::Degree);
        assert_eq!(data.labels(), vec![0, 1]);
        assert_eq!(data.node_sizes(), vec![3, 4]);
        assert_eq!(data.adjacencies()[1].dims(), &[4, 4]);
        assert_eq!(data.label_counts(), LabelCounts { positive: 1, negative: 1 });
    }

    #[test]
    fn test_assemble_one_hot_width_is_global() {
        let ds = Dataset::new(
            vec![
                RawGraph::new(2, vec![(1, 2)], 1).with_tags(vec![1, 1]),
                RawGraph::new(3, vec![(1, 2), (2, 3)], 0).with_tags(vec![2, 3, 4]),
            ],
            1,
        )
        .unwrap();
        let data = assemble(&ds, &AssembleConfig::default(), &Device::Cpu).unwrap();
        assert_eq!(data.channels, 4);
        for features in data.features() {
            assert_eq!(features.dims()[1], 4);
        }
    }

    #[test]
    fn test_assemble_aborts_on_bad_graph() {
        let ds = Dataset::new(
            vec![
                RawGraph::new(3, vec![(0, 1)], 0),
                RawGraph::new(2, vec![(0, 7)], 1),
            ],
            0,
        )
        .unwrap();
        let err = assemble(&ds, &AssembleConfig::default(), &Device::Cpu).unwrap_err();
        assert!(matches!(err, Error::EdgeOutOfRange { graph: 1, .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Data);
    }

    #[test]
    fn test_assemble_rejects_ragged_continuous_features() {
        let ds = Dataset::new(
            vec![
                RawGraph::new(1, vec![], 0).with_features(vec![vec![0.5]]),
                RawGraph::new(1, vec![], 1).with_features(vec![vec![0.5, 0.5]]),
            ],
            0,
        )
        .unwrap();
        let err = assemble(&ds, &AssembleConfig::default(), &Device::Cpu).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentFeatureWidth { graph: 1, expected: 2, got: 3 }
        ));
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
