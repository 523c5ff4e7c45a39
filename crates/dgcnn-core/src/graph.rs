use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One labelled graph as delivered by the data loader.
///
/// Node ids in `edges` and `tags` are stored as on disk, i.e. still carrying
/// the dataset-wide index offset (see [`Dataset::index_from`]).
///
/// # Example
///
/// ```rust
/// use dgcnn_core::RawGraph;
///
/// let path = RawGraph::new(3, vec![(0, 1), (1, 2)], 0);
/// assert_eq!(path.node_count, 3);
/// assert_eq!(path.class(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGraph {
    /// Number of nodes.
    pub node_count: usize,
    /// Undirected edges.
    pub edges: Vec<(usize, usize)>,
    /// Optional integer tag per node.
    pub tags: Option<Vec<i64>>,
    /// Optional continuous feature vector per node.
    pub features: Option<Vec<Vec<f32>>>,
    /// Raw label. Only `1` counts as the positive class.
    pub label: i64,
}

impl RawGraph {
    pub fn new(node_count: usize, edges: Vec<(usize, usize)>, label: i64) -> Self {
        Self {
            node_count,
            edges,
            tags: None,
            features: None,
            label,
        }
    }

    pub fn with_tags(mut self, tags: Vec<i64>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_features(mut self, features: Vec<Vec<f32>>) -> Self {
        self.features = Some(features);
        self
    }

    /// Binary class index: `1` for a raw label of `1`, `0` otherwise.
    #[must_use]
    pub fn class(&self) -> u32 {
        u32::from(self.label == 1)
    }
}

/// Summary statistics over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub graph_count: usize,
    pub min_nodes: usize,
    pub max_nodes: usize,
    pub mean_nodes: f64,
    pub total_edges: usize,
    pub positive: usize,
    pub negative: usize,
    /// Size of the global tag vocabulary, `None` if the dataset is untagged.
    pub tag_vocabulary: Option<usize>,
}

/// An ordered, immutable collection of raw graphs.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    graphs: Vec<RawGraph>,
    index_from: usize,
}

impl Dataset {
    /// Build a dataset. `index_from` is the id of the first node (0 or 1).
    pub fn new(graphs: Vec<RawGraph>, index_from: usize) -> Result<Self> {
        if index_from > 1 {
            return Err(Error::InvalidIndexBase(index_from));
        }
        if graphs.is_empty() {
            return Err(Error::EmptyDataset);
        }
        // Tags are all-or-nothing: the one-hot vocabulary is global.
        if graphs.iter().any(|g| g.tags.is_some()) {
            if let Some(graph) = graphs.iter().position(|g| g.tags.is_none()) {
                return Err(Error::LengthMismatch {
                    graph,
                    what: "vertex_tag",
                    expected: graphs[graph].node_count,
                    got: 0,
                });
            }
        }
        Ok(Self { graphs, index_from })
    }

    pub fn graphs(&self) -> &[RawGraph] {
        &self.graphs
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn index_from(&self) -> usize {
        self.index_from
    }

    /// True when every graph carries vertex tags.
    pub fn has_tags(&self) -> bool {
        self.graphs.iter().all(|g| g.tags.is_some())
    }

    pub fn node_counts(&self) -> Vec<usize> {
        self.graphs.iter().map(|g| g.node_count).collect()
    }

    /// Number of distinct tag values across the whole dataset.
    ///
    /// Computed globally so that every graph's one-hot width agrees.
    pub fn tag_vocabulary(&self) -> Option<usize> {
        if !self.has_tags() {
            return None;
        }
        let distinct: BTreeSet<i64> = self
            .graphs
            .iter()
            .filter_map(|g| g.tags.as_deref())
            .flatten()
            .copied()
            .collect();
        Some(distinct.len())
    }

    pub fn stats(&self) -> DatasetStats {
        let counts = self.node_counts();
        let positive = self.graphs.iter().filter(|g| g.class() == 1).count();
        DatasetStats {
            graph_count: self.graphs.len(),
            min_nodes: counts.iter().copied().min().unwrap_or(0),
            max_nodes: counts.iter().copied().max().unwrap_or(0),
            mean_nodes: counts.iter().sum::<usize>() as f64 / counts.len().max(1) as f64,
            total_edges: self.graphs.iter().map(|g| g.edges.len()).sum(),
            positive,
            negative: self.graphs.len() - positive,
            tag_vocabulary: self.tag_vocabulary(),
        }
    }
}
