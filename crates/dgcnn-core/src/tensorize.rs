//! Graph tensorization.
//!
//! Turns one [`RawGraph`] into the three dense matrices a sort-pooling graph
//! convolution consumes:
//!
//! ```text
//! A~  = A + I                      (n x n, symmetric, unit diagonal)
//! D^-1 = diag(rowsum(A~))^-1       (n x n, diagonal)
//! X   = one_hot(tags) | deg / sum(deg)   [ || continuous features ]
//! ```
//!
//! The self-loop guarantees every row sum of `A~` is at least 1, so `D^-1` is
//! always defined. Tensorization is deterministic.

use crate::{Error, RawGraph, Result};
use candle_core::{Device, Tensor};

/// How node features are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureEncoding {
    /// One-hot vertex tags over a global vocabulary.
    OneHot { vocabulary: usize },
    /// Degree of each node in `A~`, normalized to sum to 1 over the graph.
    Degree,
}

impl FeatureEncoding {
    /// Width of the base feature block, before continuous features.
    pub fn width(&self) -> usize {
        match self {
            FeatureEncoding::OneHot { vocabulary } => *vocabulary,
            FeatureEncoding::Degree => 1,
        }
    }
}

/// Dense tensors for one graph.
#[derive(Debug, Clone)]
pub struct GraphTensors {
    /// `A~`, shape `(n, n)`.
    pub adjacency: Tensor,
    /// `D^-1`, shape `(n, n)`.
    pub inv_degree: Tensor,
    /// `X`, shape `(n, c)`.
    pub features: Tensor,
    /// `n`.
    pub node_size: usize,
}

impl GraphTensors {
    /// Feature width `c`.
    pub fn channels(&self) -> usize {
        self.features.dims().last().copied().unwrap_or(0)
    }
}

/// Build the augmented adjacency `A~` as a row-major `n * n` buffer.
///
/// `graph` is only used for error reporting.
pub fn augmented_adjacency(raw: &RawGraph, graph: usize, offset: usize) -> Result<Vec<f32>> {
    let n = raw.node_count;
    if n == 0 {
        return Err(Error::EmptyGraph { graph });
    }
    let mut adj = vec![0f32; n * n];
    for &(u, v) in &raw.edges {
        let in_range = |id: usize| id >= offset && id - offset < n;
        if !in_range(u) || !in_range(v) {
            return Err(Error::EdgeOutOfRange {
                graph,
                u,
                v,
                node_count: n,
                offset,
            });
        }
        let (i, j) = (u - offset, v - offset);
        adj[i * n + j] = 1.0;
        adj[j * n + i] = 1.0;
    }
    // Explicit self-loops in the edge list must not double the diagonal.
    for i in 0..n {
        adj[i * n + i] = 1.0;
    }
    Ok(adj)
}

/// Row sums of a row-major `n * n` matrix.
pub fn row_sums(matrix: &[f32], n: usize) -> Vec<f32> {
    matrix.chunks_exact(n).map(|row| row.iter().sum()).collect()
}

/// Tensorize one graph.
///
/// # Arguments
/// - `raw`: the graph
/// - `graph`: position of the graph in its dataset (for error reporting)
/// - `offset`: dataset-wide id of the first node (0 or 1)
/// - `encoding`: feature construction; the one-hot vocabulary must be global
/// - `device`: where the tensors live
pub fn tensorize(
    raw: &RawGraph,
    graph: usize,
    offset: usize,
    encoding: FeatureEncoding,
    device: &Device,
) -> Result<GraphTensors> {
    let n = raw.node_count;
    let adj = augmented_adjacency(raw, graph, offset)?;
    let degrees = row_sums(&adj, n);

    let mut inv_degree = vec![0f32; n * n];
    for (i, &d) in degrees.iter().enumerate() {
        if d <= 0.0 {
            return Err(Error::DegenerateDegree { graph, node: i });
        }
        inv_degree[i * n + i] = 1.0 / d;
    }

    let base = match encoding {
        FeatureEncoding::OneHot { vocabulary } => one_hot_tags(raw, graph, offset, vocabulary)?,
        FeatureEncoding::Degree => {
            let total: f32 = degrees.iter().sum();
            degrees.iter().map(|d| d / total).collect()
        }
    };
    let (features, channels) = append_continuous(raw, graph, base, encoding.width())?;

    Ok(GraphTensors {
        adjacency: Tensor::from_vec(adj, (n, n), device)?,
        inv_degree: Tensor::from_vec(inv_degree, (n, n), device)?,
        features: Tensor::from_vec(features, (n, channels), device)?,
        node_size: n,
    })
}

fn one_hot_tags(raw: &RawGraph, graph: usize, offset: usize, vocabulary: usize) -> Result<Vec<f32>> {
    let n = raw.node_count;
    let tags = raw.tags.as_deref().ok_or(Error::LengthMismatch {
        graph,
        what: "vertex_tag",
        expected: n,
        got: 0,
    })?;
    if tags.len() != n {
        return Err(Error::LengthMismatch {
            graph,
            what: "vertex_tag",
            expected: n,
            got: tags.len(),
        });
    }
    let mut x = vec![0f32; n * vocabulary];
    for (node, &tag) in tags.iter().enumerate() {
        let column = tag
            .checked_sub(offset as i64)
            .filter(|c| *c >= 0 && (*c as usize) < vocabulary)
            .ok_or(Error::TagOutOfRange {
                graph,
                tag,
                vocabulary,
                offset,
            })?;
        x[node * vocabulary + column as usize] = 1.0;
    }
    Ok(x)
}

/// Concatenate continuous features column-wise onto `base` (`n x width`).
fn append_continuous(
    raw: &RawGraph,
    graph: usize,
    base: Vec<f32>,
    width: usize,
) -> Result<(Vec<f32>, usize)> {
    let Some(extra) = raw.features.as_deref() else {
        return Ok((base, width));
    };
    let n = raw.node_count;
    if extra.len() != n {
        return Err(Error::LengthMismatch {
            graph,
            what: "feature",
            expected: n,
            got: extra.len(),
        });
    }
    let extra_width = extra.first().map_or(0, Vec::len);
    let channels = width + extra_width;
    let mut out = Vec::with_capacity(n * channels);
    for (node, row) in extra.iter().enumerate() {
        if row.len() != extra_width {
            return Err(Error::InconsistentFeatureWidth {
                graph,
                expected: extra_width,
                got: row.len(),
            });
        }
        out.extend_from_slice(&base[node * width..(node + 1) * width]);
        out.extend_from_slice(row);
    }
    Ok((out, channels))
}
