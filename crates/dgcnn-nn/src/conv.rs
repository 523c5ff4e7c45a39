//! Graph convolution layers.
//!
//! The DGCNN propagation rule is a random-walk normalized GCN:
//!
//! ```text
//! Z_l = tanh(D^-1 A~ Z_{l-1} W_l),   Z_0 = X
//! ```
//!
//! Unlike the symmetric `D^-1/2 A D^-1/2` of Kipf & Welling, each node takes
//! the mean over its closed neighbourhood. The stack concatenates the outputs of
//! all but the last layer into the node embedding; the last layer has a single
//! channel and serves as the sort key for [`crate::pool`].
//!
//! # Reference
//!
//! Zhang et al., "An End-to-End Deep Learning Architecture for Graph
//! Classification", AAAI 2018.

use crate::Result;
use candle_core::Tensor;

/// One graph convolution layer without bias: `tanh(P Z W)`.
pub struct GraphConv {
    weight: Tensor,
}

impl GraphConv {
    /// Wrap a `(in_features, out_features)` weight.
    pub fn new(weight: Tensor) -> Self {
        Self { weight }
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn out_features(&self) -> usize {
        self.weight.dims().last().copied().unwrap_or(0)
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `z`: Node features (N x in_features)
    /// - `propagation`: `D^-1 A~` (N x N)
    ///
    /// # Returns
    /// - Node embeddings (N x out_features)
    pub fn forward(&self, z: &Tensor, propagation: &Tensor) -> Result<Tensor> {
        let h = z.matmul(&self.weight)?;
        Ok(propagation.matmul(&h)?.tanh()?)
    }
}

/// Random-walk propagation matrix `D^-1 A~`.
pub fn propagation_matrix(inv_degree: &Tensor, adjacency: &Tensor) -> Result<Tensor> {
    Ok(inv_degree.matmul(adjacency)?)
}

/// Output of a [`GraphConvStack`].
pub struct GraphConvOutput {
    /// Concatenated embeddings of the hidden layers (N x sum of hidden widths).
    pub embedding: Tensor,
    /// Output of the last layer (N x 1), used only to rank nodes.
    pub scores: Tensor,
}

/// Stacked graph convolutions with a scalar scoring layer on top.
pub struct GraphConvStack {
    hidden: Vec<GraphConv>,
    score: GraphConv,
}

impl GraphConvStack {
    pub fn new(hidden: Vec<GraphConv>, score: GraphConv) -> Self {
        Self { hidden, score }
    }

    /// Width of the concatenated embedding.
    pub fn embedding_width(&self) -> usize {
        self.hidden.iter().map(GraphConv::out_features).sum()
    }

    pub fn layers(&self) -> impl Iterator<Item = &GraphConv> {
        self.hidden.iter().chain(std::iter::once(&self.score))
    }

    pub fn forward(&self, x: &Tensor, propagation: &Tensor) -> Result<GraphConvOutput> {
        let mut z = x.clone();
        let mut outputs = Vec::with_capacity(self.hidden.len());
        for layer in &self.hidden {
            z = layer.forward(&z, propagation)?;
            outputs.push(z.clone());
        }
        let scores = self.score.forward(&z, propagation)?;
        let embedding = Tensor::cat(&outputs, 1)?;
        Ok(GraphConvOutput { embedding, scores })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_graph_conv_forward_shape() {
        let device = Device::Cpu;
        let conv = GraphConv::new(Tensor::randn(0f32, 0.1, (4, 32), &device).unwrap());

        let x = Tensor::randn(0f32, 1f32, (10, 4), &device).unwrap();
        let p = Tensor::eye(10, DType::F32, &device).unwrap();

        let out = conv.forward(&x, &p).unwrap();
        assert_eq!(out.dims(), &[10, 32]);
    }

    #[test]
    fn test_graph_conv_averages_neighbourhood() {
        let device = Device::Cpu;
        // Identity weight: output is tanh of the neighbourhood mean.
        let conv = GraphConv::new(Tensor::eye(1, DType::F32, &device).unwrap());

        // Path 0 - 1 - 2 with self-loops.
        let adj = Tensor::from_vec(
            vec![1f32, 1., 0., 1., 1., 1., 0., 1., 1.],
            (3, 3),
            &device,
        )
        .unwrap();
        let inv = Tensor::from_vec(
            vec![0.5f32, 0., 0., 0., 1. / 3., 0., 0., 0., 0.5],
            (3, 3),
            &device,
        )
        .unwrap();
        let x = Tensor::from_vec(vec![3f32, 0., 3.], (3, 1), &device).unwrap();

        let p = propagation_matrix(&inv, &adj).unwrap();
        let out: Vec<f32> = conv.forward(&x, &p).unwrap().flatten_all().unwrap().to_vec1().unwrap();
        let expected = [1.5f32.tanh(), 2f32.tanh(), 1.5f32.tanh()];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stack_concatenates_hidden_layers() {
        let device = Device::Cpu;
        let w = |i: usize, o: usize| GraphConv::new(Tensor::randn(0f32, 0.1, (i, o), &device).unwrap());
        let stack = GraphConvStack::new(vec![w(3, 32), w(32, 32), w(32, 32)], w(32, 1));
        assert_eq!(stack.embedding_width(), 96);
        assert_eq!(stack.layers().count(), 4);

        let x = Tensor::randn(0f32, 1f32, (7, 3), &device).unwrap();
        let p = Tensor::eye(7, DType::F32, &device).unwrap();
        let out = stack.forward(&x, &p).unwrap();
        assert_eq!(out.embedding.dims(), &[7, 96]);
        assert_eq!(out.scores.dims(), &[7, 1]);
    }
}
