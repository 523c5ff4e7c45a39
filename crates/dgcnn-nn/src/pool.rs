//! Sort pooling.
//!
//! Projects a variable-size set of node embeddings onto a fixed-length,
//! ordered sequence:
//!
//! 1. rank nodes by their score in descending order
//! 2. gather the embeddings in that order
//! 3. if `n > k`, keep the first `k` rows; if `n < k`, append `k - n` zero rows
//!
//! The result is always `k x d`, so a fixed-shape 1-D convolution can follow.
//! Ranking happens outside the autograd graph: gradients flow through the
//! gathered embeddings but not through the scores.

use crate::Result;
use candle_core::{Tensor, D};
use std::cmp::Ordering;

/// Node indices ordered by descending score.
///
/// Equal scores keep ascending node order. NaN scores sort last.
pub fn sort_order(scores: &Tensor) -> Result<Vec<u32>> {
    let values: Vec<f32> = scores.flatten_all()?.to_vec1()?;
    let mut order: Vec<u32> = (0..values.len() as u32).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (values[a as usize], values[b as usize]);
        y.partial_cmp(&x).unwrap_or_else(|| x.is_nan().cmp(&y.is_nan()))
    });
    Ok(order)
}

/// Sort-pool `embedding` (N x d) by `scores` (N x 1) to exactly `top_k` rows.
pub fn sort_pool(embedding: &Tensor, scores: &Tensor, top_k: usize) -> Result<Tensor> {
    let n = embedding.dim(0)?;
    let width = embedding.dim(D::Minus1)?;
    let order = sort_order(scores)?;

    let keep = n.min(top_k);
    let index = Tensor::from_slice(&order[..keep], keep, embedding.device())?;
    let gathered = embedding.index_select(&index, 0)?;

    match keep.cmp(&top_k) {
        Ordering::Less => {
            let padding = Tensor::zeros((top_k - keep, width), embedding.dtype(), embedding.device())?;
            Ok(Tensor::cat(&[&gathered, &padding], 0)?)
        }
        _ => Ok(gathered),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    /// Embedding whose row `i` is filled with `i + 1`, so rows are identifiable.
    fn labelled_rows(n: usize, width: usize) -> Tensor {
        let data: Vec<f32> = (0..n)
            .flat_map(|i| std::iter::repeat((i + 1) as f32).take(width))
            .collect();
        Tensor::from_vec(data, (n, width), &Device::Cpu).unwrap()
    }

    fn scores(values: &[f32]) -> Tensor {
        Tensor::from_slice(values, (values.len(), 1), &Device::Cpu).unwrap()
    }

    fn first_column(t: &Tensor) -> Vec<f32> {
        t.to_vec2::<f32>().unwrap().into_iter().map(|row| row[0]).collect()
    }

    #[test]
    fn test_sort_order_descending() {
        let order = sort_order(&scores(&[0.1, 0.9, -0.5, 0.4])).unwrap();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_sort_order_ties_keep_node_order() {
        let order = sort_order(&scores(&[0.2, 0.7, 0.2, 0.7])).unwrap();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_truncates_to_highest_scores() {
        let emb = labelled_rows(5, 96);
        let out = sort_pool(&emb, &scores(&[0.3, -0.1, 0.8, 0.5, 0.0]), 3).unwrap();
        assert_eq!(out.dims(), &[3, 96]);
        // Nodes 2, 3, 0 carry the three highest scores.
        assert_eq!(first_column(&out), vec![3.0, 4.0, 1.0]);
    }

    #[test]
    fn test_pads_with_zero_rows() {
        let emb = labelled_rows(2, 96);
        let out = sort_pool(&emb, &scores(&[0.1, 0.2]), 5).unwrap();
        assert_eq!(out.dims(), &[5, 96]);
        let rows = out.to_vec2::<f32>().unwrap();
        assert!(rows[0].iter().all(|&v| v == 2.0));
        assert!(rows[1].iter().all(|&v| v == 1.0));
        for row in &rows[2..] {
            assert!(row.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_exact_size_is_a_permutation() {
        let emb = labelled_rows(3, 96);
        let out = sort_pool(&emb, &scores(&[-1.0, 1.0, 0.0]), 3).unwrap();
        assert_eq!(out.dims(), &[3, 96]);
        assert_eq!(first_column(&out), vec![2.0, 3.0, 1.0]);
    }
}
