//! Parameter summaries for debugging training runs.

use crate::Result;
use candle_core::Tensor;
use std::fmt;

/// Mean, variance, max and min of one tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSummary {
    pub mean: f32,
    pub variance: f32,
    pub max: f32,
    pub min: f32,
}

impl ParameterSummary {
    pub fn of(tensor: &Tensor) -> Result<Self> {
        let values: Vec<f32> = tensor.flatten_all()?.to_vec1()?;
        let n = values.len().max(1) as f32;
        let mean = values.iter().sum::<f32>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        Ok(Self {
            mean,
            variance,
            max,
            min,
        })
    }
}

impl fmt::Display for ParameterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean: {:.6}, variance: {:.6}, max: {:.6}, min: {:.6}",
            self.mean, self.variance, self.max, self.min
        )
    }
}
