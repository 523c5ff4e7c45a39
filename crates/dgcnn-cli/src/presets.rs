//! Per-dataset learning rates for the benchmark corpora.

use clap::ValueEnum;
use std::path::Path;

/// Benchmark datasets with a tuned learning rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Mutag,
    Cni1,
    Proteins,
    Dd,
}

impl Preset {
    pub fn learning_rate(self) -> f64 {
        match self {
            Preset::Mutag => 5e-5,
            Preset::Cni1 => 3e-5,
            Preset::Proteins | Preset::Dd => 1e-6,
        }
    }

    /// Case-insensitive lookup, e.g. `"MUTAG"` or `"dd"`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name, true).ok()
    }

    /// Preset named by a dataset file stem, e.g. `data/PROTEINS.json`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_stem().and_then(|s| s.to_str()).and_then(Self::from_name)
    }
}
