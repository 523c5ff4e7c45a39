//! Run configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults (with the dataset preset's learning rate)
//! 2. an optional TOML/JSON/YAML file passed with `--config`
//! 3. `DGCNN_` environment variables, `__` between levels
//!    (e.g. `DGCNN_TRAINING__EPOCHS=20`)
//! 4. command line flags, applied by the caller

use config::{Config, ConfigError, Environment, File};
use dgcnn_core::DEFAULT_TEST_FRACTION;
use dgcnn_nn::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Dataset preparation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Percentile of node counts used as the sort-pooling cutoff.
    pub percentile: f64,
    /// Fraction of graphs held out for testing.
    pub test_fraction: f64,
    /// Seed for the train/test shuffle.
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            percentile: 60.0,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub training: TrainingConfig,
}

impl RunConfig {
    /// Layer `file` and the environment over `base`.
    pub fn load(base: &RunConfig, file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(base)?);
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("DGCNN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = RunConfig::default();
        assert_eq!(c.data.percentile, 60.0);
        assert_eq!(c.data.test_fraction, 0.1);
        assert_eq!(c.training.epochs, 100);
        assert_eq!(c.training.learning_rate, 1e-4);
    }

    #[test]
    fn test_file_overrides_base() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[data]\npercentile = 80.0\n\n[training]\nepochs = 7").unwrap();

        let base = RunConfig::default();
        let loaded = RunConfig::load(&base, Some(file.path())).unwrap();
        assert_eq!(loaded.data.percentile, 80.0);
        assert_eq!(loaded.training.epochs, 7);
        // Untouched keys keep the base values.
        assert_eq!(loaded.data.test_fraction, base.data.test_fraction);
        assert_eq!(loaded.training.learning_rate, base.training.learning_rate);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let base = RunConfig::default();
        assert!(RunConfig::load(&base, Some(Path::new("/nonexistent/run.toml"))).is_err());
    }
}
