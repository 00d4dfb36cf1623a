use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the human-readable configuration of a solver and the
// diagnostics it produces. Both serialize to TOML.

/// Hyperparameters and stopping rules for one network-constrained Lasso fit.
///
/// All values are fixed for the lifetime of a solver; there is no internal search
/// over the penalty strengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NcLassoConfig {
    /// Weight of the L1 sparsity term.
    pub lambda1: f64,
    /// Weight of the network smoothness term `||Tβ||²`.
    pub lambda2: f64,
    /// Relative tolerance on the largest coefficient change within one sweep.
    pub tolerance: f64,
    /// Ceiling on full coordinate-descent sweeps.
    pub max_iterations: usize,
    /// Start each fit from the previous coefficients instead of zeros.
    pub warm_start: bool,
    /// Coefficients with magnitude at or below this value are not reported as selected.
    pub selection_threshold: f64,
}

impl Default for NcLassoConfig {
    fn default() -> Self {
        Self {
            lambda1: 0.0,
            lambda2: 0.0,
            tolerance: 1e-6,
            max_iterations: 1000,
            warm_start: false,
            selection_threshold: 1e-10,
        }
    }
}

/// Custom error type for configuration loading, saving, and validation.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Invalid solver configuration: {0}")]
    InvalidConfig(String),
}

impl NcLassoConfig {
    pub fn new(lambda1: f64, lambda2: f64) -> Self {
        Self {
            lambda1,
            lambda2,
            ..Self::default()
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    pub fn with_selection_threshold(mut self, selection_threshold: f64) -> Self {
        self.selection_threshold = selection_threshold;
        self
    }

    /// Checks that every field lies in its admissible range.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, value) in [("lambda1", self.lambda1), ("lambda2", self.lambda2)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ModelError::InvalidConfig(format!(
                "tolerance must be finite and positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ModelError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.selection_threshold.is_finite() || self.selection_threshold < 0.0 {
            return Err(ModelError::InvalidConfig(format!(
                "selection_threshold must be finite and non-negative, got {}",
                self.selection_threshold
            )));
        }
        Ok(())
    }

    /// Parses and validates a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ModelError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path)?;
        Self::from_toml_str(&toml_string)
    }

    /// Saves the configuration to a file in TOML format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Which stopping rule ended a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// The relative coefficient change fell below the tolerance.
    Converged,
    /// The sweep ceiling was hit first. Coefficients are the best available iterate.
    MaxIterationsReached,
}

/// Diagnostics from the most recent fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub status: FitStatus,
    /// Number of full coordinate sweeps performed.
    pub iterations: usize,
    /// `L(β)` at the returned coefficients.
    pub objective: f64,
    /// Largest coefficient change in the last sweep, relative to the largest coefficient.
    pub relative_change: f64,
    /// Number of coefficients above the selection threshold.
    pub num_selected: usize,
}

impl FitReport {
    pub fn converged(&self) -> bool {
        self.status == FitStatus::Converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        NcLassoConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = NcLassoConfig::from_toml_str("lambda1 = 0.05\nlambda2 = 0.2\n").unwrap();
        assert_eq!(config.lambda1, 0.05);
        assert_eq!(config.lambda2, 0.2);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.max_iterations, 1000);
        assert!(!config.warm_start);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            NcLassoConfig::new(-0.1, 0.0).validate(),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            NcLassoConfig::new(0.1, f64::NAN).validate(),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            NcLassoConfig::new(0.1, 0.1).with_tolerance(0.0).validate(),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            NcLassoConfig::new(0.1, 0.1).with_max_iterations(0).validate(),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            NcLassoConfig::from_toml_str("lambda1 = -1.0"),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            NcLassoConfig::from_toml_str("lambda1 = \"lots\""),
            Err(ModelError::TomlParseError(_))
        ));
    }

    #[test]
    fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nclasso.toml");
        let config = NcLassoConfig::new(0.01, 0.5)
            .with_tolerance(1e-8)
            .with_max_iterations(250)
            .with_warm_start(true);
        config.save(&path).unwrap();
        let loaded = NcLassoConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
