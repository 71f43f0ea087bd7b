// SeqCrab - GPL-3.0-or-later
// This file is part of SeqCrab.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// SeqCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SeqCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with SeqCrab.  If not, see <https://www.gnu.org/licenses/>.

use crate::error::{ExperimentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default relative deviation tolerated before a value is flagged
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Settings for one anomaly experiment run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Maximum relative deviation (fraction) between forecast and actual value
    pub tolerance: f64,
    /// Folder with the JSON sequence files used for training
    pub training_folder: PathBuf,
    /// Folder with the JSON sequence files that get scored
    pub predicting_folder: PathBuf,
    /// Directory in which the timestamped output folder is created
    pub output_root: PathBuf,
    /// Fewest leading values trimmed from each evaluation sequence
    pub trim_min: usize,
    /// Most leading values trimmed from each evaluation sequence
    pub trim_max: usize,
    /// Seed for the trimming RNG; random when absent
    pub seed: Option<u64>,
    /// Score sequences on a thread pool, each against its own predictor copy
    pub parallel: bool,
    pub learner: LearnerConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            training_folder: PathBuf::from("training"),
            predicting_folder: PathBuf::from("predicting"),
            output_root: PathBuf::from("."),
            trim_min: 1,
            trim_max: 3,
            seed: None,
            parallel: false,
            learner: LearnerConfig::default(),
        }
    }
}

/// Tuning knobs of the bundled sequence learner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LearnerConfig {
    /// Number of recent observations kept as context
    pub history_len: usize,
    /// Upper bound on forecasts returned per observation
    pub max_predictions: usize,
    /// Two values closer than this are treated as equal
    pub match_epsilon: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            history_len: 4,
            max_predictions: 3,
            match_epsilon: 1e-6,
        }
    }
}

impl ExperimentConfig {
    /// Get the path to the user config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|config_dir| config_dir.join("seqcrab").join("config.json"))
    }

    /// Read a config file, filling missing fields with defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        tracing::info!("Loaded experiment config from {path:?}");
        Ok(config)
    }

    /// Load from `explicit` if given, else from the user config file if it
    /// exists, else return defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("No user config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save config to `path` as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Saved experiment config to {path:?}");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ExperimentError::InvalidConfig(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.trim_min > self.trim_max {
            return Err(ExperimentError::InvalidConfig(format!(
                "trim_min ({}) exceeds trim_max ({})",
                self.trim_min, self.trim_max
            )));
        }
        if self.learner.history_len == 0 {
            return Err(ExperimentError::InvalidConfig(
                "learner.history_len must be at least 1".to_string(),
            ));
        }
        if self.learner.max_predictions == 0 {
            return Err(ExperimentError::InvalidConfig(
                "learner.max_predictions must be at least 1".to_string(),
            ));
        }
        if !self.learner.match_epsilon.is_finite() || self.learner.match_epsilon < 0.0 {
            return Err(ExperimentError::InvalidConfig(format!(
                "learner.match_epsilon must be a non-negative number, got {}",
                self.learner.match_epsilon
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExperimentConfig::default();
        assert_eq!(config.tolerance, 0.1);
        assert_eq!(config.training_folder, PathBuf::from("training"));
        assert_eq!(config.predicting_folder, PathBuf::from("predicting"));
        assert_eq!((config.trim_min, config.trim_max), (1, 3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"tolerance": 0.25, "learner": {"history_len": 8}}"#).unwrap();

        let config = ExperimentConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.tolerance, 0.25);
        assert_eq!(config.learner.history_len, 8);
        assert_eq!(config.learner.max_predictions, 3);
        assert_eq!(config.trim_max, 3);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = ExperimentConfig {
            seed: Some(7),
            parallel: true,
            ..ExperimentConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(ExperimentConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let negative = ExperimentConfig {
            tolerance: -0.1,
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ExperimentError::InvalidConfig(_))
        ));

        let nan = ExperimentConfig {
            tolerance: f64::NAN,
            ..ExperimentConfig::default()
        };
        assert!(nan.validate().is_err());

        let inverted = ExperimentConfig {
            trim_min: 4,
            trim_max: 2,
            ..ExperimentConfig::default()
        };
        assert!(inverted.validate().is_err());

        let mut no_history = ExperimentConfig::default();
        no_history.learner.history_len = 0;
        assert!(no_history.validate().is_err());

        let mut no_predictions = ExperimentConfig::default();
        no_predictions.learner.max_predictions = 0;
        assert!(matches!(
            no_predictions.validate(),
            Err(ExperimentError::InvalidConfig(msg)) if msg.contains("max_predictions")
        ));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ExperimentConfig::from_file(&path),
            Err(ExperimentError::Json(_))
        ));
    }
}
