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

//! `SeqCrab` - sequence anomaly experiments
//!
//! Trains a next-value predictor on labelled sequences, walks held-out
//! sequences and flags observations that deviate from the forecast by more
//! than a tolerance.

pub mod anomaly;
pub mod config;
pub mod core;
pub mod error;
pub mod learner;
pub mod parser;

pub use anomaly::{detect, AccuracyAccumulator, DetectionResult, Prediction, Predictor};
pub use config::{ExperimentConfig, LearnerConfig};
pub use error::ExperimentError;
