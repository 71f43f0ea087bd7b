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

//! Anomaly scoring against a next-value predictor.

pub mod scorer;

use crate::error::{ExperimentError, Result};

pub use scorer::{detect, DetectionResult, PointOutcome};

/// One ranked forecast for the value following the last observation
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Forecast for the next observation
    pub predicted: f64,
    /// Confidence in percent, higher = more confident
    pub similarity: f64,
    /// Label of the training sequence the forecast was taken from, if any
    pub source: Option<String>,
}

impl Prediction {
    pub const fn new(predicted: f64, similarity: f64) -> Self {
        Self {
            predicted,
            similarity,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Trait for stateful next-value forecasters
///
/// Every `predict` call both forecasts and advances the internal rolling
/// history, so calls are order-dependent.
pub trait Predictor: Send {
    /// Observe `value` and return ranked forecasts for the value after it.
    /// The first entry is the best one; an empty list means no forecast.
    fn predict(&mut self, value: f64) -> Vec<Prediction>;

    /// Forget the rolling history while keeping everything learned
    fn reset(&mut self);
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&mut self, value: f64) -> Vec<Prediction> {
        (**self).predict(value)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

/// Running sum of per-sequence mean accuracies over one experiment
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccuracyAccumulator {
    total_accuracy: f64,
    sequence_count: usize,
}

impl AccuracyAccumulator {
    pub const fn new() -> Self {
        Self {
            total_accuracy: 0.0,
            sequence_count: 0,
        }
    }

    /// Account for one completed scoring call
    pub fn record(&mut self, mean_accuracy: f64) {
        self.total_accuracy += mean_accuracy;
        self.sequence_count += 1;
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &Self) {
        self.total_accuracy += other.total_accuracy;
        self.sequence_count += other.sequence_count;
    }

    pub const fn total_accuracy(&self) -> f64 {
        self.total_accuracy
    }

    pub const fn sequence_count(&self) -> usize {
        self.sequence_count
    }

    /// Average of all recorded mean accuracies
    pub fn final_accuracy(&self) -> Result<f64> {
        if self.sequence_count == 0 {
            return Err(ExperimentError::EmptyExperiment);
        }
        Ok(self.total_accuracy / self.sequence_count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_average() {
        let mut acc = AccuracyAccumulator::new();
        acc.record(80.0);
        acc.record(60.0);
        acc.record(70.0);

        assert_eq!(acc.sequence_count(), 3);
        assert_eq!(acc.total_accuracy(), 210.0);
        assert_eq!(acc.final_accuracy().unwrap(), 70.0);
    }

    #[test]
    fn test_empty_accumulator_is_an_error() {
        let acc = AccuracyAccumulator::new();
        assert!(matches!(
            acc.final_accuracy(),
            Err(ExperimentError::EmptyExperiment)
        ));
    }

    #[test]
    fn test_merge_matches_sequential_recording() {
        let mut sequential = AccuracyAccumulator::new();
        let mut left = AccuracyAccumulator::new();
        let mut right = AccuracyAccumulator::new();

        for (i, value) in [12.5, 40.0, 90.0, 0.0].into_iter().enumerate() {
            sequential.record(value);
            if i % 2 == 0 {
                left.record(value);
            } else {
                right.record(value);
            }
        }

        left.merge(&right);
        assert_eq!(left, sequential);
    }

    #[test]
    fn test_prediction_source() {
        let p = Prediction::new(3.0, 75.0).with_source("S2");
        assert_eq!(p.source.as_deref(), Some("S2"));
        assert_eq!(Prediction::new(3.0, 75.0).source, None);
    }
}
