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

//! Single-pass anomaly detection over one sequence.
//!
//! The walk feeds every origin value to the predictor and compares its best
//! forecast with the observation that actually follows. When the forecast
//! misses by more than the tolerance, the following observation is flagged
//! and the cursor jumps past it, so a flagged value is never used as the
//! origin of the next forecast.

use crate::anomaly::{AccuracyAccumulator, Predictor};

const SEPARATOR: &str = "-------------------------------------";

/// What happened at one origin position of the walk
#[derive(Debug, Clone, PartialEq)]
pub enum PointOutcome {
    /// The predictor had nothing to offer for this value
    NoPrediction,
    /// A forecast exists but there is no later observation to check it against
    SequenceFinished,
    /// The next observation is within tolerance of the forecast
    Normal {
        predicted: f64,
        actual: f64,
        similarity: f64,
        /// The actual value was zero, so no relative deviation exists
        degenerate: bool,
    },
    /// The next observation deviates beyond the tolerance
    Anomaly {
        predicted: f64,
        actual: f64,
        similarity: f64,
        degenerate: bool,
    },
}

/// Outcome of the walk at one origin position
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    /// Index of the origin value in the scored sequence
    pub position: usize,
    pub outcome: PointOutcome,
}

/// Result of scoring one sequence
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Indices of flagged observations, strictly increasing
    pub anomaly_indices: Vec<usize>,
    /// Human-readable log of the walk, never empty
    pub trace: Vec<String>,
    /// Confidence sum divided by the full sequence length, in percent
    pub mean_accuracy: f64,
    /// Every origin position visited, in walk order
    pub points: Vec<ScoredPoint>,
}

/// Relative deviation of a forecast from the actual value.
///
/// Returns `None` when `actual` is zero (or subnormal) and the ratio is undefined.
pub fn relative_deviation(predicted: f64, actual: f64) -> Option<f64> {
    if actual.abs() < f64::MIN_POSITIVE {
        return None;
    }
    Some((predicted - actual).abs() / actual.abs())
}

/// Decide whether `actual` is anomalous given the forecast.
/// Returns `(anomalous, degenerate)`.
fn judge(predicted: f64, actual: f64, tolerance: f64) -> (bool, bool) {
    relative_deviation(predicted, actual).map_or_else(
        // Zero actual: only an exact zero forecast counts as a hit
        || (predicted.abs() >= f64::MIN_POSITIVE, true),
        |deviation| (deviation > tolerance, false),
    )
}

/// Walk `sequence` with `predictor` and flag observations whose forecast
/// deviates by more than `tolerance` (a fraction, 0.1 = 10%).
///
/// The predictor is not reset, so its rolling history carries over from
/// whatever it saw before. The mean accuracy of this sequence is recorded
/// into `accuracy` exactly once.
pub fn detect<P: Predictor + ?Sized>(
    predictor: &mut P,
    sequence: &[f64],
    tolerance: f64,
    accuracy: &mut AccuracyAccumulator,
) -> DetectionResult {
    profiling::scope!("detect");

    let mut points = Vec::new();
    let mut anomaly_indices = Vec::new();
    let mut confidence_sum = 0.0;
    let mut position = 0;

    while position < sequence.len() {
        let predictions = predictor.predict(sequence[position]);

        let Some(best) = predictions.first() else {
            points.push(ScoredPoint {
                position,
                outcome: PointOutcome::NoPrediction,
            });
            position += 1;
            continue;
        };

        let Some(&actual) = sequence.get(position + 1) else {
            points.push(ScoredPoint {
                position,
                outcome: PointOutcome::SequenceFinished,
            });
            break;
        };

        let (anomalous, degenerate) = judge(best.predicted, actual, tolerance);
        if degenerate {
            tracing::warn!(
                position,
                predicted = best.predicted,
                "actual value is zero, relative deviation undefined"
            );
        }

        // Confidence counts whether or not the point turns out anomalous
        confidence_sum += best.similarity;

        if anomalous {
            anomaly_indices.push(position + 1);
            points.push(ScoredPoint {
                position,
                outcome: PointOutcome::Anomaly {
                    predicted: best.predicted,
                    actual,
                    similarity: best.similarity,
                    degenerate,
                },
            });
            position += 2;
        } else {
            points.push(ScoredPoint {
                position,
                outcome: PointOutcome::Normal {
                    predicted: best.predicted,
                    actual,
                    similarity: best.similarity,
                    degenerate,
                },
            });
            position += 1;
        }
    }

    let mean_accuracy = if sequence.is_empty() {
        0.0
    } else {
        confidence_sum / sequence.len() as f64
    };
    accuracy.record(mean_accuracy);

    tracing::debug!(
        len = sequence.len(),
        anomalies = anomaly_indices.len(),
        mean_accuracy,
        "Scored sequence"
    );

    DetectionResult {
        trace: render_trace(sequence, &points, mean_accuracy),
        anomaly_indices,
        mean_accuracy,
        points,
    }
}

fn render_trace(sequence: &[f64], points: &[ScoredPoint], mean_accuracy: f64) -> Vec<String> {
    let values: Vec<String> = sequence.iter().map(ToString::to_string).collect();

    let mut trace = vec![
        "------------------------------".to_string(),
        String::new(),
        format!(
            "Testing the sequence for anomaly detection: {}.",
            values.join(", ")
        ),
        String::new(),
    ];

    let mut push = |line: String| {
        trace.push(String::new());
        trace.push(line);
        trace.push(String::new());
    };

    for point in points {
        match &point.outcome {
            PointOutcome::NoPrediction => push("No prediction from the model!!!".to_string()),
            PointOutcome::SequenceFinished => push(
                "The sequence is finished, so we are not going through further anomaly testing."
                    .to_string(),
            ),
            PointOutcome::Normal {
                similarity,
                degenerate,
                ..
            } => {
                if *degenerate {
                    push("Actual next value is 0 and the model predicted 0.".to_string());
                }
                push(format!(
                    "Anomaly not detected in the next value!! Model accuracy: {similarity}%."
                ));
            }
            PointOutcome::Anomaly {
                predicted,
                actual,
                similarity,
                degenerate,
            } => {
                if *degenerate {
                    push(
                        "Actual next value is 0, any non-zero prediction counts as an anomaly."
                            .to_string(),
                    );
                }
                push(format!(
                    "Next value is an anomaly. Model predicts: {predicted} with accuracy: {similarity}%. The actual value should be {actual}."
                ));
                push("Anomaly was detected, hence skipping to next value in sequence.".to_string());
            }
        }
    }

    trace.extend([
        SEPARATOR.to_string(),
        String::new(),
        format!("Model accuracy for this sequence: {mean_accuracy}%."),
        String::new(),
        SEPARATOR.to_string(),
    ]);
    trace
}
