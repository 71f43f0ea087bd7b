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

//! Multi-sequence learner used as the default predictor.
//!
//! The learner memorises labelled training sequences and keeps a short
//! rolling history of what it has been fed. To forecast, it looks up every
//! training position holding the current value and ranks the successors by
//! how much of the recent history lines up with the training values leading
//! to that position.

use crate::anomaly::{Prediction, Predictor};
use crate::config::LearnerConfig;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::{HashSet, VecDeque};

/// A successor found in the training data
#[derive(Debug, Clone, Copy)]
struct Candidate {
    /// Index of the training sequence in insertion order
    key: usize,
    /// Position of the matched value inside that sequence
    position: usize,
    predicted: f64,
    similarity: f64,
}

#[derive(Debug, Clone)]
pub struct SequenceLearner {
    sequences: IndexMap<String, Vec<f64>>,
    history: VecDeque<f64>,
    config: LearnerConfig,
}

impl SequenceLearner {
    /// Learn from labelled sequences. Empty sequences carry no transitions
    /// and are dropped.
    pub fn train(sequences: &IndexMap<String, Vec<f64>>, config: LearnerConfig) -> Self {
        profiling::scope!("SequenceLearner::train");

        let sequences: IndexMap<String, Vec<f64>> = sequences
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(key, values)| (key.clone(), values.clone()))
            .collect();

        tracing::info!(
            "Trained sequence learner on {} sequences ({} values)",
            sequences.len(),
            sequences.values().map(Vec::len).sum::<usize>()
        );

        Self {
            sequences,
            history: VecDeque::with_capacity(config.history_len.max(1)),
            config,
        }
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Observations currently kept as context, oldest first
    pub const fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    fn matches(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.config.match_epsilon
    }

    fn observe(&mut self, value: f64) {
        self.history.push_back(value);
        while self.history.len() > self.config.history_len.max(1) {
            self.history.pop_front();
        }
    }

    /// Percentage of the history matching the training values that end at
    /// `position`, walking backwards until the first mismatch
    fn similarity(&self, training: &[f64], position: usize) -> f64 {
        let matched = self
            .history
            .iter()
            .rev()
            .zip(training[..=position].iter().rev())
            .take_while(|(seen, learned)| self.matches(**seen, **learned))
            .count();
        matched as f64 / self.history.len() as f64 * 100.0
    }

    fn candidates(&self, value: f64) -> Vec<Candidate> {
        profiling::scope!("SequenceLearner::candidates");

        (0..self.sequences.len())
            .into_par_iter()
            .flat_map_iter(|key| {
                let training = self
                    .sequences
                    .get_index(key)
                    .map_or(&[][..], |(_, values)| values.as_slice());

                // The last value of a sequence has no successor to offer
                training
                    .windows(2)
                    .enumerate()
                    .filter(move |(_, pair)| self.matches(pair[0], value))
                    .map(move |(position, pair)| Candidate {
                        key,
                        position,
                        predicted: pair[1],
                        similarity: self.similarity(training, position),
                    })
            })
            .collect()
    }
}

impl Predictor for SequenceLearner {
    fn predict(&mut self, value: f64) -> Vec<Prediction> {
        self.observe(value);

        let mut candidates = self.candidates(value);
        candidates.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.key.cmp(&b.key))
                .then(a.position.cmp(&b.position))
        });

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|c| seen.insert((c.key, c.predicted.to_bits())))
            .take(self.config.max_predictions)
            .map(|c| {
                let prediction = Prediction::new(c.predicted, c.similarity);
                let Some((label, _)) = self.sequences.get_index(c.key) else {
                    return prediction;
                };
                prediction.with_source(label.as_str())
            })
            .collect()
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}
