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

//! Experiment orchestration.
//!
//! A run labels the training sequences, trains a predictor, clears its
//! rolling history and then scores every trimmed evaluation sequence. The
//! accuracy accumulator belongs to the run: in sequential mode it is handed
//! to each scoring call, in parallel mode every sequence scores into its own
//! accumulator and the results are merged in evaluation order.

use crate::anomaly::{detect, AccuracyAccumulator, DetectionResult, Predictor};
use crate::config::ExperimentConfig;
use crate::core::metrics::{self, ExperimentMetrics};
use crate::core::output::OutputPaths;
use crate::core::plot::{write_plot, SequencePlot};
use crate::core::report::ExperimentReport;
use crate::error::{ExperimentError, Result};
use crate::learner::SequenceLearner;
use crate::parser::{label_sequences, read_sequence_folder, SequenceGroup};
use chrono::Local;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// An evaluation sequence after its leading values were dropped
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedSequence {
    pub label: String,
    pub values: Vec<f64>,
    /// Number of leading values removed
    pub trimmed: usize,
}

/// Everything the scoring phase produced
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    pub report: ExperimentReport,
    pub plots: Vec<SequencePlot>,
    pub accuracy: AccuracyAccumulator,
    pub final_accuracy: f64,
}

impl EvaluationRun {
    pub fn anomaly_count(&self) -> usize {
        self.plots.iter().map(|p| p.anomaly_indices.len()).sum()
    }
}

/// Result of a complete run whose artifacts were written
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub run: EvaluationRun,
    pub paths: OutputPaths,
    pub metrics: Arc<ExperimentMetrics>,
}

/// Drop `k` leading values, with `k` drawn uniformly from `min..=max`.
/// Sequences shorter than `k` become empty.
pub fn trim_sequence<R: Rng + ?Sized>(
    sequence: &[f64],
    rng: &mut R,
    min: usize,
    max: usize,
) -> (Vec<f64>, usize) {
    let count = rng.gen_range(min..=max);
    (sequence.iter().skip(count).copied().collect(), count)
}

/// Trim every sequence of every group, in source order
pub fn prepare_evaluation<R: Rng + ?Sized>(
    groups: &[SequenceGroup],
    rng: &mut R,
    min: usize,
    max: usize,
) -> Vec<TrimmedSequence> {
    groups
        .iter()
        .flat_map(|group| {
            group
                .sequences
                .iter()
                .enumerate()
                .map(move |(i, sequence)| (format!("{}[{i}]", group.name), sequence))
        })
        .map(|(label, sequence)| {
            let (values, trimmed) = trim_sequence(sequence, &mut *rng, min, max);
            TrimmedSequence {
                label,
                values,
                trimmed,
            }
        })
        .collect()
}

fn assemble(
    sequences: &[TrimmedSequence],
    results: Vec<DetectionResult>,
    accuracy: AccuracyAccumulator,
) -> Result<EvaluationRun> {
    let final_accuracy = accuracy.final_accuracy()?;

    let mut report = ExperimentReport::new();
    let mut plots = Vec::with_capacity(results.len());
    for (sequence, result) in sequences.iter().zip(results) {
        report.push_trace(&result.trace);
        plots.push(SequencePlot {
            label: sequence.label.clone(),
            values: sequence.values.clone(),
            trimmed: sequence.trimmed,
            anomaly_indices: result.anomaly_indices,
        });
    }
    report.close(final_accuracy);

    Ok(EvaluationRun {
        report,
        plots,
        accuracy,
        final_accuracy,
    })
}

/// Score `sequences` one after another against a single shared predictor
pub fn evaluate<P: Predictor + ?Sized>(
    predictor: &mut P,
    sequences: &[TrimmedSequence],
    tolerance: f64,
) -> Result<EvaluationRun> {
    profiling::scope!("evaluate");

    let mut accuracy = AccuracyAccumulator::new();
    let results: Vec<DetectionResult> = sequences
        .iter()
        .map(|sequence| {
            let result = detect(&mut *predictor, &sequence.values, tolerance, &mut accuracy);
            tracing::debug!(
                "{}: {} anomalies, accuracy {:.2}%",
                sequence.label,
                result.anomaly_indices.len(),
                result.mean_accuracy
            );
            result
        })
        .collect();

    assemble(sequences, results, accuracy)
}

/// Score `sequences` on the rayon pool. Each sequence runs against its own
/// clone of `predictor`, so no history carries over between sequences.
pub fn evaluate_parallel<P>(
    predictor: &P,
    sequences: &[TrimmedSequence],
    tolerance: f64,
) -> Result<EvaluationRun>
where
    P: Predictor + Clone + Sync,
{
    profiling::scope!("evaluate_parallel");

    let scored: Vec<(DetectionResult, AccuracyAccumulator)> = sequences
        .par_iter()
        .map(|sequence| {
            let mut local = predictor.clone();
            let mut accuracy = AccuracyAccumulator::new();
            let result = detect(&mut local, &sequence.values, tolerance, &mut accuracy);
            (result, accuracy)
        })
        .collect();

    let mut accuracy = AccuracyAccumulator::new();
    let results = scored
        .into_iter()
        .map(|(result, local)| {
            accuracy.merge(&local);
            result
        })
        .collect();

    assemble(sequences, results, accuracy)
}

/// Runs anomaly experiments according to an [`ExperimentConfig`]
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Load both sequence folders and run the experiment with the bundled
    /// sequence learner
    pub fn run(&self) -> Result<ExperimentOutcome> {
        let started = Instant::now();
        tracing::info!(
            "Starting anomaly experiment (tolerance {}, training {:?}, predicting {:?})",
            self.config.tolerance,
            self.config.training_folder,
            self.config.predicting_folder
        );

        let training = read_sequence_folder(&self.config.training_folder)?;
        let evaluation = read_sequence_folder(&self.config.predicting_folder)?;

        let learner_config = self.config.learner;
        self.execute(
            &training,
            &evaluation,
            |labelled| SequenceLearner::train(labelled, learner_config),
            started,
        )
    }

    /// Run on already loaded groups with the bundled sequence learner
    pub fn run_with_groups(
        &self,
        training: &[SequenceGroup],
        evaluation: &[SequenceGroup],
    ) -> Result<ExperimentOutcome> {
        let learner_config = self.config.learner;
        self.execute(
            training,
            evaluation,
            |labelled| SequenceLearner::train(labelled, learner_config),
            Instant::now(),
        )
    }

    /// Run on already loaded groups with a custom predictor built by `train`
    pub fn run_with_trainer<P, F>(
        &self,
        training: &[SequenceGroup],
        evaluation: &[SequenceGroup],
        train: F,
    ) -> Result<ExperimentOutcome>
    where
        P: Predictor + Clone + Sync,
        F: FnOnce(&IndexMap<String, Vec<f64>>) -> P,
    {
        self.execute(training, evaluation, train, Instant::now())
    }

    fn rng(&self) -> StdRng {
        self.config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
    }

    fn execute<P, F>(
        &self,
        training: &[SequenceGroup],
        evaluation: &[SequenceGroup],
        train: F,
        started: Instant,
    ) -> Result<ExperimentOutcome>
    where
        P: Predictor + Clone + Sync,
        F: FnOnce(&IndexMap<String, Vec<f64>>) -> P,
    {
        let labelled = label_sequences(training);
        if labelled.is_empty() {
            return Err(ExperimentError::EmptyTrainingSet(
                self.config.training_folder.clone(),
            ));
        }

        let train_start = Instant::now();
        let mut predictor = train(&labelled);
        predictor.reset();
        tracing::info!(
            "Trained predictor on {} sequences in {:?}",
            labelled.len(),
            train_start.elapsed()
        );

        let mut rng = self.rng();
        let sequences = prepare_evaluation(
            evaluation,
            &mut rng,
            self.config.trim_min,
            self.config.trim_max,
        );

        let score_start = Instant::now();
        let run = if self.config.parallel {
            evaluate_parallel(&predictor, &sequences, self.config.tolerance)?
        } else {
            evaluate(&mut predictor, &sequences, self.config.tolerance)?
        };
        tracing::info!(
            "Scored {} sequences in {:?}, {} anomalies, final accuracy {:.2}%",
            sequences.len(),
            score_start.elapsed(),
            run.anomaly_count(),
            run.final_accuracy
        );

        let paths = OutputPaths::new(&self.config.output_root, Local::now());
        paths.create()?;
        write_plot(&paths.plot, &run.plots)?;
        run.report.write_to(&paths.report)?;

        let metrics = metrics::publish(ExperimentMetrics {
            training_folder: self.config.training_folder.clone(),
            predicting_folder: self.config.predicting_folder.clone(),
            report_path: paths.report.clone(),
            plot_path: paths.plot.clone(),
            elapsed_secs: started.elapsed().as_secs_f64(),
            total_avg_accuracy: run.final_accuracy,
            sequence_count: run.accuracy.sequence_count(),
            anomaly_count: run.anomaly_count(),
        });
        metrics.write_to(&paths.metrics)?;

        tracing::info!(
            "Experiment finished in {:.3}s, artifacts in {:?}",
            metrics.elapsed_secs,
            paths.folder
        );

        Ok(ExperimentOutcome {
            run,
            paths,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::Prediction;

    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always expects the next value to be one larger
    #[derive(Clone, Default)]
    struct StepPredictor;

    impl Predictor for StepPredictor {
        fn predict(&mut self, value: f64) -> Vec<Prediction> {
            vec![Prediction::new(value + 1.0, 80.0)]
        }

        fn reset(&mut self) {}
    }

    /// Steps by one, but continues from the last value it saw until reset,
    /// so a history left over from training skews the first forecast
    #[derive(Clone)]
    struct HistoryPredictor {
        last: Option<f64>,
        resets: Arc<AtomicUsize>,
    }

    impl Predictor for HistoryPredictor {
        fn predict(&mut self, value: f64) -> Vec<Prediction> {
            let base = self.last.map_or(value, |last| last.max(value));
            self.last = Some(value);
            vec![Prediction::new(base + 1.0, 80.0)]
        }

        fn reset(&mut self) {
            self.last = None;
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn trimmed(label: &str, values: &[f64]) -> TrimmedSequence {
        TrimmedSequence {
            label: label.to_string(),
            values: values.to_vec(),
            trimmed: 0,
        }
    }

    fn config_in(dir: &std::path::Path) -> ExperimentConfig {
        ExperimentConfig {
            output_root: dir.to_path_buf(),
            seed: Some(17),
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn test_trim_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let sequence: Vec<f64> = (0..10).map(f64::from).collect();

        for _ in 0..100 {
            let (values, count) = trim_sequence(&sequence, &mut rng, 1, 3);
            assert!((1..=3).contains(&count));
            assert_eq!(values.len(), 10 - count);
            assert_eq!(values[0], count as f64);
        }
    }

    #[test]
    fn test_trim_short_sequence_to_empty() {
        let mut rng = StdRng::seed_from_u64(3);
        let (values, count) = trim_sequence(&[1.0, 2.0], &mut rng, 3, 3);
        assert!(values.is_empty());
        assert_eq!(count, 3);
    }

    #[test]
    fn test_seeded_trimming_is_reproducible() {
        let groups = vec![SequenceGroup::new(
            "g",
            vec![vec![1.0, 2.0, 3.0, 4.0, 5.0]; 8],
        )];

        let first = prepare_evaluation(&groups, &mut StdRng::seed_from_u64(9), 1, 3);
        let second = prepare_evaluation(&groups, &mut StdRng::seed_from_u64(9), 1, 3);

        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
        assert_eq!(first[0].label, "g[0]");
        assert_eq!(first[7].label, "g[7]");
    }

    #[test]
    fn test_evaluate_aggregates_in_order() {
        let sequences = vec![
            trimmed("a", &[1.0, 2.0, 3.0, 10.0]),
            trimmed("b", &[5.0, 6.0]),
        ];

        let run = evaluate(&mut StepPredictor::default(), &sequences, 0.1).unwrap();

        assert_eq!(run.plots[0].anomaly_indices, vec![3]);
        assert!(run.plots[1].anomaly_indices.is_empty());
        assert_eq!(run.accuracy.sequence_count(), 2);
        // a: 3 * 80 / 4 = 60, b: 80 / 2 = 40
        assert_eq!(run.final_accuracy, 50.0);
        assert_eq!(run.anomaly_count(), 1);

        let lines = run.report.lines();
        let first_a = lines
            .iter()
            .position(|l| l.contains("1, 2, 3, 10"))
            .unwrap();
        let first_b = lines.iter().position(|l| l.contains("5, 6.")).unwrap();
        assert!(first_a < first_b);
        assert_eq!(
            lines[lines.len() - 3],
            "Final experiment accuracy: 50%."
        );
    }

    #[test]
    fn test_evaluate_empty_is_an_error() {
        assert!(matches!(
            evaluate(&mut StepPredictor::default(), &[], 0.1),
            Err(ExperimentError::EmptyExperiment)
        ));
        assert!(matches!(
            evaluate_parallel(&StepPredictor::default(), &[], 0.1),
            Err(ExperimentError::EmptyExperiment)
        ));
    }

    #[test]
    fn test_parallel_matches_sequential_for_stateless_predictor() {
        let sequences: Vec<TrimmedSequence> = (0..20)
            .map(|i| {
                let values: Vec<f64> = (0..12)
                    .map(|j| if j == i % 12 { 100.0 } else { f64::from(j) })
                    .collect();
                trimmed(&format!("s{i}"), &values)
            })
            .collect();

        let sequential = evaluate(&mut StepPredictor::default(), &sequences, 0.1).unwrap();
        let parallel = evaluate_parallel(&StepPredictor::default(), &sequences, 0.1).unwrap();

        assert_eq!(sequential.plots, parallel.plots);
        assert_eq!(sequential.report, parallel.report);
        assert_eq!(
            sequential.accuracy.sequence_count(),
            parallel.accuracy.sequence_count()
        );
        assert!((sequential.final_accuracy - parallel.final_accuracy).abs() < 1e-9);
    }

    #[test]
    fn test_run_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let experiment = Experiment::new(config_in(dir.path())).unwrap();

        let training = vec![SequenceGroup::new(
            "train",
            vec![(1..=10).map(f64::from).collect()],
        )];
        let evaluation = vec![SequenceGroup::new(
            "eval",
            vec![(1..=10).map(f64::from).collect(), vec![1.0, 2.0, 3.0, 4.0, 9.0, 6.0]],
        )];

        let outcome = experiment.run_with_groups(&training, &evaluation).unwrap();

        assert!(outcome.paths.report.is_file());
        assert!(outcome.paths.plot.is_file());
        assert!(outcome.paths.metrics.is_file());
        assert_eq!(outcome.metrics.sequence_count, 2);
        assert_eq!(outcome.run.plots.len(), 2);
        // The learner replays the training data exactly
        assert!(outcome.run.plots[0].anomaly_indices.is_empty());

        let report = std::fs::read_to_string(&outcome.paths.report).unwrap();
        assert!(report.contains("Hello! Beginning our anomaly detection experiment."));
        assert!(report.contains(&format!(
            "Final experiment accuracy: {}%.",
            outcome.run.final_accuracy
        )));
        assert!(metrics::last_run().is_some());
    }

    #[test]
    fn test_run_with_custom_trainer() {
        let dir = tempfile::tempdir().unwrap();
        let experiment = Experiment::new(config_in(dir.path())).unwrap();
        let training = vec![SequenceGroup::new("t", vec![vec![1.0, 2.0]])];
        let evaluation = vec![SequenceGroup::new("e", vec![vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]])];

        let mut trained_on = Vec::new();
        let outcome = experiment
            .run_with_trainer(&training, &evaluation, |labelled| {
                trained_on = labelled.keys().cloned().collect();
                StepPredictor
            })
            .unwrap();

        assert_eq!(trained_on, vec!["S1".to_string()]);
        assert!(outcome.run.plots[0].anomaly_indices.is_empty());
        assert!(outcome.run.final_accuracy > 0.0);
    }

    #[test]
    fn test_training_history_is_cleared_before_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let experiment = Experiment::new(config_in(dir.path())).unwrap();
        let training = vec![SequenceGroup::new("t", vec![vec![1.0, 2.0]])];
        let evaluation = vec![SequenceGroup::new("e", vec![vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]])];
        let resets = Arc::new(AtomicUsize::new(0));

        // Without the reset the first forecast would be 51 instead of the
        // trimmed sequence's next value
        let trained = HistoryPredictor {
            last: Some(50.0),
            resets: Arc::clone(&resets),
        };
        let outcome = experiment
            .run_with_trainer(&training, &evaluation, |_| trained)
            .unwrap();

        assert_eq!(resets.load(Ordering::SeqCst), 1);
        let scored = &outcome.run.plots[0];
        assert!(scored.anomaly_indices.is_empty());
        assert!((1..=3).contains(&scored.trimmed));
        let n = scored.values.len() as f64;
        assert_eq!(outcome.run.final_accuracy, 80.0 * (n - 1.0) / n);
    }

    #[test]
    fn test_leftover_history_skews_scoring() {
        let mut stale = HistoryPredictor {
            last: Some(50.0),
            resets: Arc::new(AtomicUsize::new(0)),
        };
        let sequences = vec![trimmed("a", &[1.0, 2.0, 3.0, 4.0])];

        let run = evaluate(&mut stale, &sequences, 0.1).unwrap();
        assert_eq!(run.plots[0].anomaly_indices, vec![1]);

        stale.reset();
        let run = evaluate(&mut stale, &sequences, 0.1).unwrap();
        assert!(run.plots[0].anomaly_indices.is_empty());
    }

    #[test]
    fn test_empty_evaluation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let experiment = Experiment::new(config_in(dir.path())).unwrap();
        let training = vec![SequenceGroup::new("t", vec![vec![1.0, 2.0]])];

        let result = experiment.run_with_groups(&training, &[]);

        assert!(matches!(result, Err(ExperimentError::EmptyExperiment)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_training_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let experiment = Experiment::new(config_in(dir.path())).unwrap();
        let evaluation = vec![SequenceGroup::new("e", vec![vec![1.0, 2.0]])];

        assert!(matches!(
            experiment.run_with_groups(&[], &evaluation),
            Err(ExperimentError::EmptyTrainingSet(_))
        ));
    }

    #[test]
    fn test_run_reads_folders() {
        let dir = tempfile::tempdir().unwrap();
        let training = dir.path().join("training");
        let predicting = dir.path().join("predicting");
        std::fs::create_dir(&training).unwrap();
        std::fs::create_dir(&predicting).unwrap();
        std::fs::write(
            training.join("ramp.json"),
            r#"{"sequences": [[1, 2, 3, 4, 5, 6, 7, 8]]}"#,
        )
        .unwrap();
        std::fs::write(predicting.join("ramp.json"), "[[1, 2, 3, 4, 5, 6, 7, 8]]").unwrap();

        let config = ExperimentConfig {
            training_folder: training,
            predicting_folder: predicting,
            parallel: true,
            ..config_in(&dir.path().join("out"))
        };
        let outcome = Experiment::new(config).unwrap().run().unwrap();

        assert_eq!(outcome.metrics.sequence_count, 1);
        assert_eq!(outcome.metrics.anomaly_count, 0);
        assert!(outcome.paths.folder.starts_with(dir.path().join("out")));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ExperimentConfig {
            tolerance: -1.0,
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            Experiment::new(config),
            Err(ExperimentError::InvalidConfig(_))
        ));
    }
}
