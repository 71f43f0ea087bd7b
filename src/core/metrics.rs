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

//! Run metrics and the process-wide snapshot of the latest run.
//!
//! The snapshot is only replaced once a run has finished, so readers never
//! observe a half-written set of values.

use crate::error::Result;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

static LAST_RUN: ArcSwapOption<ExperimentMetrics> = ArcSwapOption::const_empty();

/// Summary of one finished experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetrics {
    pub training_folder: PathBuf,
    pub predicting_folder: PathBuf,
    pub report_path: PathBuf,
    pub plot_path: PathBuf,
    /// Wall-clock time of the whole run, training included
    pub elapsed_secs: f64,
    /// Mean of the per-sequence accuracies, in percent
    pub total_avg_accuracy: f64,
    pub sequence_count: usize,
    pub anomaly_count: usize,
}

impl ExperimentMetrics {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Make `metrics` the latest run visible through [`last_run`]
pub fn publish(metrics: ExperimentMetrics) -> Arc<ExperimentMetrics> {
    let metrics = Arc::new(metrics);
    LAST_RUN.store(Some(Arc::clone(&metrics)));
    metrics
}

/// Metrics of the most recently finished run in this process
pub fn last_run() -> Option<Arc<ExperimentMetrics>> {
    LAST_RUN.load_full()
}
