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

use crate::error::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Locations of the artifacts produced by one run, all sharing a timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub timestamp: String,
    pub folder: PathBuf,
    pub report: PathBuf,
    pub plot: PathBuf,
    pub metrics: PathBuf,
}

impl OutputPaths {
    pub fn new(root: &Path, started: DateTime<Local>) -> Self {
        let timestamp = started.format(TIMESTAMP_FORMAT).to_string();
        let folder = root.join(format!("anomaly_experiment_{timestamp}"));

        Self {
            report: folder.join(format!("anomaly_experiment_output_{timestamp}.txt")),
            plot: folder.join(format!("anomaly_plot_{timestamp}.html")),
            metrics: folder.join(format!("anomaly_experiment_metrics_{timestamp}.json")),
            folder,
            timestamp,
        }
    }

    /// Create the output folder if it does not exist yet
    pub fn create(&self) -> Result<()> {
        std::fs::create_dir_all(&self.folder)?;
        tracing::debug!("Output folder ready at {:?}", self.folder);
        Ok(())
    }
}
