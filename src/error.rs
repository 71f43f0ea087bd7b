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

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort an experiment run.
///
/// Per-point outcomes (missing predictions, end of sequence, anomalies) are
/// data and never show up here.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// No evaluation sequence was scored, so the final accuracy is undefined
    #[error("no evaluation sequences were scored, final accuracy is undefined")]
    EmptyExperiment,

    /// The training source did not yield a single sequence
    #[error("training source {0:?} contains no sequences")]
    EmptyTrainingSet(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sequence folder or file could not be read or parsed
    #[error("failed to read sequence source {path:?}: {source}")]
    SequenceSource {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExperimentError {
    pub(crate) fn source_error<E>(path: impl Into<PathBuf>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SequenceSource {
            path: path.into(),
            source: Box::new(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExperimentError>;
