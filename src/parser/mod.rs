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

//! Reading sequence groups from a folder of JSON files.
//!
//! Each `*.json` file holds one group, either as
//! `{"name": "...", "sequences": [[1, 2, 3], ...]}` or as a bare
//! `[[1, 2, 3], ...]`. Files are read in file name order.

pub mod sequence;

use crate::error::{ExperimentError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use sequence::{iter_sequences, label_sequences, sequence_count, SequenceGroup};

/// On-disk layout of a sequence file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SequenceFile {
    Named {
        #[serde(default)]
        name: Option<String>,
        sequences: Vec<Vec<f64>>,
    },
    Bare(Vec<Vec<f64>>),
}

fn is_json_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Parse one sequence file, naming the group after the file stem unless
/// the file names it itself
pub fn read_sequence_file(path: &Path) -> Result<SequenceGroup> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ExperimentError::source_error(path, e))?;
    let parsed: SequenceFile =
        serde_json::from_str(&contents).map_err(|e| ExperimentError::source_error(path, e))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let group = match parsed {
        SequenceFile::Named { name, sequences } => {
            SequenceGroup::new(name.unwrap_or(stem), sequences)
        }
        SequenceFile::Bare(sequences) => SequenceGroup::new(stem, sequences),
    };

    tracing::debug!(
        "Read {} sequences from {} ({:?})",
        group.len(),
        group.name,
        path
    );
    Ok(group)
}

/// Read every JSON sequence file directly inside `folder`
pub fn read_sequence_folder(folder: &Path) -> Result<Vec<SequenceGroup>> {
    let entries =
        std::fs::read_dir(folder).map_err(|e| ExperimentError::source_error(folder, e))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ExperimentError::source_error(folder, e))?
            .path();
        if is_json_file(&path) {
            files.push(path);
        } else {
            tracing::debug!("Skipping non-JSON entry {path:?}");
        }
    }
    files.sort();

    let groups = files
        .iter()
        .map(PathBuf::as_path)
        .map(read_sequence_file)
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        "Loaded {} sequences in {} groups from {:?}",
        sequence_count(&groups),
        groups.len(),
        folder
    );
    Ok(groups)
}
