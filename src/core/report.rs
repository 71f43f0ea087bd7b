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

//! Plain-text experiment report.

use crate::error::Result;
use std::path::Path;

const STARS: &str = "*********************************";

/// Ordered report lines: welcome banner, per-sequence traces, closing banner
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    lines: Vec<String>,
}

impl ExperimentReport {
    /// Start a report with the welcome banner
    pub fn new() -> Self {
        Self {
            lines: banner("Hello! Beginning our anomaly detection experiment."),
        }
    }

    /// Append one sequence trace
    pub fn push_trace(&mut self, trace: &[String]) {
        self.lines.extend_from_slice(trace);
    }

    /// Append the closing banner stating the final accuracy
    pub fn close(&mut self, final_accuracy: f64) {
        self.lines.extend(banner(&format!(
            "Final experiment accuracy: {final_accuracy}%."
        )));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// One line per entry, each terminated by a newline
    pub fn render(&self) -> String {
        let mut text = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        tracing::info!("Wrote experiment report to {path:?}");
        Ok(())
    }
}

impl Default for ExperimentReport {
    fn default() -> Self {
        Self::new()
    }
}

fn banner(message: &str) -> Vec<String> {
    vec![
        String::new(),
        STARS.to_string(),
        String::new(),
        message.to_string(),
        String::new(),
        STARS.to_string(),
    ]
}
