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

//! Self-contained HTML plot of the evaluated sequences.
//!
//! Every sequence gets its own inline SVG line chart; flagged positions are
//! drawn as red markers on top of the line.

use crate::error::Result;
use std::path::Path;

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 220.0;
const MARGIN: f64 = 30.0;

/// One evaluated sequence with its flagged positions
#[derive(Debug, Clone, PartialEq)]
pub struct SequencePlot {
    pub label: String,
    pub values: Vec<f64>,
    /// Leading values dropped before scoring
    pub trimmed: usize,
    pub anomaly_indices: Vec<usize>,
}

/// Maps sequence positions and values into chart coordinates
struct Scale {
    x_step: f64,
    min: f64,
    span: f64,
}

impl Scale {
    fn new(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = if min.is_finite() && max > min {
            max - min
        } else {
            0.0
        };
        let intervals = values.len().saturating_sub(1).max(1) as f64;

        Self {
            x_step: 2.0f64.mul_add(-MARGIN, CHART_WIDTH) / intervals,
            min: if min.is_finite() { min } else { 0.0 },
            span,
        }
    }

    fn x(&self, index: usize) -> f64 {
        (index as f64).mul_add(self.x_step, MARGIN)
    }

    fn y(&self, value: f64) -> f64 {
        let inner = 2.0f64.mul_add(-MARGIN, CHART_HEIGHT);
        if self.span == 0.0 {
            // Flat series sit in the middle
            return CHART_HEIGHT / 2.0;
        }
        ((value - self.min) / self.span).mul_add(-inner, CHART_HEIGHT - MARGIN)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_chart(out: &mut String, plot: &SequencePlot) {
    let scale = Scale::new(&plot.values);

    out.push_str("<section>\n");
    out.push_str(&format!(
        "<h2>{} ({} values, {} leading trimmed, {} anomalies)</h2>\n",
        escape(&plot.label),
        plot.values.len(),
        plot.trimmed,
        plot.anomaly_indices.len()
    ));
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{CHART_WIDTH}" height="{CHART_HEIGHT}" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}">"#
    ));
    out.push('\n');

    let points: Vec<String> = plot
        .values
        .iter()
        .enumerate()
        .map(|(i, &v)| format!("{:.2},{:.2}", scale.x(i), scale.y(v)))
        .collect();
    out.push_str(&format!(
        r##"<polyline fill="none" stroke="#1f77b4" stroke-width="2" points="{}"/>"##,
        points.join(" ")
    ));
    out.push('\n');

    for &index in &plot.anomaly_indices {
        if let Some(&value) = plot.values.get(index) {
            out.push_str(&format!(
                r##"<circle class="anomaly" cx="{:.2}" cy="{:.2}" r="5" fill="#d62728"><title>index {index}: {value}</title></circle>"##,
                scale.x(index),
                scale.y(value)
            ));
            out.push('\n');
        }
    }

    out.push_str("</svg>\n</section>\n");
}

/// Render all sequences into one HTML document
pub fn render_html(plots: &[SequencePlot]) -> String {
    profiling::scope!("render_html");

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Anomaly detection experiment</title>\n");
    out.push_str("<style>body{font-family:sans-serif}section{margin-bottom:24px}</style>\n");
    out.push_str("</head>\n<body>\n<h1>Anomaly detection experiment</h1>\n");
    for plot in plots {
        render_chart(&mut out, plot);
    }
    out.push_str("</body>\n</html>\n");
    out
}

pub fn write_plot(path: &Path, plots: &[SequencePlot]) -> Result<()> {
    std::fs::write(path, render_html(plots))?;
    tracing::info!("Wrote anomaly plot with {} sequences to {path:?}", plots.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_chart_per_sequence() {
        let plots = vec![
            SequencePlot {
                label: "a[0]".to_string(),
                values: vec![1.0, 2.0, 9.0, 3.0],
                trimmed: 2,
                anomaly_indices: vec![2],
            },
            SequencePlot {
                label: "b<1>".to_string(),
                values: vec![5.0, 5.0],
                trimmed: 1,
                anomaly_indices: Vec::new(),
            },
        ];

        let html = render_html(&plots);

        assert_eq!(html.matches("<svg").count(), 2);
        assert_eq!(html.matches("class=\"anomaly\"").count(), 1);
        assert!(html.contains("b&lt;1&gt;"));
        assert!(html.contains("<h2>a[0] (4 values, 2 leading trimmed, 1 anomalies)</h2>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_out_of_range_anomaly_is_ignored() {
        let plot = SequencePlot {
            label: "short".to_string(),
            values: vec![1.0],
            trimmed: 0,
            anomaly_indices: vec![4],
        };
        let html = render_html(&[plot]);
        assert!(!html.contains("class=\"anomaly\""));
    }

    #[test]
    fn test_scale_bounds() {
        let scale = Scale::new(&[0.0, 10.0]);
        assert_eq!(scale.x(0), MARGIN);
        assert_eq!(scale.x(1), CHART_WIDTH - MARGIN);
        assert_eq!(scale.y(0.0), CHART_HEIGHT - MARGIN);
        assert_eq!(scale.y(10.0), MARGIN);

        let flat = Scale::new(&[]);
        assert_eq!(flat.y(3.0), CHART_HEIGHT / 2.0);
    }
}
