pub mod experiment;
pub mod metrics;
pub mod output;
pub mod plot;
pub mod report;

pub use experiment::{Experiment, ExperimentOutcome};
pub use metrics::ExperimentMetrics;
pub use report::ExperimentReport;
