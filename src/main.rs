/// `SeqCrab` - sequence anomaly experiment runner
///
/// Copyright (C) 2025 Daniel Freiermuth
///
/// This program is free software: you can redistribute it and/or modify
/// it under the terms of the GNU General Public License as published by
/// the Free Software Foundation, either version 3 of the License, or
/// (at your option) any later version.
///
/// This program is distributed in the hope that it will be useful,
/// but WITHOUT ANY WARRANTY; without even the implied warranty of
/// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
/// GNU General Public License for more details.
///
/// You should have received a copy of the GNU General Public License
/// along with this program.  If not, see <https://www.gnu.org/licenses/>.
use anyhow::Context;
use clap::Parser;
use seqcrab::config::ExperimentConfig;
use seqcrab::core::Experiment;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "ram-profiling")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[derive(Parser, Debug)]
#[command(name = "seqcrab")]
#[command(author = "SeqCrab Team")]
#[command(version)]
#[command(about = "Run a sequence anomaly detection experiment", long_about = None)]
struct Args {
    /// Maximum relative deviation between forecast and actual value (0.1 = 10%)
    #[arg(short, long, value_name = "RATIO")]
    tolerance: Option<f64>,

    /// Folder with the training sequence files
    #[arg(long, value_name = "DIR")]
    training: Option<PathBuf>,

    /// Folder with the sequence files to score
    #[arg(long, value_name = "DIR")]
    predicting: Option<PathBuf>,

    /// Directory in which the timestamped output folder is created
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Seed for the random trimming of evaluation sequences
    #[arg(long)]
    seed: Option<u64>,

    /// Score sequences in parallel, each against its own predictor copy
    #[arg(long)]
    parallel: bool,

    /// Experiment config file (JSON); defaults to the user config if present
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "FILE")]
    save_config: Option<PathBuf>,

    /// Path for the DHAT heap profiling output (only used when built with --features ram-profiling)
    #[cfg(feature = "ram-profiling")]
    #[arg(
        long = "profile-output",
        value_name = "PROFILE_FILE",
        default_value = "dhat-heap.json"
    )]
    profile_output: PathBuf,
}

impl Args {
    /// Layer command line flags over the loaded config
    fn apply(&self, mut config: ExperimentConfig) -> ExperimentConfig {
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(ref training) = self.training {
            config.training_folder.clone_from(training);
        }
        if let Some(ref predicting) = self.predicting {
            config.predicting_folder.clone_from(predicting);
        }
        if let Some(ref output) = self.output {
            config.output_root.clone_from(output);
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.parallel |= self.parallel;
        config
    }
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG environment variable to override (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(
        "SeqCrab starting up (version {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let args = Args::parse();

    #[cfg(feature = "ram-profiling")]
    let _profiler = {
        tracing::info!("RAM profiling enabled, output: {:?}", args.profile_output);
        dhat::Profiler::builder()
            .file_name(args.profile_output.clone())
            .build()
    };

    #[cfg(feature = "cpu-profiling")]
    {
        tracing::info!("CPU profiling enabled with Tracy - run Tracy profiler to connect");
    }

    let config = ExperimentConfig::load(args.config.as_deref())
        .context("Failed to load experiment config")?;
    let config = args.apply(config);

    if let Some(ref path) = args.save_config {
        config
            .save(path)
            .with_context(|| format!("Failed to save config to {}", path.display()))?;
        return Ok(());
    }

    let experiment = Experiment::new(config).context("Invalid experiment configuration")?;
    let outcome = experiment.run().context("Anomaly experiment failed")?;

    let metrics = &outcome.metrics;
    println!("Final experiment accuracy: {}%", metrics.total_avg_accuracy);
    println!(
        "Sequences scored: {}, anomalies flagged: {}",
        metrics.sequence_count, metrics.anomaly_count
    );
    println!("Elapsed: {:.3}s", metrics.elapsed_secs);
    println!("Report: {}", metrics.report_path.display());
    println!("Plot: {}", metrics.plot_path.display());

    Ok(())
}
