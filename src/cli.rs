//! Command line interface for the `compute-horde` binary.
//!
//! Subcommands map one-to-one onto [`ComputeHordeClient`](compute_horde_sdk::ComputeHordeClient)
//! operations; global flags select the config file and log verbosity.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use compute_horde_sdk::ExecutorClass;
use uuid::Uuid;

/// Submit and monitor jobs on the Compute Horde.
#[derive(Debug, Parser)]
#[command(name = "compute-horde", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a job, optionally waiting for it to finish.
    Run {
        /// TOML or JSON file with a job definition. Flags override its fields.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Docker image, e.g. `user/image:tag`.
        #[arg(long)]
        image: Option<String>,

        #[arg(long, value_parser = parse_executor_class)]
        executor_class: Option<ExecutorClass>,

        /// Environment variable for the job, `KEY=VALUE`. Repeatable.
        #[arg(long = "env", value_parser = parse_key_value)]
        env: Vec<(String, String)>,

        /// Wait for the job to complete and print its output.
        #[arg(long, default_value_t = false)]
        wait: bool,

        /// Seconds to wait before giving up. Implies `--wait`.
        #[arg(long)]
        timeout: Option<f64>,

        /// Arguments passed to the job's container.
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Show a single job.
    Get { uuid: Uuid },

    /// List your jobs.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        page_size: u32,

        /// Walk every page instead of printing one.
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Wait for an existing job to finish.
    Wait {
        uuid: Uuid,

        /// Seconds to wait before giving up.
        #[arg(long)]
        timeout: Option<f64>,
    },

    /// Report how correct a job's result was.
    Feedback {
        uuid: Uuid,

        /// Between 0.0 (completely incorrect) and 1.0 (completely correct).
        #[arg(value_parser = parse_correctness)]
        correctness: f64,

        /// Seconds the job was expected to take.
        #[arg(long)]
        expected_duration: Option<f64>,
    },
}

fn parse_executor_class(s: &str) -> Result<ExecutorClass, String> {
    if s.is_empty() {
        return Err("executor class must not be empty".to_string());
    }
    Ok(ExecutorClass::from(s.to_string()))
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))
}

fn parse_correctness(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("correctness must be between 0.0 and 1.0, got {value}"))
    }
}
