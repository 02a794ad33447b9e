mod cli;
mod ui;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::TryStreamExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use compute_horde_sdk::config::DEFAULT_CONFIG_FILE;
use compute_horde_sdk::{ClientConfig, ComputeHordeClient, ComputeHordeJob, JobSpec};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());
    let config = ClientConfig::load_from(&config_path)?;
    if config.facilitator_token.is_empty() {
        bail!(
            "No facilitator token configured. Set facilitator_token in {} or {}.",
            config_path.display(),
            compute_horde_sdk::config::ENV_FACILITATOR_TOKEN
        );
    }
    let client = ComputeHordeClient::new(&config)?;

    match cli.command {
        Command::Run {
            file,
            image,
            executor_class,
            env,
            wait,
            timeout,
            args,
        } => {
            let mut spec = match file {
                Some(path) => load_job_spec(&path)?,
                None => JobSpec::default(),
            };
            if let Some(image) = image {
                spec.docker_image = image;
            }
            if let Some(class) = executor_class {
                spec.executor_class = class;
            }
            if !args.is_empty() {
                spec.args = args;
            }
            spec.env.extend(env);
            if spec.docker_image.is_empty() {
                bail!("A docker image is required, pass --image or set docker_image in the job file");
            }

            let mut job = client.create_job(&spec).await?;
            println!("Created job {}", job.uuid);
            if wait || timeout.is_some() {
                wait_for(&mut job, timeout).await?;
                ui::print_job(&job);
            }
        }
        Command::Get { uuid } => {
            let job = client.get_job(uuid).await?;
            ui::print_job(&job);
        }
        Command::List {
            page,
            page_size,
            all,
        } => {
            if all {
                let jobs: Vec<ComputeHordeJob> = client.iter_jobs(page_size).try_collect().await?;
                jobs.iter().for_each(ui::print_job_line);
            } else {
                let jobs = client.get_jobs(page, page_size).await?;
                jobs.results.iter().for_each(ui::print_job_line);
                println!("page {page}, {} jobs total", jobs.count);
            }
        }
        Command::Wait { uuid, timeout } => {
            let mut job = client.get_job(uuid).await?;
            wait_for(&mut job, timeout).await?;
            ui::print_job(&job);
        }
        Command::Feedback {
            uuid,
            correctness,
            expected_duration,
        } => {
            let job = client.get_job(uuid).await?;
            job.submit_feedback(correctness, expected_duration).await?;
            println!("Feedback submitted for job {uuid}");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "compute_horde_sdk=debug,compute_horde=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_job_spec(path: &Path) -> Result<JobSpec> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let spec = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?,
        _ => toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?,
    };
    Ok(spec)
}

async fn wait_for(job: &mut ComputeHordeJob, timeout_secs: Option<f64>) -> Result<()> {
    let timeout = timeout_secs
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid --timeout")?;
    let progress = ui::WaitProgress::start(job);
    let outcome = job.wait(timeout).await;
    progress.finish();
    outcome?;
    Ok(())
}
