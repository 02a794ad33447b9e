//! Terminal output for the CLI: a spinner while waiting and coloured job summaries.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use compute_horde_sdk::{ComputeHordeJob, JobStatus};

/// Spinner shown while a job is being polled.
pub struct WaitProgress {
    pb: ProgressBar,
}

impl WaitProgress {
    pub fn start(job: &ComputeHordeJob) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Waiting for job {} ({})", job.uuid, job.status));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Failed | JobStatus::Rejected => Style::new().red().bold(),
        JobStatus::Sent | JobStatus::Accepted => Style::new().yellow(),
    }
}

/// One-line summary: uuid, coloured status, image.
pub fn print_job_line(job: &ComputeHordeJob) {
    let details = job.details();
    println!(
        "{}  {:<9}  {}  {}",
        job.uuid,
        status_style(job.status).apply_to(job.status),
        details.executor_class,
        details.docker_image
    );
}

/// Full job report including captured stdout.
pub fn print_job(job: &ComputeHordeJob) {
    let details = job.details();
    let dim = Style::new().dim();
    println!("{} {}", dim.apply_to("uuid:          "), job.uuid);
    println!(
        "{} {}",
        dim.apply_to("status:        "),
        status_style(job.status).apply_to(job.status)
    );
    println!("{} {}", dim.apply_to("executor class:"), details.executor_class);
    println!("{} {}", dim.apply_to("image:         "), details.docker_image);
    if !details.args.is_empty() {
        println!("{} {}", dim.apply_to("args:          "), details.args);
    }
    if let Some(created_at) = details.created_at {
        println!("{} {}", dim.apply_to("created at:    "), created_at.to_rfc3339());
    }
    if let Some(result) = &job.result {
        println!();
        println!("{}", Style::new().bold().apply_to("─── stdout ───"));
        print!("{}", result.stdout);
        if !result.stdout.ends_with('\n') {
            println!();
        }
    }
}
