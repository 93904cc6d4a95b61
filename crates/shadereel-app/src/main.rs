//! ShadeReel - Color-grade look timelines rendered to video
//!
//! Entry point: parses arguments, renders on a worker thread and reports
//! progress from the main thread.

mod cli;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Parser;
use cli::{load_template, Cli, Work};
use crossbeam_channel::Receiver;
use shadereel_media::ffmpeg_available;
use shadereel_render::{
    progress_channel, BatchItemStatus, BatchRunner, ExportPipeline, JobFile, JobId, RenderProgress,
};
use std::collections::HashMap;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // RUST_LOG overrides the default level
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let template = load_template(cli.config.as_deref())?;
    let work = cli.command.into_work(template)?;

    if let Some(path) = &cli.save_config {
        let file = JobFile::new(work.configs());
        file.save_to_file(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Saved {} job(s) to {}", file.jobs.len(), path.display());
        return Ok(());
    }

    let (tx, rx) = progress_channel();
    let pipeline = ExportPipeline::ffmpeg().with_progress(tx);
    let worker = thread::Builder::new()
        .name("shadereel-render".into())
        .spawn(move || execute(pipeline, work))
        .context("starting render thread")?;

    log_progress(rx);
    worker.join().map_err(|_| anyhow!("render thread panicked"))?
}

fn execute(pipeline: ExportPipeline, work: Work) -> Result<()> {
    if !matches!(work, Work::Preview(..)) && !ffmpeg_available() {
        bail!("ffmpeg not found; install it or put it on PATH");
    }

    match work {
        Work::Single(job) => {
            let outcome = pipeline
                .run(&job)
                .with_context(|| format!("rendering {}", job.config.output.display()))?;
            info!("Done: {}", outcome.output.display());
        }
        Work::Preview(job, dir) => {
            let written = pipeline.preview(&job, &dir)?;
            info!("Wrote {} previews to {}", written.len(), dir.display());
        }
        Work::Batch(jobs, options) => {
            let report = BatchRunner::new(pipeline, options).run(&jobs)?;
            for item in &report.items {
                match &item.status {
                    BatchItemStatus::Rendered(_) => {}
                    BatchItemStatus::Failed(e) => error!("{}: {e}", item.output.display()),
                    BatchItemStatus::Skipped => warn!("{}: skipped", item.output.display()),
                }
            }
            if !report.is_success() {
                bail!(
                    "{} of {} jobs did not render",
                    report.items.len() - report.rendered().count(),
                    report.items.len()
                );
            }
        }
    }
    Ok(())
}

/// Log each job's progress in 10% steps until the worker hangs up.
fn log_progress(rx: Receiver<RenderProgress>) {
    let mut deciles: HashMap<JobId, u64> = HashMap::new();
    for progress in rx {
        let decile = (progress.fraction() * 10.0).floor() as u64;
        if deciles.insert(progress.job, decile) != Some(decile) {
            info!(
                "Job {}: {:>3.0}% ({}/{} frames)",
                progress.job.short(),
                progress.fraction() * 100.0,
                progress.frames_emitted,
                progress.total_frames
            );
        }
    }
}
