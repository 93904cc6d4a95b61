//! Rendering many inputs with one shared configuration.

use crate::job::{JobConfig, JobId, JobSource, RenderJob};
use crate::pipeline::{ExportOutcome, ExportPipeline};
use parking_lot::Mutex;
use rayon::prelude::*;
use shadereel_core::{Result, ShadeReelError};
use shadereel_timeline::GenerationMode;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Inputs picked up from a directory by default.
pub const DEFAULT_BATCH_LIMIT: usize = 20;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// How a batch is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub parallel: bool,
    /// Worker threads when `parallel` is set.
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            workers: num_cpus::get(),
        }
    }
}

/// Files in `dir` with one of `extensions` (case-insensitive), sorted by
/// name, at most `limit` of them.
pub fn collect_inputs(dir: &Path, extensions: &[&str], limit: usize) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ShadeReelError::unreadable(format!("reading {}: {e}", dir.display())))?;
    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if matches && path.is_file() {
            inputs.push(path);
        }
    }
    inputs.sort();
    inputs.truncate(limit);
    Ok(inputs)
}

/// One job per input, all writing into `out_dir`.
///
/// Image and clip outputs are numbered `01_<stem>.mp4`, `02_<stem>.mp4`, ...
/// in input order. Loop-video outputs are named `<stem>_with_audio.mp4`. A
/// seeded randomized template gives item `i` the seed `seed + i`.
pub fn plan_batch(template: &JobConfig, inputs: &[PathBuf], out_dir: &Path) -> Vec<RenderJob> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("item{i}"));
            let numbered = out_dir.join(format!("{:02}_{stem}.mp4", i + 1));

            let mut config = template.clone();
            let (source, output) = match &template.source {
                JobSource::LoopVideo { .. } => (
                    JobSource::LoopVideo { path: input.clone() },
                    out_dir.join(format!("{stem}_with_audio.mp4")),
                ),
                JobSource::Clip { trim, strip_audio, .. } => (
                    JobSource::Clip {
                        path: input.clone(),
                        trim: *trim,
                        strip_audio: *strip_audio,
                    },
                    numbered,
                ),
                JobSource::Image { .. } | JobSource::Slideshow { .. } => {
                    (JobSource::Image { path: input.clone() }, numbered)
                }
            };
            config.source = source;
            config.output = output;
            if let GenerationMode::Randomized { seed: Some(seed), .. } = template.mode {
                config.mode = template.mode.with_seed(seed.wrapping_add(i as u64));
            }
            RenderJob::new(config)
        })
        .collect()
}

/// Result of one batch item.
#[derive(Debug)]
pub enum BatchItemStatus {
    Rendered(ExportOutcome),
    Failed(ShadeReelError),
    /// Never started because an earlier item failed fatally.
    Skipped,
}

#[derive(Debug)]
pub struct BatchItem {
    pub job: JobId,
    pub output: PathBuf,
    pub status: BatchItemStatus,
}

/// Per-item outcomes, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn rendered(&self) -> impl Iterator<Item = &ExportOutcome> {
        self.items.iter().filter_map(|item| match &item.status {
            BatchItemStatus::Rendered(outcome) => Some(outcome),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&BatchItem, &ShadeReelError)> {
        self.items.iter().filter_map(|item| match &item.status {
            BatchItemStatus::Failed(e) => Some((item, e)),
            _ => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.status, BatchItemStatus::Skipped))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.items
            .iter()
            .all(|item| matches!(item.status, BatchItemStatus::Rendered(_)))
    }

    /// The first error that stopped the batch, if any.
    pub fn fatal_error(&self) -> Option<&ShadeReelError> {
        self.failed().map(|(_, e)| e).find(|e| e.is_fatal_for_batch())
    }
}

/// Runs a list of jobs through one [`ExportPipeline`].
///
/// Unreadable inputs and bad per-item parameters are recorded and the batch
/// moves on. Encoder failures, a full disk or cancellation stop it; items
/// not yet started are reported as skipped.
pub struct BatchRunner {
    pipeline: ExportPipeline,
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(pipeline: ExportPipeline, options: BatchOptions) -> Self {
        Self { pipeline, options }
    }

    pub fn pipeline(&self) -> &ExportPipeline {
        &self.pipeline
    }

    pub fn run(&self, jobs: &[RenderJob]) -> Result<BatchReport> {
        check_unique_outputs(jobs)?;
        info!(
            "Batch of {} jobs ({})",
            jobs.len(),
            if self.options.parallel {
                format!("{} workers", self.options.workers.max(1))
            } else {
                "sequential".to_string()
            }
        );

        let statuses = if self.options.parallel && jobs.len() > 1 {
            self.run_parallel(jobs)?
        } else {
            self.run_sequential(jobs)
        };

        let items = jobs
            .iter()
            .zip(statuses)
            .map(|(job, status)| BatchItem {
                job: job.id,
                output: job.config.output.clone(),
                status,
            })
            .collect();
        let report = BatchReport { items };
        info!(
            "Batch done: {} rendered, {} failed, {} skipped",
            report.rendered().count(),
            report.failed().count(),
            report.skipped()
        );
        Ok(report)
    }

    fn run_sequential(&self, jobs: &[RenderJob]) -> Vec<BatchItemStatus> {
        let mut aborted = false;
        jobs.iter()
            .enumerate()
            .map(|(i, job)| {
                if aborted {
                    return BatchItemStatus::Skipped;
                }
                let status = self.run_one(i, jobs.len(), job);
                if let BatchItemStatus::Failed(e) = &status {
                    aborted = e.is_fatal_for_batch();
                }
                status
            })
            .collect()
    }

    fn run_parallel(&self, jobs: &[RenderJob]) -> Result<Vec<BatchItemStatus>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers.max(1))
            .build()
            .map_err(|e| ShadeReelError::ResourceExhausted(format!("worker pool: {e}")))?;

        let aborted = AtomicBool::new(false);
        let results: Mutex<Vec<Option<BatchItemStatus>>> = Mutex::new((0..jobs.len()).map(|_| None).collect());
        pool.install(|| {
            jobs.par_iter().enumerate().for_each(|(i, job)| {
                let status = if aborted.load(Ordering::SeqCst) {
                    BatchItemStatus::Skipped
                } else {
                    self.run_one(i, jobs.len(), job)
                };
                if let BatchItemStatus::Failed(e) = &status {
                    if e.is_fatal_for_batch() {
                        aborted.store(true, Ordering::SeqCst);
                    }
                }
                results.lock()[i] = Some(status);
            });
        });

        Ok(results
            .into_inner()
            .into_iter()
            .map(|s| s.unwrap_or(BatchItemStatus::Skipped))
            .collect())
    }

    fn run_one(&self, i: usize, total: usize, job: &RenderJob) -> BatchItemStatus {
        match self.pipeline.run(job) {
            Ok(outcome) => {
                info!("[{}/{total}] {}", i + 1, outcome.output.display());
                BatchItemStatus::Rendered(outcome)
            }
            Err(e) => {
                warn!("[{}/{total}] {} failed: {e}", i + 1, job.config.output.display());
                BatchItemStatus::Failed(e)
            }
        }
    }
}

fn check_unique_outputs(jobs: &[RenderJob]) -> Result<()> {
    let mut seen = HashSet::new();
    for job in jobs {
        if !seen.insert(job.config.output.as_path()) {
            return Err(ShadeReelError::invalid(format!(
                "two batch items write to {}",
                job.config.output.display()
            )));
        }
    }
    Ok(())
}
