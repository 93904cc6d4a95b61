//! Progress reporting and cancellation.

use crate::job::JobId;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress of one render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProgress {
    pub job: JobId,
    /// Frames handed to the sink so far.
    pub frames_emitted: u64,
    /// Frames the job will emit in total.
    pub total_frames: u64,
}

impl RenderProgress {
    /// Completion fraction (0.0 to 1.0).
    pub fn fraction(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        (self.frames_emitted as f64 / self.total_frames as f64).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.frames_emitted >= self.total_frames
    }
}

/// Unbounded channel for progress events.
pub fn progress_channel() -> (Sender<RenderProgress>, Receiver<RenderProgress>) {
    crossbeam_channel::unbounded()
}

/// Throttled, monotonic progress publisher for one job.
pub struct ProgressReporter {
    job: JobId,
    total: u64,
    every: u64,
    last: Option<u64>,
    sink: Box<dyn FnMut(RenderProgress) + Send>,
}

impl ProgressReporter {
    /// Report roughly a hundred times per job, plus the final frame.
    pub fn new(job: JobId, total: u64, sink: impl FnMut(RenderProgress) + Send + 'static) -> Self {
        Self {
            job,
            total,
            every: (total / 100).max(1),
            last: None,
            sink: Box::new(sink),
        }
    }

    /// Publish to a channel. A disconnected receiver is ignored.
    pub fn to_channel(job: JobId, total: u64, tx: Sender<RenderProgress>) -> Self {
        Self::new(job, total, move |p| {
            let _ = tx.send(p);
        })
    }

    /// Record that `emitted` frames are done. Never goes backwards.
    pub fn report(&mut self, emitted: u64) {
        if self.last.is_some_and(|last| emitted <= last) {
            return;
        }
        let due = match self.last {
            None => true,
            Some(last) => emitted - last >= self.every,
        };
        if due || emitted >= self.total {
            self.last = Some(emitted);
            (self.sink)(RenderProgress {
                job: self.job,
                frames_emitted: emitted,
                total_frames: self.total,
            });
        }
    }
}

/// Handle for cancelling an in-progress render.
#[derive(Debug, Clone)]
pub struct RenderCancel(Arc<AtomicBool>);

impl RenderCancel {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for RenderCancel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        let progress = RenderProgress {
            job: JobId::new(),
            frames_emitted: 360,
            total_frames: 1440,
        };
        assert!((progress.fraction() - 0.25).abs() < 1e-12);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_reporter_is_monotonic_and_throttled() {
        let (tx, rx) = progress_channel();
        let mut reporter = ProgressReporter::to_channel(JobId::new(), 1000, tx);
        for i in 1..=1000 {
            reporter.report(i);
        }
        reporter.report(500);
        drop(reporter);

        let events: Vec<_> = rx.iter().collect();
        assert!(events.len() <= 101);
        assert!(events.windows(2).all(|w| w[0].frames_emitted < w[1].frames_emitted));
        assert_eq!(events.last().unwrap().frames_emitted, 1000);
        assert!(events.last().unwrap().is_complete());
    }

    #[test]
    fn test_cancel_handle() {
        let cancel = RenderCancel::new();
        let shared = cancel.clone();
        assert!(!shared.is_cancelled());
        cancel.cancel();
        assert!(shared.is_cancelled());
    }
}
