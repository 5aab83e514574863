//! Progress reporting for full-stream scans.
//!
//! Counting frames, building a [`FrameTable`](crate::FrameTable) and finding
//! the last frame without a table all walk the whole stream one frame at a
//! time. A [`ProgressCallback`] attached through
//! [`StepperOptions`](crate::StepperOptions) observes those walks.
//!
//! Callbacks run synchronously on the thread that drives the stepper and
//! cannot stop the scan.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framestep::{FrameStepper, ProgressCallback, ProgressInfo, StepperOptions, VideoFile};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {} frames", info.operation, info.current);
//!     }
//! }
//!
//! let options = StepperOptions::new()
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_batch_size(100);
//! let mut stepper = FrameStepper::with_options(VideoFile::open("input.mp4")?, options)?;
//! stepper.precalc_frame_times()?;
//! # Ok::<(), framestep::FrameStepError>(())
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::source::FrameTime;

/// The kind of scan currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Counting frames for [`FrameStepper::frame_count`](crate::FrameStepper::frame_count).
    FrameCount,
    /// Building the frame-time table.
    FrameTableBuild,
    /// Walking to the last frame without a table.
    LastFrameScan,
}

/// A snapshot of scan progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of scan is running.
    pub operation: OperationType,
    /// Frames visited so far.
    pub current: u64,
    /// Frames expected, when known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the scan started.
    pub elapsed: Duration,
    /// Estimated time remaining, if `total` is known.
    pub estimated_remaining: Option<Duration>,
    /// Frame number most recently reached.
    pub current_frame: Option<u64>,
    /// Time of that frame.
    pub current_time: Option<FrameTime>,
}

/// Receives progress updates during scans.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` frames and once when the scan ends.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. Default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Counts visited frames and fires the callback in batches.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    pending: u64,
    started: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            pending: 0,
            started: Instant::now(),
        }
    }

    /// Record one visited frame.
    pub(crate) fn advance(&mut self, frame_number: u64, time: FrameTime) {
        self.current += 1;
        self.pending += 1;

        if self.pending >= self.batch_size {
            self.report(Some(frame_number), Some(time));
            self.pending = 0;
        }
    }

    /// Emit the closing report.
    pub(crate) fn finish(&mut self) {
        self.report(None, None);
    }

    fn report(&self, current_frame: Option<u64>, current_time: Option<FrameTime>) {
        let elapsed = self.started.elapsed();

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32) * 100.0);

        let estimated_remaining = match (self.total, self.current) {
            (Some(total), current) if current > 0 => {
                let remaining = total.saturating_sub(current);
                Some(elapsed.mul_f64(remaining as f64 / current as f64))
            }
            _ => None,
        };

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame,
            current_time,
        });
    }
}
