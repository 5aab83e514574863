//! The frame-stepping controller.
//!
//! [`FrameStepper`] walks a [`FrameSource`] one decodable frame at a time,
//! keeping an exact zero-based frame number next to the source's own frame
//! time. Nothing moves unless the caller asks: there is no clock, no timer
//! and no background thread.
//!
//! The stepper runs in one of two modes. Without a frame table it *scans*,
//! asking the source for the next distinct frame on every step, so a seek
//! costs one source query per frame crossed. After
//! [`precalc_frame_times`](FrameStepper::precalc_frame_times) it is
//! *cached*, and steps and seeks become table lookups.
//!
//! # Example
//!
//! ```no_run
//! use framestep::{FrameStepper, VideoFile};
//!
//! let mut stepper = FrameStepper::new(VideoFile::open("input.mp4")?)?;
//! while !stepper.is_done() {
//!     let image = stepper.read()?;
//!     image.save(format!("frame_{:06}.png", stepper.current_frame_number()))?;
//!     let _ = stepper.step_forward();
//! }
//! # Ok::<(), framestep::FrameStepError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    ops::{Deref, DerefMut},
    time::Duration,
};

use crate::{
    configuration::StepperOptions,
    error::FrameStepError,
    frame_table::FrameTable,
    frames::Frames,
    outcome::StepOutcome,
    progress::{OperationType, ProgressTracker},
    source::{Direction, FrameSource, FrameTime},
};

/// How steps and seeks are resolved.
enum Mode {
    /// Ask the source for every frame boundary.
    Scanning,
    /// Look frame times up in a prebuilt table.
    Cached(FrameTable),
}

/// Frame-exact, caller-driven traversal of a [`FrameSource`].
///
/// Positioning calls ([`step`](FrameStepper::step),
/// [`goto_frame`](FrameStepper::goto_frame) and friends) return a
/// [`StepOutcome`] instead of a `Result`. Trying to move past the first or
/// last frame leaves the position alone and sets
/// [`is_done`](FrameStepper::is_done); the next successful move clears it.
///
/// The stepper owns its source. Nothing else can move the source's cursor
/// while the stepper is alive, which is what keeps the cached frame number
/// and time honest.
pub struct FrameStepper<S> {
    source: S,
    current_frame_number: u64,
    current_frame_time: FrameTime,
    done: bool,
    mode: Mode,
    options: StepperOptions,
}

impl<S> Debug for FrameStepper<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameStepper")
            .field("current_frame_number", &self.current_frame_number)
            .field("current_frame_time", &self.current_frame_time)
            .field("done", &self.done)
            .field(
                "precalced_frame_count",
                &match &self.mode {
                    Mode::Cached(table) => Some(table.frame_count()),
                    Mode::Scanning => None,
                },
            )
            .finish_non_exhaustive()
    }
}

impl<S: FrameSource> FrameStepper<S> {
    /// Bind a stepper to an open source and position it at frame zero.
    ///
    /// # Errors
    ///
    /// Returns the source's error if it cannot be positioned at the first
    /// frame.
    pub fn new(source: S) -> Result<Self, FrameStepError> {
        Self::with_options(source, StepperOptions::new())
    }

    /// Like [`new`](FrameStepper::new), with progress reporting configured.
    pub fn with_options(source: S, options: StepperOptions) -> Result<Self, FrameStepError> {
        let mut stepper = Self {
            source,
            current_frame_number: 0,
            current_frame_time: FrameTime::ZERO,
            done: false,
            mode: Mode::Scanning,
            options,
        };

        if let StepOutcome::DecoderError(error) = stepper.reset() {
            return Err(error);
        }
        Ok(stepper)
    }

    /// Stop the source's clock, if it has one, and go to frame zero.
    ///
    /// Safe to call at any time and any number of times.
    pub fn reset(&mut self) -> StepOutcome {
        if let Err(error) = self.source.stop_autonomous_advance() {
            log::warn!("Source did not stop advancing on its own: {error}");
        }
        self.goto_first_frame()
    }

    /// Position the source at the timeline origin and call that frame zero.
    ///
    /// With a frame table the time of frame zero is taken from the table.
    pub fn goto_first_frame(&mut self) -> StepOutcome {
        if self.is_precalculated() {
            return self.goto_frame_cached(0);
        }

        let landed = self
            .source
            .set_position(FrameTime::ZERO)
            .and_then(|()| self.source.position());

        match landed {
            Ok(time) => {
                self.current_frame_number = 0;
                self.current_frame_time = time;
                self.done = false;
                self.positioned()
            }
            Err(error) => self.fail(error),
        }
    }

    /// Position the stepper at the last frame.
    ///
    /// Without a frame table this walks the whole stream from frame zero.
    /// Reaching the last frame is not an overstep, so `is_done` is cleared
    /// afterwards.
    pub fn goto_last_frame(&mut self) -> StepOutcome {
        if let Some(last) = self.frame_table().map(FrameTable::last_frame_number) {
            return self.goto_frame_cached(last);
        }

        match self.scan_forward(OperationType::LastFrameScan, None, |_, _| {}) {
            Ok(_) => {
                self.done = false;
                self.positioned()
            }
            Err(error) => self.fail(error),
        }
    }

    /// Position the stepper at `frame_number` (zero-based).
    ///
    /// With a frame table, an out-of-range number leaves the position
    /// unchanged and reports [`StepOutcome::BoundaryReached`]. Without one,
    /// the stepper walks toward the target and stops early at whichever end
    /// of the stream it runs into.
    pub fn goto_frame(&mut self, frame_number: u64) -> StepOutcome {
        match self.mode {
            Mode::Cached(_) => self.goto_frame_cached(frame_number),
            Mode::Scanning => self.goto_frame_scanning(frame_number),
        }
    }

    /// Move one frame in `direction`.
    pub fn step(&mut self, direction: Direction) -> StepOutcome {
        match self.mode {
            Mode::Cached(_) => self.step_cached(direction),
            Mode::Scanning => self.step_scanning(direction),
        }
    }

    /// Move one frame toward the end.
    pub fn step_forward(&mut self) -> StepOutcome {
        self.step(Direction::Forward)
    }

    /// Move one frame toward the start.
    pub fn step_backward(&mut self) -> StepOutcome {
        self.step(Direction::Backward)
    }

    /// Move up to `count` frames toward the end, stopping at the last frame.
    pub fn step_forward_by(&mut self, count: u64) -> StepOutcome {
        self.step_by(Direction::Forward, count)
    }

    /// Move up to `count` frames toward the start, stopping at frame zero.
    pub fn step_backward_by(&mut self, count: u64) -> StepOutcome {
        self.step_by(Direction::Backward, count)
    }

    /// Scan the whole stream and cache every frame's time.
    ///
    /// Two forward passes are made with the scanning primitive: the first
    /// counts frames, the second records their times. Afterwards every step
    /// and seek is a table lookup. The stepper is left at frame zero.
    ///
    /// Any previously installed table is discarded first. If a pass fails,
    /// or frame zero cannot be reached afterwards, no table is installed.
    ///
    /// # Errors
    ///
    /// - The source's error if it fails mid-scan.
    /// - [`FrameStepError::InconsistentScan`] if the passes disagree.
    pub fn precalc_frame_times(&mut self) -> Result<u64, FrameStepError> {
        self.mode = Mode::Scanning;

        match self.build_frame_table() {
            Ok(table) => {
                let frame_count = table.frame_count();
                log::debug!("Frame table built ({frame_count} frames)");
                self.mode = Mode::Cached(table);
                if let StepOutcome::DecoderError(error) = self.goto_first_frame() {
                    log::warn!("Frame table discarded, frame zero is unreachable: {error}");
                    self.mode = Mode::Scanning;
                    return Err(error);
                }
                Ok(frame_count)
            }
            Err(error) => {
                log::warn!("Frame table build failed: {error}");
                let _ = self.goto_first_frame();
                Err(error)
            }
        }
    }

    /// Install a frame table built elsewhere and go to frame zero.
    ///
    /// The table must describe this source. [`FrameTable::new`] guarantees
    /// it is non-empty and ascending, but the times themselves are trusted.
    pub fn set_frame_table(&mut self, table: FrameTable) -> StepOutcome {
        self.mode = Mode::Cached(table);
        self.goto_frame_cached(0)
    }

    /// Drop the frame table and go back to scanning.
    ///
    /// Returns the table, if one was installed.
    pub fn discard_frame_table(&mut self) -> Option<FrameTable> {
        match std::mem::replace(&mut self.mode, Mode::Scanning) {
            Mode::Cached(table) => Some(table),
            Mode::Scanning => None,
        }
    }

    /// The installed frame table, if any.
    pub fn frame_table(&self) -> Option<&FrameTable> {
        match &self.mode {
            Mode::Cached(table) => Some(table),
            Mode::Scanning => None,
        }
    }

    /// `true` once [`precalc_frame_times`](FrameStepper::precalc_frame_times)
    /// has succeeded (and no table was discarded since).
    pub fn is_precalculated(&self) -> bool {
        matches!(self.mode, Mode::Cached(_))
    }

    /// Total number of frames.
    ///
    /// Without a frame table this scans the whole stream and then puts the
    /// stepper back exactly where it was, including the `is_done` flag. The
    /// restore also runs when the scan fails.
    pub fn frame_count(&mut self) -> Result<u64, FrameStepError> {
        if let Some(table) = self.frame_table() {
            return Ok(table.frame_count());
        }

        let mut guard = PositionGuard::new(self);
        guard.scan_forward(OperationType::FrameCount, None, |_, _| {})
    }

    /// Zero-based number of the current frame.
    pub fn current_frame_number(&self) -> u64 {
        self.current_frame_number
    }

    /// Source time of the current frame.
    pub fn current_frame_time(&self) -> FrameTime {
        self.current_frame_time
    }

    /// Current frame time as a [`Duration`] from the timeline origin.
    pub fn current_timestamp(&self) -> Duration {
        self.current_frame_time.to_duration(self.source.time_base())
    }

    /// `true` if the last positioning call tried to move past either end
    /// of the stream, or failed in the source.
    ///
    /// Purely informational: moving in the other direction still works.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Total timeline length reported by the source.
    pub fn duration(&self) -> Duration {
        self.source.duration().to_duration(self.source.time_base())
    }

    /// Decode the current frame.
    ///
    /// The source is first put back at the current frame time, so the frame
    /// returned is always the one the stepper points at.
    pub fn read(&mut self) -> Result<S::Frame, FrameStepError> {
        self.source.set_position(self.current_frame_time)?;
        self.source.decode_frame()
    }

    /// Iterate from the current frame to the last, reading each one.
    ///
    /// See [`Frames`].
    pub fn frames(&mut self) -> Frames<'_, S> {
        Frames::new(self)
    }

    /// Shared access to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The configured options.
    pub fn options(&self) -> &StepperOptions {
        &self.options
    }

    /// Release the source.
    pub fn into_source(self) -> S {
        self.source
    }

    fn step_by(&mut self, direction: Direction, count: u64) -> StepOutcome {
        self.done = false;
        let mut outcome = self.positioned();
        for _ in 0..count {
            outcome = self.step(direction);
            if !outcome.is_positioned() {
                break;
            }
        }
        outcome
    }

    fn step_cached(&mut self, direction: Direction) -> StepOutcome {
        match self
            .current_frame_number
            .checked_add_signed(direction.offset())
        {
            Some(target) => self.goto_frame_cached(target),
            None => self.boundary(),
        }
    }

    fn goto_frame_cached(&mut self, frame_number: u64) -> StepOutcome {
        let Some(time) = self
            .frame_table()
            .and_then(|table| table.time_of(frame_number))
        else {
            return self.boundary();
        };

        if let Err(error) = self.source.set_position(time) {
            return self.fail(error);
        }
        self.current_frame_number = frame_number;
        self.current_frame_time = time;
        self.done = false;
        self.positioned()
    }

    fn step_scanning(&mut self, direction: Direction) -> StepOutcome {
        let Some(frame_number) = self
            .current_frame_number
            .checked_add_signed(direction.offset())
        else {
            return self.boundary();
        };

        let next = match self
            .source
            .next_interesting_time(self.current_frame_time, direction)
        {
            Ok(Some(time)) => time,
            Ok(None) => return self.boundary(),
            Err(error) => return self.fail(error),
        };

        let landed = self
            .source
            .set_position(next)
            .and_then(|()| self.source.position());

        match landed {
            Ok(time) if self.moves_toward(time, direction) => {
                self.current_frame_number = frame_number;
                self.current_frame_time = time;
                self.done = false;
                self.positioned()
            }
            Ok(time) => self.fail(FrameStepError::SeekFailed {
                time: next,
                reason: format!(
                    "source landed on {time}, not past {}",
                    self.current_frame_time
                ),
            }),
            Err(error) => self.fail(error),
        }
    }

    fn goto_frame_scanning(&mut self, frame_number: u64) -> StepOutcome {
        self.done = false;
        let mut outcome = self.positioned();
        while self.current_frame_number != frame_number {
            let direction = if self.current_frame_number < frame_number {
                Direction::Forward
            } else {
                Direction::Backward
            };
            outcome = self.step_scanning(direction);
            if !outcome.is_positioned() {
                break;
            }
        }
        outcome
    }

    /// Walk from frame zero to the end with the scanning primitive.
    ///
    /// `visit` sees every frame in order. Leaves the stepper on the last
    /// frame with `done` set and returns the number of frames visited.
    fn scan_forward<F>(
        &mut self,
        operation: OperationType,
        total: Option<u64>,
        mut visit: F,
    ) -> Result<u64, FrameStepError>
    where
        F: FnMut(u64, FrameTime),
    {
        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            operation,
            total,
            self.options.batch_size,
        );

        if let StepOutcome::DecoderError(error) = self.goto_first_frame() {
            return Err(error);
        }

        loop {
            visit(self.current_frame_number, self.current_frame_time);
            tracker.advance(self.current_frame_number, self.current_frame_time);

            match self.step_scanning(Direction::Forward) {
                StepOutcome::Positioned { .. } => {}
                StepOutcome::BoundaryReached { .. } => break,
                StepOutcome::DecoderError(error) => {
                    tracker.finish();
                    return Err(error);
                }
            }
        }

        tracker.finish();
        Ok(self.current_frame_number + 1)
    }

    fn build_frame_table(&mut self) -> Result<FrameTable, FrameStepError> {
        let first_pass = self.scan_forward(OperationType::FrameTableBuild, None, |_, _| {})?;

        let mut times = Vec::with_capacity(first_pass as usize);
        let second_pass = self.scan_forward(
            OperationType::FrameTableBuild,
            Some(first_pass),
            |_, time| times.push(time),
        )?;

        if second_pass != first_pass {
            return Err(FrameStepError::InconsistentScan {
                first_pass,
                second_pass,
            });
        }
        FrameTable::new(times)
    }

    fn moves_toward(&self, time: FrameTime, direction: Direction) -> bool {
        match direction {
            Direction::Forward => time > self.current_frame_time,
            Direction::Backward => time < self.current_frame_time,
        }
    }

    fn positioned(&self) -> StepOutcome {
        StepOutcome::Positioned {
            frame_number: self.current_frame_number,
            time: self.current_frame_time,
        }
    }

    fn boundary(&mut self) -> StepOutcome {
        self.done = true;
        StepOutcome::BoundaryReached {
            frame_number: self.current_frame_number,
            time: self.current_frame_time,
        }
    }

    fn fail(&mut self, error: FrameStepError) -> StepOutcome {
        log::debug!(
            "Source failed at frame {} ({}): {error}",
            self.current_frame_number,
            self.current_frame_time
        );
        self.done = true;
        StepOutcome::DecoderError(error)
    }
}

/// Snapshot of the stepper's position, put back when dropped.
struct PositionGuard<'a, S: FrameSource> {
    stepper: &'a mut FrameStepper<S>,
    frame_number: u64,
    time: FrameTime,
    done: bool,
}

impl<'a, S: FrameSource> PositionGuard<'a, S> {
    fn new(stepper: &'a mut FrameStepper<S>) -> Self {
        let frame_number = stepper.current_frame_number;
        let time = stepper.current_frame_time;
        let done = stepper.done;
        Self {
            stepper,
            frame_number,
            time,
            done,
        }
    }
}

impl<S: FrameSource> Deref for PositionGuard<'_, S> {
    type Target = FrameStepper<S>;

    fn deref(&self) -> &Self::Target {
        self.stepper
    }
}

impl<S: FrameSource> DerefMut for PositionGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stepper
    }
}

impl<S: FrameSource> Drop for PositionGuard<'_, S> {
    fn drop(&mut self) {
        self.stepper.current_frame_number = self.frame_number;
        self.stepper.current_frame_time = self.time;
        self.stepper.done = self.done;
        if let Err(error) = self.stepper.source.set_position(self.time) {
            log::warn!("Failed to restore position {}: {error}", self.time);
        }
    }
}
