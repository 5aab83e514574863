//! Pull-based frame iteration.
//!
//! [`Frames`] packages the usual read-then-step loop as an [`Iterator`].
//! Each call to [`next`](Iterator::next) decodes the frame the stepper is on
//! and then steps forward, so every frame is yielded exactly once and in
//! order, however slowly the caller consumes them.
//!
//! # Example
//!
//! ```no_run
//! use framestep::{FrameStepper, VideoFile};
//!
//! let mut stepper = FrameStepper::new(VideoFile::open("input.mp4")?)?;
//! for result in stepper.frames() {
//!     let frame = result?;
//!     frame.frame.save(format!("frame_{:06}.png", frame.frame_number))?;
//! }
//! # Ok::<(), framestep::FrameStepError>(())
//! ```

use crate::{
    error::FrameStepError,
    outcome::StepOutcome,
    source::{FrameSource, FrameTime},
    stepper::FrameStepper,
};

/// A decoded frame together with its position.
#[derive(Debug, Clone)]
pub struct SteppedFrame<F> {
    /// Zero-based frame number.
    pub frame_number: u64,
    /// Source time of the frame.
    pub time: FrameTime,
    /// The decoded frame.
    pub frame: F,
}

/// Iterator over the frames from the stepper's current position to the end.
///
/// Iteration starts with the current frame. If the stepper is already
/// [`done`](FrameStepper::is_done) nothing is yielded. An error from the
/// source is yielded once and ends the iteration. When the iterator is
/// dropped the stepper stays wherever iteration stopped.
///
/// Created via [`FrameStepper::frames`].
pub struct Frames<'a, S: FrameSource> {
    stepper: &'a mut FrameStepper<S>,
    pending_error: Option<FrameStepError>,
    finished: bool,
}

impl<'a, S: FrameSource> Frames<'a, S> {
    pub(crate) fn new(stepper: &'a mut FrameStepper<S>) -> Self {
        let finished = stepper.is_done();
        Self {
            stepper,
            pending_error: None,
            finished,
        }
    }
}

impl<S: FrameSource> Iterator for Frames<'_, S> {
    type Item = Result<SteppedFrame<S::Frame>, FrameStepError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending_error.take() {
            self.finished = true;
            return Some(Err(error));
        }
        if self.finished {
            return None;
        }

        let frame_number = self.stepper.current_frame_number();
        let time = self.stepper.current_frame_time();
        let frame = match self.stepper.read() {
            Ok(frame) => frame,
            Err(error) => {
                self.finished = true;
                return Some(Err(error));
            }
        };

        match self.stepper.step_forward() {
            StepOutcome::Positioned { .. } => {}
            StepOutcome::BoundaryReached { .. } => self.finished = true,
            StepOutcome::DecoderError(error) => self.pending_error = Some(error),
        }

        Some(Ok(SteppedFrame {
            frame_number,
            time,
            frame,
        }))
    }
}
