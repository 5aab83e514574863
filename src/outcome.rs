//! Result of a positioning call.
//!
//! Stepping and seeking never return `Err`. Running off either end of the
//! stream is an expected event, and a decoder failure is reported alongside
//! it so callers that care can tell the two apart.

use crate::{error::FrameStepError, source::FrameTime};

/// What a step or seek did.
///
/// `BoundaryReached` and `DecoderError` both leave the stepper at its
/// previous position and set [`is_done`](crate::FrameStepper::is_done).
#[derive(Debug)]
#[must_use]
pub enum StepOutcome {
    /// The stepper is now at `frame_number`, whose frame starts at `time`.
    Positioned {
        /// Zero-based frame index.
        frame_number: u64,
        /// Position reported by the source.
        time: FrameTime,
    },
    /// The move would have left the stream. The position is unchanged.
    BoundaryReached {
        /// Frame the stepper is still at.
        frame_number: u64,
        /// Time of that frame.
        time: FrameTime,
    },
    /// The source failed while moving. The position is the last known one.
    DecoderError(FrameStepError),
}

impl StepOutcome {
    /// `true` for [`StepOutcome::Positioned`].
    pub fn is_positioned(&self) -> bool {
        matches!(self, StepOutcome::Positioned { .. })
    }

    /// `true` for [`StepOutcome::BoundaryReached`].
    pub fn is_boundary(&self) -> bool {
        matches!(self, StepOutcome::BoundaryReached { .. })
    }

    /// Frame time carried by the outcome, `None` for a decoder error.
    pub fn time(&self) -> Option<FrameTime> {
        match self {
            StepOutcome::Positioned { time, .. } | StepOutcome::BoundaryReached { time, .. } => {
                Some(*time)
            }
            StepOutcome::DecoderError(_) => None,
        }
    }

    /// Frame number carried by the outcome, `None` for a decoder error.
    pub fn frame_number(&self) -> Option<u64> {
        match self {
            StepOutcome::Positioned { frame_number, .. }
            | StepOutcome::BoundaryReached { frame_number, .. } => Some(*frame_number),
            StepOutcome::DecoderError(_) => None,
        }
    }

    /// The decoder error, if any.
    pub fn error(&self) -> Option<&FrameStepError> {
        match self {
            StepOutcome::DecoderError(error) => Some(error),
            _ => None,
        }
    }

    /// Turn a decoder error into `Err`, keeping boundaries as `Ok`.
    ///
    /// Handy with `?` when a boundary is a normal loop exit but a decoder
    /// failure should abort.
    pub fn into_result(self) -> Result<StepOutcome, FrameStepError> {
        match self {
            StepOutcome::DecoderError(error) => Err(error),
            other => Ok(other),
        }
    }
}
