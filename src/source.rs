//! The decoder collaborator contract.
//!
//! A [`FrameSource`] is anything that can hold a timeline cursor, report where
//! the next distinct video frame lies relative to a position, and decode the
//! frame under the cursor. [`FrameStepper`](crate::FrameStepper) owns one and
//! drives it; [`VideoFile`](crate::VideoFile) is the FFmpeg-backed
//! implementation shipped with the crate.
//!
//! Positions are [`FrameTime`] values: integer ticks in the source's own
//! time base. They are opaque to the stepper, which only compares, stores and
//! hands them back.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};

use ffmpeg_next::Rational;

use crate::error::FrameStepError;

/// A position on a source's timeline, in ticks of the source's time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameTime(pub i64);

impl FrameTime {
    /// The timeline origin.
    pub const ZERO: FrameTime = FrameTime(0);

    /// Raw tick count.
    pub fn ticks(self) -> i64 {
        self.0
    }

    /// Convert to seconds using the given time base.
    pub fn to_seconds(self, time_base: Rational) -> f64 {
        crate::utilities::ticks_to_seconds(self.0, time_base)
    }

    /// Convert to a [`Duration`] using the given time base.
    ///
    /// Positions before the origin clamp to [`Duration::ZERO`].
    pub fn to_duration(self, time_base: Rational) -> Duration {
        Duration::from_secs_f64(self.to_seconds(time_base).max(0.0))
    }
}

impl Display for FrameTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ticks", self.0)
    }
}

impl From<i64> for FrameTime {
    fn from(ticks: i64) -> Self {
        FrameTime(ticks)
    }
}

/// Direction of a single step along the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward the end of the stream (+1 frame).
    Forward,
    /// Toward the start of the stream (-1 frame).
    Backward,
}

impl Direction {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Signed frame offset of one step: `+1` or `-1`.
    pub fn offset(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Capabilities the stepper needs from a video decoder.
///
/// Implementations must not move their cursor on their own; the stepper
/// assumes the position it last set is the position the source is at.
/// Every method except [`duration`](FrameSource::duration) and
/// [`time_base`](FrameSource::time_base) may fail, and the stepper decides
/// how a failure is surfaced.
pub trait FrameSource {
    /// Decoded frame type handed back by [`decode_frame`](FrameSource::decode_frame).
    type Frame;

    /// Move the timeline cursor. The source may snap to a nearby frame
    /// boundary; [`position`](FrameSource::position) reports where it landed.
    fn set_position(&mut self, time: FrameTime) -> Result<(), FrameStepError>;

    /// The actual cursor position.
    fn position(&self) -> Result<FrameTime, FrameStepError>;

    /// Stop any free-running playback clock.
    ///
    /// Sources that never advance by themselves keep the default no-op.
    fn stop_autonomous_advance(&mut self) -> Result<(), FrameStepError> {
        Ok(())
    }

    /// The nearest position strictly after (`Forward`) or strictly before
    /// (`Backward`) `from` that starts a distinct video frame.
    ///
    /// `Ok(None)` means there is no such frame: `from` is at or beyond the
    /// end (or start) of the stream.
    fn next_interesting_time(
        &mut self,
        from: FrameTime,
        direction: Direction,
    ) -> Result<Option<FrameTime>, FrameStepError>;

    /// Decode the frame at the current cursor position.
    fn decode_frame(&mut self) -> Result<Self::Frame, FrameStepError>;

    /// Total timeline length. Informational only.
    fn duration(&self) -> FrameTime;

    /// Length of one tick of [`FrameTime`], in seconds.
    fn time_base(&self) -> Rational;
}
