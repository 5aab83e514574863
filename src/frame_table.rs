//! Precomputed frame-time table.
//!
//! [`FrameTable`] maps every frame number to the time its frame starts at.
//! It is built by [`FrameStepper::precalc_frame_times`](crate::FrameStepper::precalc_frame_times)
//! and, once installed, turns every step and seek into a lookup.

use ffmpeg_next::Rational;

use crate::{error::FrameStepError, source::FrameTime};

/// Frame times indexed by zero-based frame number, strictly ascending.
///
/// A table always holds at least one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTable {
    times: Vec<FrameTime>,
}

impl FrameTable {
    /// Build a table from frame times listed in frame order.
    ///
    /// # Errors
    ///
    /// [`FrameStepError::InvalidFrameTable`] if `times` is empty or not
    /// strictly ascending.
    pub fn new(times: Vec<FrameTime>) -> Result<Self, FrameStepError> {
        if times.is_empty() {
            return Err(FrameStepError::InvalidFrameTable(
                "table holds no frames".to_string(),
            ));
        }
        if let Some(index) = times.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(FrameStepError::InvalidFrameTable(format!(
                "frame {} at {} does not follow frame {index} at {}",
                index + 1,
                times[index + 1],
                times[index]
            )));
        }
        Ok(Self { times })
    }

    /// Number of frames in the table.
    pub fn frame_count(&self) -> u64 {
        self.times.len() as u64
    }

    /// Time of `frame_number`, or `None` when it is out of range.
    pub fn time_of(&self, frame_number: u64) -> Option<FrameTime> {
        usize::try_from(frame_number)
            .ok()
            .and_then(|index| self.times.get(index))
            .copied()
    }

    /// Index of the last frame.
    pub fn last_frame_number(&self) -> u64 {
        self.frame_count() - 1
    }

    /// The frame showing at `time`: the last frame starting at or before it.
    ///
    /// Returns `None` when `time` precedes the first frame.
    pub fn frame_at(&self, time: FrameTime) -> Option<u64> {
        let after = self.times.partition_point(|&t| t <= time);
        after.checked_sub(1).map(|index| index as u64)
    }

    /// Iterate over `(frame_number, time)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u64, FrameTime)> + '_ {
        self.times
            .iter()
            .enumerate()
            .map(|(index, &time)| (index as u64, time))
    }

    /// Display duration of each frame in seconds, measured to the next frame.
    ///
    /// The last frame has no successor and is left out.
    pub fn frame_durations(&self, time_base: Rational) -> Vec<f64> {
        self.times
            .windows(2)
            .map(|pair| crate::utilities::ticks_to_seconds(pair[1].0 - pair[0].0, time_base))
            .collect()
    }

    /// The frame times as a slice.
    pub fn as_slice(&self) -> &[FrameTime] {
        &self.times
    }
}
