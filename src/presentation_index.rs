//! Sorted frame timestamps of one stream, rebased to start at zero.
//!
//! Containers do not agree on where a stream's timeline starts. MP4 files
//! with B-frames and no edit list begin at a negative PTS, Matroska
//! subtracts the codec delay, and transport streams start wherever the
//! capture began. [`PresentationIndex`] moves the first frame to
//! [`FrameTime::ZERO`] so "the timeline origin" is always the first frame,
//! and converts back to stream timestamps for seeking and decoding.

use crate::{
    error::FrameStepError,
    source::{Direction, FrameTime},
};

/// Distinct frame start times of a stream, ascending, first one at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationIndex {
    times: Vec<FrameTime>,
    origin: i64,
}

impl PresentationIndex {
    /// Build an index from raw stream timestamps in any order.
    ///
    /// Duplicates are dropped. Returns `None` when there are no timestamps.
    pub fn from_timestamps(mut timestamps: Vec<i64>) -> Option<Self> {
        timestamps.sort_unstable();
        timestamps.dedup();
        let origin = *timestamps.first()?;
        let times = timestamps
            .into_iter()
            .map(|timestamp| FrameTime(timestamp - origin))
            .collect();
        Some(Self { times, origin })
    }

    /// Stream timestamp of the first frame.
    pub fn origin(&self) -> i64 {
        self.origin
    }

    /// Number of distinct frame times.
    pub fn frame_count(&self) -> usize {
        self.times.len()
    }

    /// Rebased frame times, ascending.
    pub fn times(&self) -> &[FrameTime] {
        &self.times
    }

    /// Rebased time of the frame at `index`.
    pub fn time_at(&self, index: usize) -> Option<FrameTime> {
        self.times.get(index).copied()
    }

    /// Index of the frame showing at `time`: the last one starting at or
    /// before it, or the first frame when `time` precedes the stream.
    pub fn snap(&self, time: FrameTime) -> usize {
        self.times
            .partition_point(|&t| t <= time)
            .saturating_sub(1)
    }

    /// Nearest frame time strictly after (forward) or before (backward) `from`.
    pub fn next_after(&self, from: FrameTime, direction: Direction) -> Option<FrameTime> {
        match direction {
            Direction::Forward => self.time_at(self.times.partition_point(|&t| t <= from)),
            Direction::Backward => self
                .times
                .partition_point(|&t| t < from)
                .checked_sub(1)
                .and_then(|index| self.time_at(index)),
        }
    }

    /// Stream timestamp of a rebased time.
    pub fn to_stream(&self, time: FrameTime) -> i64 {
        time.0 + self.origin
    }

    /// Rebased time of a stream timestamp.
    pub fn from_stream(&self, timestamp: i64) -> FrameTime {
        FrameTime(timestamp - self.origin)
    }

    /// Decide whether a decoded frame is the one wanted at `target`.
    ///
    /// `Ok(false)` means the frame is earlier and decoding should go on;
    /// `Ok(true)` means it is the target. A frame past the target means the
    /// target never came out of the decoder, which is an error: handing out
    /// the later frame would show it twice.
    pub fn accept_decoded(&self, target: FrameTime, timestamp: i64) -> Result<bool, FrameStepError> {
        let decoded = self.from_stream(timestamp);
        if decoded < target {
            return Ok(false);
        }
        if decoded > target {
            return Err(FrameStepError::VideoDecodeError(format!(
                "decoder produced the frame at {decoded} while looking for {target}"
            )));
        }
        Ok(true)
    }
}
