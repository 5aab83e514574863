//! In-memory `FrameSource` for driving `FrameStepper` without FFmpeg.
//!
//! `ScriptedSource` behaves like a well-indexed decoder over a fixed list of
//! frame times. The shared `Probe` records what the stepper asked for and
//! lets a test break the source at chosen points.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use ffmpeg_next::Rational;
use framestep::{Direction, FrameSource, FrameStepError, FrameTime, PresentationIndex};

/// Observations and failure switches shared between a test and its source.
#[derive(Debug, Default)]
pub struct Probe {
    /// `next_interesting_time` fails for any `from` at or after this time.
    pub fail_queries_from: Cell<Option<i64>>,
    /// `set_position` fails while set.
    pub fail_set_position: Cell<bool>,
    /// `set_position` fails from this call on, counting every call so far.
    pub fail_set_position_from_call: Cell<Option<usize>>,
    /// `decode_frame` fails while set.
    pub fail_decode: Cell<bool>,
    /// `set_position` is accepted but the cursor does not move.
    pub freeze_cursor: Cell<bool>,
    /// Number of `next_interesting_time` calls.
    pub queries: Cell<u64>,
    /// Number of `stop_autonomous_advance` calls.
    pub stop_calls: Cell<u64>,
    /// Every time passed to `set_position`, in call order.
    pub set_positions: RefCell<Vec<i64>>,
    /// The cursor time at every `decode_frame` call.
    pub decodes: RefCell<Vec<i64>>,
}

impl Probe {
    pub fn last_set_position(&self) -> Option<i64> {
        self.set_positions.borrow().last().copied()
    }
}

/// A source with frames starting at the given tick values (1 ms per tick).
pub struct ScriptedSource {
    times: Vec<i64>,
    cursor: usize,
    probe: Rc<Probe>,
}

impl ScriptedSource {
    /// `times` must be sorted, distinct and non-empty.
    pub fn new(times: Vec<i64>) -> (Self, Rc<Probe>) {
        assert!(!times.is_empty(), "scripted source needs at least one frame");
        let probe = Rc::new(Probe::default());
        let source = Self {
            times,
            cursor: 0,
            probe: Rc::clone(&probe),
        };
        (source, probe)
    }

    /// `frame_count` frames, `spacing` ticks apart, starting at zero.
    pub fn evenly_spaced(frame_count: usize, spacing: i64) -> (Self, Rc<Probe>) {
        Self::new((0..frame_count as i64).map(|i| i * spacing).collect())
    }

    /// Frames at raw stream timestamps, rebased the way `VideoFile` does.
    pub fn rebased(timestamps: Vec<i64>) -> (Self, Rc<Probe>) {
        let index =
            PresentationIndex::from_timestamps(timestamps).expect("scripted source needs frames");
        Self::new(index.times().iter().map(|time| time.0).collect())
    }

    /// Five frames at irregular intervals, the first one after the origin.
    pub fn variable_rate() -> (Self, Rc<Probe>) {
        Self::new(vec![100, 133, 200, 215, 400])
    }

    pub fn times(&self) -> &[i64] {
        &self.times
    }
}

/// Frame times of a source as `FrameTime`s.
pub fn frame_times(times: &[i64]) -> Vec<FrameTime> {
    times.iter().copied().map(FrameTime).collect()
}

impl FrameSource for ScriptedSource {
    /// The decoded "frame" is the time it was decoded at.
    type Frame = FrameTime;

    fn set_position(&mut self, time: FrameTime) -> Result<(), FrameStepError> {
        let calls = {
            let mut positions = self.probe.set_positions.borrow_mut();
            positions.push(time.0);
            positions.len()
        };
        let from_call = self.probe.fail_set_position_from_call.get();
        if self.probe.fail_set_position.get() || from_call.is_some_and(|call| calls >= call) {
            return Err(FrameStepError::SeekFailed {
                time,
                reason: "scripted failure".to_string(),
            });
        }
        if self.probe.freeze_cursor.get() {
            return Ok(());
        }
        let after = self.times.partition_point(|&t| t <= time.0);
        self.cursor = after.saturating_sub(1);
        Ok(())
    }

    fn position(&self) -> Result<FrameTime, FrameStepError> {
        Ok(FrameTime(self.times[self.cursor]))
    }

    fn stop_autonomous_advance(&mut self) -> Result<(), FrameStepError> {
        self.probe.stop_calls.set(self.probe.stop_calls.get() + 1);
        Ok(())
    }

    fn next_interesting_time(
        &mut self,
        from: FrameTime,
        direction: Direction,
    ) -> Result<Option<FrameTime>, FrameStepError> {
        self.probe.queries.set(self.probe.queries.get() + 1);
        if self
            .probe
            .fail_queries_from
            .get()
            .is_some_and(|limit| from.0 >= limit)
        {
            return Err(FrameStepError::VideoDecodeError(format!(
                "scripted failure at {from}"
            )));
        }

        let next = match direction {
            Direction::Forward => self.times.iter().find(|&&t| t > from.0),
            Direction::Backward => self.times.iter().rev().find(|&&t| t < from.0),
        };
        Ok(next.copied().map(FrameTime))
    }

    fn decode_frame(&mut self) -> Result<FrameTime, FrameStepError> {
        let time = self.times[self.cursor];
        self.probe.decodes.borrow_mut().push(time);
        if self.probe.fail_decode.get() {
            return Err(FrameStepError::VideoDecodeError(
                "scripted decode failure".to_string(),
            ));
        }
        Ok(FrameTime(time))
    }

    fn duration(&self) -> FrameTime {
        FrameTime(self.times[self.times.len() - 1] + 40)
    }

    fn time_base(&self) -> Rational {
        Rational::new(1, 1000)
    }
}
