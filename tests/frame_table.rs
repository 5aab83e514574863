//! Frame table (precalculated) integration tests.

mod common;

use common::{ScriptedSource, frame_times};
use ffmpeg_next::Rational;
use framestep::{
    Direction, FrameSource, FrameStepError, FrameStepper, FrameTable, FrameTime, StepOutcome,
};

// ── precalc_frame_times ────────────────────────────────────────────

#[test]
fn ten_frame_precalc_then_random_access() {
    let (source, _probe) = ScriptedSource::evenly_spaced(10, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");

    let frame_count = stepper.precalc_frame_times().expect("Failed to precalc");
    assert_eq!(frame_count, 10);
    assert!(stepper.is_precalculated());
    assert_eq!(stepper.current_frame_number(), 0);
    assert!(!stepper.is_done());

    assert!(stepper.goto_frame(5).is_positioned());
    assert_eq!(stepper.current_frame_number(), 5);
    assert_eq!(stepper.current_frame_time(), FrameTime(200));

    let outcome = stepper.goto_frame(10);
    assert!(outcome.is_boundary());
    assert_eq!(stepper.current_frame_number(), 5);
    assert_eq!(stepper.current_frame_time(), FrameTime(200));
    assert!(stepper.is_done());

    assert!(stepper.goto_frame(3).is_positioned());
    assert_eq!(stepper.current_frame_number(), 3);
    assert_eq!(stepper.current_frame_time(), FrameTime(120));
    assert!(!stepper.is_done());
}

#[test]
fn table_matches_scanned_times() {
    let (source, _probe) = ScriptedSource::variable_rate();
    let expected = frame_times(source.times());
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");

    let mut scanned = vec![stepper.current_frame_time()];
    while stepper.step_forward().is_positioned() {
        scanned.push(stepper.current_frame_time());
    }
    assert_eq!(scanned, expected);

    stepper.precalc_frame_times().expect("Failed to precalc");
    let table = stepper.frame_table().expect("Table should be installed");
    assert_eq!(table.as_slice(), expected.as_slice());

    let mut cached = vec![stepper.current_frame_time()];
    while stepper.step_forward().is_positioned() {
        cached.push(stepper.current_frame_time());
    }
    assert_eq!(cached, expected);
}

#[test]
fn precalc_from_the_middle_returns_to_frame_zero() {
    let (source, _probe) = ScriptedSource::evenly_spaced(6, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    let _ = stepper.step_forward_by(4);
    let _ = stepper.step_forward_by(10);
    assert!(stepper.is_done());

    stepper.precalc_frame_times().expect("Failed to precalc");
    assert_eq!(stepper.current_frame_number(), 0);
    assert_eq!(stepper.current_frame_time(), FrameTime(0));
    assert!(!stepper.is_done());
}

#[test]
fn precalc_twice_rebuilds_the_table() {
    let (source, _probe) = ScriptedSource::evenly_spaced(4, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");

    assert_eq!(stepper.precalc_frame_times().expect("First precalc"), 4);
    assert_eq!(stepper.precalc_frame_times().expect("Second precalc"), 4);
    assert_eq!(stepper.frame_count().expect("Failed to count"), 4);
}

#[test]
fn failed_precalc_installs_no_table() {
    let (source, probe) = ScriptedSource::evenly_spaced(8, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    probe.fail_queries_from.set(Some(160));

    let result = stepper.precalc_frame_times();
    assert!(matches!(result, Err(FrameStepError::VideoDecodeError(_))));
    assert!(!stepper.is_precalculated());
    assert!(stepper.frame_table().is_none());
    assert_eq!(stepper.current_frame_number(), 0);
}

#[test]
fn failed_precalc_drops_the_old_table() {
    let (source, probe) = ScriptedSource::evenly_spaced(8, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    stepper.precalc_frame_times().expect("Failed to precalc");

    probe.fail_queries_from.set(Some(0));
    assert!(stepper.precalc_frame_times().is_err());
    assert!(!stepper.is_precalculated());
}

// ── cached stepping ────────────────────────────────────────────────

#[test]
fn cached_steps_do_not_query_the_source() {
    let (source, probe) = ScriptedSource::evenly_spaced(20, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    stepper.precalc_frame_times().expect("Failed to precalc");

    let before = probe.queries.get();
    assert!(stepper.goto_frame(17).is_positioned());
    assert!(stepper.step_backward().is_positioned());
    assert!(stepper.step_forward_by(2).is_positioned());
    assert!(stepper.goto_last_frame().is_positioned());
    assert_eq!(probe.queries.get(), before);

    // Each cached move still positions the source.
    assert_eq!(probe.last_set_position(), Some(19 * 40));
}

#[test]
fn cached_backward_step_at_zero_is_a_boundary() {
    let (source, _probe) = ScriptedSource::evenly_spaced(3, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    stepper.precalc_frame_times().expect("Failed to precalc");

    let outcome = stepper.step(Direction::Backward);
    assert!(outcome.is_boundary());
    assert_eq!(stepper.current_frame_number(), 0);
    assert!(stepper.is_done());

    assert!(stepper.step_forward().is_positioned());
    assert!(!stepper.is_done());
}

#[test]
fn cached_forward_overstep_keeps_position() {
    let (source, _probe) = ScriptedSource::evenly_spaced(3, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    stepper.precalc_frame_times().expect("Failed to precalc");

    let outcome = stepper.step_forward_by(7);
    match outcome {
        StepOutcome::BoundaryReached { frame_number, time } => {
            assert_eq!(frame_number, 2);
            assert_eq!(time, FrameTime(80));
        }
        other => panic!("Expected BoundaryReached, got: {other:?}"),
    }
    assert!(stepper.is_done());
}

#[test]
fn goto_last_frame_agrees_with_and_without_table() {
    let (source, _probe) = ScriptedSource::variable_rate();
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");

    let scanned = stepper.goto_last_frame();
    let scanned = (scanned.frame_number(), scanned.time());

    stepper.precalc_frame_times().expect("Failed to precalc");
    let cached = stepper.goto_last_frame();
    assert_eq!((cached.frame_number(), cached.time()), scanned);
    assert_eq!(scanned, (Some(4), Some(FrameTime(400))));
    assert!(!stepper.is_done());
}

// ── installing and discarding ──────────────────────────────────────

#[test]
fn discard_returns_to_scanning() {
    let (source, probe) = ScriptedSource::evenly_spaced(5, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    stepper.precalc_frame_times().expect("Failed to precalc");

    let table = stepper.discard_frame_table().expect("Table should be returned");
    assert_eq!(table.frame_count(), 5);
    assert!(!stepper.is_precalculated());
    assert!(stepper.discard_frame_table().is_none());

    let before = probe.queries.get();
    assert!(stepper.step_forward().is_positioned());
    assert_eq!(probe.queries.get(), before + 1);
}

#[test]
fn set_frame_table_reuses_a_saved_table() {
    let (source, _probe) = ScriptedSource::evenly_spaced(5, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    stepper.precalc_frame_times().expect("Failed to precalc");
    let table = stepper.discard_frame_table().expect("Table should be returned");

    let (other_source, probe) = ScriptedSource::evenly_spaced(5, 40);
    let mut other = FrameStepper::new(other_source).expect("Failed to bind stepper");
    assert!(other.set_frame_table(table.clone()).is_positioned());
    assert_eq!(other.frame_table(), Some(&table));

    let before = probe.queries.get();
    assert!(other.goto_frame(4).is_positioned());
    assert_eq!(other.current_frame_time(), FrameTime(160));
    assert_eq!(probe.queries.get(), before);
}

#[test]
fn installed_table_decides_the_first_frame_time() {
    let (source, probe) = ScriptedSource::variable_rate();
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");
    let _ = stepper.step_forward_by(3);

    let table = FrameTable::new(frame_times(&[133, 200, 215])).expect("Valid table");
    let outcome = stepper.set_frame_table(table);
    assert!(outcome.is_positioned());
    assert_eq!(stepper.current_frame_number(), 0);
    assert_eq!(stepper.current_frame_time(), FrameTime(133));
    assert_eq!(probe.last_set_position(), Some(133));
    assert_eq!(stepper.frame_count().expect("Failed to count"), 3);

    let _ = stepper.goto_frame(2);
    assert!(stepper.goto_first_frame().is_positioned());
    assert_eq!(stepper.current_frame_time(), FrameTime(133));
}

#[test]
fn precalc_installs_nothing_when_frame_zero_is_unreachable() {
    let (source, probe) = ScriptedSource::evenly_spaced(3, 40);
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");

    // Each pass positions the source once per frame; the next call is the
    // final move to frame zero.
    let calls = probe.set_positions.borrow().len();
    probe.fail_set_position_from_call.set(Some(calls + 2 * 3 + 1));

    let result = stepper.precalc_frame_times();
    assert!(matches!(result, Err(FrameStepError::SeekFailed { .. })));
    assert!(!stepper.is_precalculated());
    assert!(stepper.frame_table().is_none());
}

// ── inconsistent source ────────────────────────────────────────────

/// Gains one frame every time it is rewound to the origin.
struct GrowingSource {
    frame_count: i64,
    cursor: i64,
}

impl FrameSource for GrowingSource {
    type Frame = ();

    fn set_position(&mut self, time: FrameTime) -> Result<(), FrameStepError> {
        if time == FrameTime::ZERO {
            self.frame_count += 1;
        }
        self.cursor = time.0.clamp(0, self.frame_count - 1);
        Ok(())
    }

    fn position(&self) -> Result<FrameTime, FrameStepError> {
        Ok(FrameTime(self.cursor))
    }

    fn next_interesting_time(
        &mut self,
        from: FrameTime,
        direction: Direction,
    ) -> Result<Option<FrameTime>, FrameStepError> {
        let next = from.0 + direction.offset();
        Ok((0..self.frame_count).contains(&next).then_some(FrameTime(next)))
    }

    fn decode_frame(&mut self) -> Result<(), FrameStepError> {
        Ok(())
    }

    fn duration(&self) -> FrameTime {
        FrameTime(self.frame_count)
    }

    fn time_base(&self) -> Rational {
        Rational::new(1, 25)
    }
}

#[test]
fn disagreeing_passes_are_rejected() {
    let source = GrowingSource {
        frame_count: 3,
        cursor: 0,
    };
    let mut stepper = FrameStepper::new(source).expect("Failed to bind stepper");

    match stepper.precalc_frame_times() {
        Err(FrameStepError::InconsistentScan {
            first_pass,
            second_pass,
        }) => {
            assert_eq!(first_pass, 5);
            assert_eq!(second_pass, 6);
        }
        other => panic!("Expected InconsistentScan, got: {other:?}"),
    }
    assert!(!stepper.is_precalculated());
}

// ── FrameTable ─────────────────────────────────────────────────────

#[test]
fn frame_table_lookups() {
    let table = FrameTable::new(frame_times(&[100, 133, 200, 215, 400])).expect("Valid table");

    assert_eq!(table.frame_count(), 5);
    assert_eq!(table.time_of(0), Some(FrameTime(100)));
    assert_eq!(table.time_of(4), Some(FrameTime(400)));
    assert_eq!(table.time_of(5), None);
    assert_eq!(table.time_of(u64::MAX), None);
    assert_eq!(table.last_frame_number(), 4);

    assert_eq!(table.frame_at(FrameTime(99)), None);
    assert_eq!(table.frame_at(FrameTime(100)), Some(0));
    assert_eq!(table.frame_at(FrameTime(210)), Some(2));
    assert_eq!(table.frame_at(FrameTime(215)), Some(3));
    assert_eq!(table.frame_at(FrameTime(10_000)), Some(4));

    let pairs: Vec<_> = table.iter().collect();
    assert_eq!(pairs[1], (1, FrameTime(133)));
    assert_eq!(pairs.len(), 5);
}

#[test]
fn empty_frame_table_is_rejected() {
    match FrameTable::new(Vec::new()) {
        Err(FrameStepError::InvalidFrameTable(msg)) => {
            assert!(msg.contains("no frames"), "Unexpected message: {msg}");
        }
        other => panic!("Expected InvalidFrameTable, got: {other:?}"),
    }
}

#[test]
fn unordered_frame_table_is_rejected() {
    assert!(matches!(
        FrameTable::new(frame_times(&[80, 0, 40])),
        Err(FrameStepError::InvalidFrameTable(_))
    ));
    // Repeated times would give two frame numbers the same picture.
    assert!(matches!(
        FrameTable::new(frame_times(&[0, 40, 40, 80])),
        Err(FrameStepError::InvalidFrameTable(_))
    ));
}

#[test]
fn single_frame_table() {
    let table = FrameTable::new(frame_times(&[-20])).expect("Valid table");
    assert_eq!(table.last_frame_number(), 0);
    assert_eq!(table.frame_at(FrameTime(-21)), None);
    assert!(table.frame_durations(Rational::new(1, 1000)).is_empty());
}

#[test]
fn frame_durations_measure_to_the_next_frame() {
    let table = FrameTable::new(frame_times(&[0, 40, 120])).expect("Valid table");
    let durations = table.frame_durations(Rational::new(1, 1000));
    assert_eq!(durations.len(), 2);
    assert!((durations[0] - 0.040).abs() < 1e-9);
    assert!((durations[1] - 0.080).abs() < 1e-9);
}
