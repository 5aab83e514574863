//! Progress reporting during full-stream scans.

mod common;

use std::sync::{Arc, Mutex};

use common::ScriptedSource;
use framestep::{FrameStepper, OperationType, ProgressCallback, ProgressInfo, StepperOptions};

/// Records every progress notification.
#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    fn events(&self) -> Vec<ProgressInfo> {
        self.events.lock().expect("Progress lock poisoned").clone()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.events
            .lock()
            .expect("Progress lock poisoned")
            .push(info.clone());
    }
}

fn stepper_with_progress(
    frame_count: usize,
    batch_size: u64,
) -> (FrameStepper<ScriptedSource>, Arc<RecordingProgress>) {
    let (source, _probe) = ScriptedSource::evenly_spaced(frame_count, 40);
    let progress = Arc::new(RecordingProgress::default());
    let options = StepperOptions::new()
        .with_progress(progress.clone())
        .with_batch_size(batch_size);
    let stepper = FrameStepper::with_options(source, options).expect("Failed to bind stepper");
    (stepper, progress)
}

#[test]
fn table_build_reports_both_passes() {
    let (mut stepper, progress) = stepper_with_progress(10, 5);
    stepper.precalc_frame_times().expect("Failed to precalc");

    let events = progress.events();
    assert!(!events.is_empty());
    assert!(
        events
            .iter()
            .all(|event| event.operation == OperationType::FrameTableBuild)
    );

    // Two batches plus a closing report per pass.
    assert_eq!(events.len(), 6);

    let (first_pass, second_pass) = events.split_at(3);
    assert!(first_pass.iter().all(|event| event.total.is_none()));
    assert!(first_pass.iter().all(|event| event.percentage.is_none()));
    assert!(second_pass.iter().all(|event| event.total == Some(10)));

    let last = events.last().expect("Expected a closing report");
    assert_eq!(last.current, 10);
    let percentage = last.percentage.expect("Second pass knows its total");
    assert!((percentage - 100.0).abs() < 0.01);
    assert!(last.current_frame.is_none());
}

#[test]
fn batch_reports_carry_the_frame_position() {
    let (mut stepper, progress) = stepper_with_progress(10, 4);
    stepper.precalc_frame_times().expect("Failed to precalc");

    let first = &progress.events()[0];
    assert_eq!(first.current, 4);
    assert_eq!(first.current_frame, Some(3));
    assert_eq!(first.current_time.map(|time| time.0), Some(120));
}

#[test]
fn frame_count_reports_its_own_operation() {
    let (mut stepper, progress) = stepper_with_progress(3, 100);
    assert_eq!(stepper.frame_count().expect("Failed to count"), 3);

    let events = progress.events();
    assert_eq!(events.len(), 1, "only the closing report fits in one batch");
    assert_eq!(events[0].operation, OperationType::FrameCount);
    assert_eq!(events[0].current, 3);
    assert_eq!(events[0].total, None);
}

#[test]
fn last_frame_scan_reports_progress() {
    let (mut stepper, progress) = stepper_with_progress(4, 1);
    assert!(stepper.goto_last_frame().is_positioned());

    let events = progress.events();
    assert_eq!(events.len(), 5);
    assert!(
        events
            .iter()
            .all(|event| event.operation == OperationType::LastFrameScan)
    );
}

#[test]
fn cached_operations_report_nothing() {
    let (mut stepper, progress) = stepper_with_progress(6, 1);
    stepper.precalc_frame_times().expect("Failed to precalc");
    let reported = progress.events().len();

    let _ = stepper.goto_last_frame();
    let _ = stepper.frame_count().expect("Failed to count");
    assert_eq!(progress.events().len(), reported);
}

#[test]
fn failed_scan_still_closes_its_report() {
    let (source, probe) = ScriptedSource::evenly_spaced(10, 40);
    let progress = Arc::new(RecordingProgress::default());
    let options = StepperOptions::new().with_progress(progress.clone());
    let mut stepper = FrameStepper::with_options(source, options).expect("Failed to bind stepper");
    probe.fail_queries_from.set(Some(120));

    assert!(stepper.frame_count().is_err());
    let events = progress.events();
    let last = events.last().expect("Expected a closing report");
    assert_eq!(last.current, 4);
}

#[test]
fn zero_batch_size_is_clamped() {
    let options = StepperOptions::new().with_batch_size(0);
    assert_eq!(options.batch_size(), 1);
}
