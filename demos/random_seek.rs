//! Build a frame table once, then jump around by frame number.
//!
//! Usage:
//!   cargo run --example random_seek -- <input_file>

use std::{error::Error, sync::Arc};

use framestep::{
    FrameStepper, ProgressCallback, ProgressInfo, StepperOptions, VideoFile,
};

struct PrintProgress;

impl ProgressCallback for PrintProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        match info.percentage {
            Some(percentage) => println!("  {:?}: {percentage:.0}%", info.operation),
            None => println!("  {:?}: {} frames", info.operation, info.current),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mp4".to_string());

    let options = StepperOptions::new()
        .with_progress(Arc::new(PrintProgress))
        .with_batch_size(100);
    let mut stepper = FrameStepper::with_options(VideoFile::open(&input_path)?, options)?;

    println!("Building frame table...");
    let frame_count = stepper.precalc_frame_times()?;
    println!("{frame_count} frames");

    let targets = [frame_count / 2, frame_count / 4, frame_count - 1, 0, frame_count];
    for target in targets {
        let outcome = stepper.goto_frame(target).into_result()?;
        if outcome.is_boundary() {
            println!("Frame {target} is out of range, still at {}", stepper.current_frame_number());
            continue;
        }

        let filename = format!("seek_{target:06}.png");
        stepper.read()?.save(&filename)?;
        println!(
            "Frame {target} at {:.3}s -> {filename}",
            stepper.current_timestamp().as_secs_f64()
        );
    }

    if let Some(table) = stepper.frame_table() {
        let durations = table.frame_durations(stepper.source().metadata().time_base);
        if let (Some(shortest), Some(longest)) = (
            durations.iter().copied().reduce(f64::min),
            durations.iter().copied().reduce(f64::max),
        ) {
            println!("Frame durations: {shortest:.4}s to {longest:.4}s");
        }
    }

    println!("Done!");
    Ok(())
}
