//! Step through a video one frame at a time and save a few of them.
//!
//! Usage:
//!   cargo run --example step_through -- <input_file> [every]

use std::error::Error;

use framestep::{FrameStepper, StepOutcome, VideoFile};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next().unwrap_or_else(|| "input.mp4".to_string());
    let every: u64 = args.next().map(|value| value.parse()).transpose()?.unwrap_or(30).max(1);

    println!("Opening {input_path}...");
    let video = VideoFile::open(&input_path)?;
    let metadata = video.metadata();
    println!(
        "Video: {}x{}, {:.2} fps, {} indexed frames, codec {}",
        metadata.width,
        metadata.height,
        metadata.frames_per_second,
        metadata.indexed_frame_count,
        metadata.codec,
    );

    let mut stepper = FrameStepper::new(video)?;

    // Forward, saving every Nth frame.
    let mut saved = 0;
    loop {
        let frame_number = stepper.current_frame_number();
        if frame_number % every == 0 {
            let filename = format!("step_{frame_number:06}.png");
            stepper.read()?.save(&filename)?;
            saved += 1;
        }

        match stepper.step_forward() {
            StepOutcome::Positioned { .. } => {}
            StepOutcome::BoundaryReached { frame_number, time } => {
                println!("Reached the last frame: {frame_number} at {time}");
                break;
            }
            StepOutcome::DecoderError(error) => return Err(error.into()),
        }
    }
    println!("Saved {saved} frames");

    // And back again, without decoding.
    let mut steps_back = 0;
    while stepper.step_backward().into_result()?.is_positioned() {
        steps_back += 1;
    }
    println!(
        "Stepped back {steps_back} frames to frame {}",
        stepper.current_frame_number()
    );

    println!("Done!");
    Ok(())
}
