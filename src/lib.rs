//! # framestep
//!
//! Frame-exact stepping through video files.
//!
//! Most playback APIs hand out frames from a timer that follows the wall
//! clock, so a consumer that is slower or faster than real time skips or
//! repeats frames. `framestep` has no clock. A [`FrameStepper`] moves one
//! decodable frame at a time, forward or backward, only when asked, and
//! always knows the exact zero-based number of the frame it is on.
//!
//! ## Quick Start
//!
//! ### Process every frame
//!
//! ```no_run
//! use framestep::{FrameStepper, VideoFile};
//!
//! let mut stepper = FrameStepper::new(VideoFile::open("input.mp4")?)?;
//! while !stepper.is_done() {
//!     let image = stepper.read()?;
//!     println!("frame {} is {}x{}", stepper.current_frame_number(), image.width(), image.height());
//!     let _ = stepper.step_forward();
//! }
//! # Ok::<(), framestep::FrameStepError>(())
//! ```
//!
//! ### Random access
//!
//! ```no_run
//! use framestep::{FrameStepper, StepOutcome, VideoFile};
//!
//! let mut stepper = FrameStepper::new(VideoFile::open("input.mp4")?)?;
//! let frame_count = stepper.precalc_frame_times()?;
//!
//! match stepper.goto_frame(frame_count / 2) {
//!     StepOutcome::Positioned { time, .. } => println!("middle frame starts at {time}"),
//!     StepOutcome::BoundaryReached { .. } => unreachable!(),
//!     StepOutcome::DecoderError(error) => return Err(error),
//! }
//! stepper.read()?.save("middle.png")?;
//! # Ok::<(), framestep::FrameStepError>(())
//! ```
//!
//! ## Features
//!
//! - **Caller-driven stepping**: `step_forward`, `step_backward`, multi-frame
//!   steps that stop at either end, and seeks by frame number
//! - **Boundary handling**: running off either end is not an error; it sets
//!   [`FrameStepper::is_done`] and leaves the position unchanged
//! - **Distinguishable failures**: positioning calls return a
//!   [`StepOutcome`] that separates a boundary from a decoder failure
//! - **Frame table**: [`FrameStepper::precalc_frame_times`] scans once and
//!   makes every later seek a lookup
//! - **Pluggable decoders**: anything implementing [`FrameSource`]; FFmpeg
//!   support ships as [`VideoFile`]
//! - **Configurable output**: pixel format (RGB8, RGBA8, GRAY8) and target
//!   resolution with aspect ratio preservation
//! - **Progress reporting** for full-stream scans
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
pub mod error;
pub mod ffmpeg;
pub mod frame_table;
pub mod frames;
pub mod metadata;
pub mod outcome;
pub mod presentation_index;
pub mod progress;
pub mod source;
pub mod stepper;
mod utilities;
pub mod video_file;

pub use configuration::{FrameOutputOptions, PixelFormat, StepperOptions};
pub use error::FrameStepError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use frame_table::FrameTable;
pub use frames::{Frames, SteppedFrame};
pub use metadata::VideoMetadata;
pub use outcome::StepOutcome;
pub use presentation_index::PresentationIndex;
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use source::{Direction, FrameSource, FrameTime};
pub use stepper::FrameStepper;
pub use video_file::VideoFile;
