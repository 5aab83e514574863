//! Error types for the `framestep` crate.
//!
//! [`FrameStepError`] is returned by every fallible operation that is not a
//! positioning call. Positioning calls never return `Err`; a decoder failure
//! during a step or seek is reported inside
//! [`StepOutcome::DecoderError`](crate::StepOutcome::DecoderError) instead.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::source::FrameTime;

/// The unified error type for all `framestep` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameStepError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The video stream exists but carries no frames.
    #[error("Video stream contains no frames")]
    NoVideoFrames,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The source could not be moved to the requested position.
    #[error("Failed to seek to {time}: {reason}")]
    SeekFailed {
        /// Requested position.
        time: FrameTime,
        /// Underlying reason the seek failed.
        reason: String,
    },

    /// The two passes of a frame-table build disagreed on the frame count.
    #[error("Frame table scan is inconsistent: first pass counted {first_pass} frames, second pass {second_pass}")]
    InconsistentScan {
        /// Frames counted by the sizing pass.
        first_pass: u64,
        /// Frames visited by the recording pass.
        second_pass: u64,
    },

    /// A frame table was empty or its times were not strictly ascending.
    #[error("Invalid frame table: {0}")]
    InvalidFrameTable(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for FrameStepError {
    fn from(error: FfmpegError) -> Self {
        FrameStepError::FfmpegError(error.to_string())
    }
}
