//! Stepper and decoder configuration.
//!
//! [`StepperOptions`] carries the progress settings a
//! [`FrameStepper`](crate::FrameStepper) uses during full-stream scans.
//! [`FrameOutputOptions`] controls the pixel format and resolution of the
//! images a [`VideoFile`](crate::VideoFile) decodes.
//!
//! # Example
//!
//! ```no_run
//! use framestep::{FrameOutputOptions, PixelFormat, VideoFile};
//!
//! let output = FrameOutputOptions::default()
//!     .with_pixel_format(PixelFormat::Gray8)
//!     .with_resolution(Some(320), None);
//! let video = VideoFile::open_with_options("input.mp4", output)?;
//! # Ok::<(), framestep::FrameStepError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use ffmpeg_next::format::Pixel;

use crate::progress::{NoOpProgress, ProgressCallback};

/// Output pixel format for decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bpp). This is the default.
    #[default]
    Rgb8,
    /// 8-bit RGBA with opaque alpha (32 bpp).
    Rgba8,
    /// 8-bit grayscale (8 bpp).
    Gray8,
}

impl PixelFormat {
    pub(crate) fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Rgb8 => Pixel::RGB24,
            PixelFormat::Rgba8 => Pixel::RGBA,
            PixelFormat::Gray8 => Pixel::GRAY8,
        }
    }

    pub(crate) fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Pixel format and resolution of decoded frames.
///
/// With no dimensions set the source resolution is used. Setting one
/// dimension while `maintain_aspect_ratio` is on derives the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutputOptions {
    /// Output pixel format.
    pub pixel_format: PixelFormat,
    /// Target width. `None` keeps the source width.
    pub width: Option<u32>,
    /// Target height. `None` keeps the source height.
    pub height: Option<u32>,
    /// Derive the missing dimension from the source aspect ratio.
    pub maintain_aspect_ratio: bool,
}

impl Default for FrameOutputOptions {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Rgb8,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
        }
    }
}

impl FrameOutputOptions {
    /// Set the output pixel format.
    #[must_use]
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Set the output resolution. `None` keeps the source value.
    #[must_use]
    pub fn with_resolution(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Control aspect-ratio preservation when only one dimension is set.
    #[must_use]
    pub fn with_maintain_aspect_ratio(mut self, maintain: bool) -> Self {
        self.maintain_aspect_ratio = maintain;
        self
    }

    /// Resolve the final `(width, height)` for a source of the given size.
    pub fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(width), Some(height)) => (width, height),
            (Some(width), None) if self.maintain_aspect_ratio && source_width > 0 => {
                let scale = width as f64 / source_width as f64;
                (width, ((source_height as f64 * scale).round() as u32).max(1))
            }
            (Some(width), None) => (width, source_height),
            (None, Some(height)) if self.maintain_aspect_ratio && source_height > 0 => {
                let scale = height as f64 / source_height as f64;
                (((source_width as f64 * scale).round() as u32).max(1), height)
            }
            (None, Some(height)) => (source_width, height),
            (None, None) => (source_width, source_height),
        }
    }
}

/// Settings for a [`FrameStepper`](crate::FrameStepper).
///
/// A default-constructed value reports nothing.
#[derive(Clone)]
pub struct StepperOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
}

impl Debug for StepperOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StepperOptions")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for StepperOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl StepperOptions {
    /// Defaults: no progress callback, batch size 1.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Attach a progress callback for full-stream scans.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Fire the progress callback every `size` frames. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Configured batch size.
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }
}
