//! Video stream metadata.
//!
//! [`VideoMetadata`] is gathered once when a [`VideoFile`](crate::VideoFile)
//! is opened and cached for its lifetime.

use std::time::Duration;

use ffmpeg_next::Rational;

/// Metadata for the video stream a [`VideoFile`](crate::VideoFile) steps through.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second as declared by the container. Only an
    /// estimate for variable-frame-rate streams.
    pub frames_per_second: f64,
    /// Number of distinct presentation timestamps found in the stream.
    pub indexed_frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Stream PTS of the first frame. Frame times are offsets from it.
    pub start_timestamp: i64,
    /// Time base of the stream's [`FrameTime`](crate::FrameTime) values.
    pub time_base: Rational,
    /// Index of the stream inside the container.
    pub stream_index: usize,
    /// Total stream duration.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
}
