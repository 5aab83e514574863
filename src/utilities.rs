//! Internal utility functions.
//!
//! Pixel-data copying and time-base conversions shared by the FFmpeg
//! source and the public time types.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};
use ffmpeg_sys_next::AV_TIME_BASE;

/// Copy plane 0 of an FFmpeg frame into a tightly-packed buffer.
///
/// FFmpeg rows are often padded (stride > width × bytes per pixel); the
/// padding is dropped so the result fits [`image::ImageBuffer::from_raw`].
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let rows = height as usize;
    let data = video_frame.data(0);

    if stride == row_length {
        return data[..row_length * rows].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_length * rows);
    for row in data.chunks(stride).take(rows) {
        buffer.extend_from_slice(&row[..row_length]);
    }
    buffer
}

/// Ticks in `time_base` to seconds.
pub(crate) fn ticks_to_seconds(ticks: i64, time_base: Rational) -> f64 {
    ticks as f64 * time_base.numerator() as f64 / time_base.denominator().max(1) as f64
}

/// Ticks in `time_base` to AV_TIME_BASE units, as container-level seeks expect.
pub(crate) fn ticks_to_seek_timestamp(ticks: i64, time_base: Rational) -> i64 {
    (ticks_to_seconds(ticks, time_base) * AV_TIME_BASE as f64) as i64
}

/// AV_TIME_BASE units (e.g. a container duration) to ticks in `time_base`.
pub(crate) fn seek_timestamp_to_ticks(timestamp: i64, time_base: Rational) -> i64 {
    let seconds = timestamp as f64 / AV_TIME_BASE as f64;
    let numerator = time_base.numerator().max(1) as f64;
    (seconds * time_base.denominator() as f64 / numerator) as i64
}
