//! FFmpeg-backed [`FrameSource`].
//!
//! [`VideoFile`] opens a media file, picks its best video stream and indexes
//! the presentation timestamp of every packet in that stream. The index
//! answers "where is the next frame" queries without decoding anything;
//! pixels are only decoded when [`FrameSource::decode_frame`] is called.
//!
//! Frame times are rebased so the stream's first frame is at
//! [`FrameTime::ZERO`], whatever PTS the container starts at.
//!
//! Decoding seeks to the keyframe before the target and decodes forward to
//! it. Reading frames in order reuses the running decoder instead of seeking
//! again, so a front-to-back walk decodes each packet once.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::{
    configuration::{FrameOutputOptions, PixelFormat},
    error::FrameStepError,
    metadata::VideoMetadata,
    presentation_index::PresentationIndex,
    source::{Direction, FrameSource, FrameTime},
};

/// A video file opened for frame stepping.
///
/// # Example
///
/// ```no_run
/// use framestep::{FrameStepper, VideoFile};
///
/// let video = VideoFile::open("input.mp4")?;
/// println!("{}x{}", video.metadata().width, video.metadata().height);
///
/// let mut stepper = FrameStepper::new(video)?;
/// let first = stepper.read()?;
/// first.save("first.png")?;
/// # Ok::<(), framestep::FrameStepError>(())
/// ```
pub struct VideoFile {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: Option<(ScalingContext, (Pixel, u32, u32))>,
    video_stream_index: usize,
    time_base: Rational,
    index: PresentationIndex,
    /// Position in `index` of the frame under the cursor.
    cursor: usize,
    duration: i64,
    output: FrameOutputOptions,
    output_width: u32,
    output_height: u32,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    /// Stream timestamp of the last frame received from the decoder since the last seek.
    last_decoded: Option<i64>,
    /// The most recent image handed out, keyed by its frame time.
    last_image: Option<(FrameTime, DynamicImage)>,
    eof_sent: bool,
    metadata: VideoMetadata,
    file_path: PathBuf,
}

impl std::fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFile")
            .field("file_path", &self.file_path)
            .field("metadata", &self.metadata)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a video file with default output options (RGB8, source size).
    ///
    /// # Errors
    ///
    /// - [`FrameStepError::FileOpen`] if FFmpeg cannot open the file.
    /// - [`FrameStepError::NoVideoStream`] if there is no video stream.
    /// - [`FrameStepError::NoVideoFrames`] if the video stream is empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FrameStepError> {
        Self::open_with_options(path, FrameOutputOptions::default())
    }

    /// Open a video file, decoding frames according to `output`.
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        output: FrameOutputOptions,
    ) -> Result<Self, FrameStepError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| FrameStepError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let mut input_context =
            ffmpeg_next::format::input(&path).map_err(|error| FrameStepError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let (video_stream_index, time_base, stream_duration, frames_per_second, decoder) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(FrameStepError::NoVideoStream)?;

            let rate = stream.avg_frame_rate();
            let frames_per_second = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            };

            let decoder = CodecContext::from_parameters(stream.parameters())?
                .decoder()
                .video()?;

            (
                stream.index(),
                stream.time_base(),
                stream.duration(),
                frames_per_second,
                decoder,
            )
        };

        let duration = if stream_duration > 0 {
            stream_duration
        } else {
            crate::utilities::seek_timestamp_to_ticks(input_context.duration().max(0), time_base)
        };

        let index = PresentationIndex::from_timestamps(collect_packet_timestamps(
            &mut input_context,
            video_stream_index,
        )?)
        .ok_or(FrameStepError::NoVideoFrames)?;
        log::debug!(
            "Indexed {} frames in stream {video_stream_index} (time base {time_base}, first PTS {})",
            index.frame_count(),
            index.origin()
        );

        let (output_width, output_height) =
            output.resolve_dimensions(decoder.width(), decoder.height());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            indexed_frame_count: index.frame_count() as u64,
            start_timestamp: index.origin(),
            codec: decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            time_base,
            stream_index: video_stream_index,
            duration: FrameTime(duration).to_duration(time_base),
            format: input_context.format().name().to_string(),
        };

        Ok(Self {
            input_context,
            decoder,
            scaler: None,
            video_stream_index,
            time_base,
            index,
            cursor: 0,
            duration,
            output,
            output_width,
            output_height,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            last_decoded: None,
            last_image: None,
            eof_sent: false,
            metadata,
            file_path,
        })
    }

    /// Metadata gathered when the file was opened.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Output options frames are decoded with.
    pub fn output_options(&self) -> &FrameOutputOptions {
        &self.output
    }

    fn cursor_time(&self) -> Result<FrameTime, FrameStepError> {
        self.index
            .time_at(self.cursor)
            .ok_or(FrameStepError::NoVideoFrames)
    }

    /// `true` if the cursor is on the frame right after the last one
    /// decoded, so the running decoder can just continue.
    fn continues_from_last(&self) -> bool {
        let previous = self
            .cursor
            .checked_sub(1)
            .and_then(|index| self.index.time_at(index))
            .map(|time| self.index.to_stream(time));
        self.last_decoded.is_some() && self.last_decoded == previous
    }

    /// Seek to the keyframe at or before `target` and reset the decoder.
    fn seek_before(&mut self, target: FrameTime) -> Result<(), FrameStepError> {
        let seek_timestamp =
            crate::utilities::ticks_to_seek_timestamp(self.index.to_stream(target), self.time_base);

        if let Err(error) = self.input_context.seek(seek_timestamp, ..seek_timestamp) {
            log::debug!("Bounded seek to {seek_timestamp} failed ({error}), retrying unbounded");
            self.input_context
                .seek(seek_timestamp, ..)
                .map_err(|error| FrameStepError::SeekFailed {
                    time: target,
                    reason: error.to_string(),
                })?;
        }

        self.decoder.flush();
        self.last_decoded = None;
        self.eof_sent = false;
        Ok(())
    }

    /// Decode forward until the frame at `target` is in `decoded_frame`.
    ///
    /// Fails if the decoder skips past `target` without producing it.
    fn decode_until(&mut self, target: FrameTime) -> Result<(), FrameStepError> {
        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let Some(timestamp) = self
                    .decoded_frame
                    .timestamp()
                    .or_else(|| self.decoded_frame.pts())
                else {
                    continue;
                };
                self.last_decoded = Some(timestamp);
                match self.index.accept_decoded(target, timestamp) {
                    Ok(true) => return Ok(()),
                    Ok(false) => continue,
                    Err(error) => {
                        log::warn!("{error}");
                        return Err(error);
                    }
                }
            }

            if self.eof_sent {
                return Err(FrameStepError::VideoDecodeError(format!(
                    "no frame at {target} in the video stream"
                )));
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Scale `decoded_frame` into the configured output and wrap it as an image.
    fn convert_decoded_frame(&mut self) -> Result<DynamicImage, FrameStepError> {
        let source_key = (
            self.decoded_frame.format(),
            self.decoded_frame.width(),
            self.decoded_frame.height(),
        );

        // The decoder may switch formats or sizes mid-stream.
        let scaler = match self.scaler.take() {
            Some((scaler, key)) if key == source_key => scaler,
            _ => ScalingContext::get(
                source_key.0,
                source_key.1,
                source_key.2,
                self.output.pixel_format.to_ffmpeg_pixel(),
                self.output_width,
                self.output_height,
                ScalingFlags::BILINEAR,
            )?,
        };
        let (scaler, _) = self.scaler.insert((scaler, source_key));
        scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;

        let (width, height) = (self.output_width, self.output_height);
        let pixel_format = self.output.pixel_format;
        let buffer = crate::utilities::frame_to_buffer(
            &self.scaled_frame,
            width,
            height,
            pixel_format.bytes_per_pixel(),
        );

        let image = match pixel_format {
            PixelFormat::Rgb8 => {
                RgbImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8)
            }
            PixelFormat::Rgba8 => {
                RgbaImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgba8)
            }
            PixelFormat::Gray8 => {
                GrayImage::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8)
            }
        };

        image.ok_or_else(|| {
            FrameStepError::VideoDecodeError(format!(
                "decoded frame does not fit a {width}x{height} {pixel_format:?} image"
            ))
        })
    }
}

impl FrameSource for VideoFile {
    type Frame = DynamicImage;

    fn set_position(&mut self, time: FrameTime) -> Result<(), FrameStepError> {
        self.cursor = self.index.snap(time);
        Ok(())
    }

    fn position(&self) -> Result<FrameTime, FrameStepError> {
        self.cursor_time()
    }

    fn next_interesting_time(
        &mut self,
        from: FrameTime,
        direction: Direction,
    ) -> Result<Option<FrameTime>, FrameStepError> {
        Ok(self.index.next_after(from, direction))
    }

    fn decode_frame(&mut self) -> Result<DynamicImage, FrameStepError> {
        let target = self.cursor_time()?;

        if let Some((time, image)) = &self.last_image {
            if *time == target {
                return Ok(image.clone());
            }
        }

        if !self.continues_from_last() {
            self.seek_before(target)?;
        }
        self.decode_until(target)?;

        let image = self.convert_decoded_frame()?;
        self.last_image = Some((target, image.clone()));
        Ok(image)
    }

    fn duration(&self) -> FrameTime {
        FrameTime(self.duration)
    }

    fn time_base(&self) -> Rational {
        self.time_base
    }
}

/// Read every packet of `stream_index` and collect its timestamps.
///
/// Uses the PTS, or the DTS when a packet has none.
fn collect_packet_timestamps(
    input_context: &mut Input,
    stream_index: usize,
) -> Result<Vec<i64>, FrameStepError> {
    let mut times = Vec::new();
    let mut packet = Packet::empty();
    loop {
        match packet.read(input_context) {
            Ok(()) => {
                if packet.stream() != stream_index {
                    continue;
                }
                if let Some(timestamp) = packet.pts().or_else(|| packet.dts()) {
                    times.push(timestamp);
                }
            }
            Err(FfmpegError::Eof) => break,
            Err(error) => return Err(FrameStepError::from(error)),
        }
    }

    Ok(times)
}
