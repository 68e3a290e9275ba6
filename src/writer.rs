//! Movie writers: append still images as timed frames.
//!
//! [`MovieWriter`] is the narrow capability the sequence builder needs from a
//! multimedia backend. [`FfmpegMovieWriter`] implements it on top of FFmpeg,
//! inferring the container from the output extension (`.mov`, `.mp4`,
//! `.mkv`, `.avi`, ...).
//!
//! # Example
//!
//! ```no_run
//! use imgseq::{EncoderOptions, FfmpegMovieWriter, FrameDuration, ImageSequenceError, MovieWriter};
//!
//! let mut writer = FfmpegMovieWriter::create("movie.mov", &EncoderOptions::default())?;
//! let frame = image::open("frame0000.png")?;
//! writer.append_frame(&frame, FrameDuration::default())?;
//! writer.flush()?;
//! writer.finish()?;
//! # Ok::<(), ImageSequenceError>(())
//! ```

use std::path::{Path, PathBuf};
use std::ptr;

use ffmpeg_next::codec::{Flags as CodecFlags, Id, context::Context as CodecContext, encoder};
use ffmpeg_next::format::{Flags as FormatFlags, Pixel, context::Output};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Dictionary, Packet, Rational};
use image::DynamicImage;

use crate::conversion::{even_dimensions, image_to_rgb_frame};
use crate::duration::FrameDuration;
use crate::error::ImageSequenceError;
use crate::ffmpeg;

/// Bits per pixel per frame used to pick a bitrate when none is configured
/// for codecs without a constant-quality mode.
const DEFAULT_BITS_PER_PIXEL: f64 = 0.2;

/// Lower bound for the derived bitrate.
const MIN_DEFAULT_BITRATE: usize = 400_000;

/// Muxers that support flushing a movie fragment on request.
const FRAGMENTED_MUXERS: [&str; 2] = ["mov", "mp4"];

/// Empty `moov` up front, then a self-contained fragment per flush.
const FRAGMENT_MOVFLAGS: &str = "frag_custom+empty_moov+default_base_moof";

/// Sink for timed still frames.
///
/// Implementations own their output exclusively. `finish` must be safe to
/// call more than once; only the first call finalizes.
pub trait MovieWriter {
    /// Append `image` as the next frame, shown for `duration`.
    fn append_frame(
        &mut self,
        image: &DynamicImage,
        duration: FrameDuration,
    ) -> Result<(), ImageSequenceError>;

    /// Push everything appended so far to durable storage.
    fn flush(&mut self) -> Result<(), ImageSequenceError>;

    /// Finalize the output. Further appends fail.
    fn finish(&mut self) -> Result<(), ImageSequenceError>;

    /// Number of frames appended so far.
    fn frames_written(&self) -> u64;
}

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// MPEG-4 Part 2. Built into every FFmpeg, accepted by QuickTime.
    #[default]
    Mpeg4,
    /// H.264 / AVC (needs an H.264 encoder such as libx264).
    H264,
    /// H.265 / HEVC (needs an HEVC encoder such as libx265).
    H265,
    /// Motion JPEG: every frame an independent JPEG image.
    Mjpeg,
}

impl VideoCodec {
    fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::Mpeg4 => Id::MPEG4,
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
            VideoCodec::Mjpeg => Id::MJPEG,
        }
    }

    fn input_pixel_format(self) -> Pixel {
        match self {
            VideoCodec::Mjpeg => Pixel::YUVJ420P,
            _ => Pixel::YUV420P,
        }
    }

    /// Whether the encoder understands a `crf` quality option.
    fn supports_crf(self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mpeg4" | "mp4v" => Ok(VideoCodec::Mpeg4),
            "h264" | "avc" | "avc1" => Ok(VideoCodec::H264),
            "h265" | "hevc" => Ok(VideoCodec::H265),
            "mjpeg" | "jpeg" => Ok(VideoCodec::Mjpeg),
            other => Err(format!("unsupported codec: {other} (mpeg4|h264|h265|mjpeg)")),
        }
    }
}

/// Encoding attributes applied uniformly to every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Codec to use. Default is MPEG-4 Part 2.
    pub codec: VideoCodec,
    /// Output width. If `None`, taken from the first frame.
    pub width: Option<u32>,
    /// Output height. If `None`, taken from the first frame.
    pub height: Option<u32>,
    /// Constant Rate Factor (0-51, lower is better). H.264/H.265 only.
    pub crf: Option<u32>,
    /// Bitrate in bits per second. Overrides CRF when set.
    pub bitrate: Option<usize>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            codec: VideoCodec::default(),
            width: None,
            height: None,
            crf: Some(23),
            bitrate: None,
        }
    }
}

impl EncoderOptions {
    /// Set the codec.
    pub fn codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the output resolution.
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the CRF quality value.
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Set the target bitrate in bits per second.
    pub fn bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    fn validate(&self) -> Result<(), ImageSequenceError> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if width == 0 || height == 0 => {
                Err(ImageSequenceError::InvalidResolution { width, height })
            }
            (Some(0), None) => Err(ImageSequenceError::InvalidResolution { width: 0, height: 0 }),
            (None, Some(0)) => Err(ImageSequenceError::InvalidResolution { width: 0, height: 0 }),
            _ => Ok(()),
        }
    }

    /// Final frame size for a first image of `width` x `height`.
    pub(crate) fn resolve_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let (width, height) = match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let h = (height as f64 * w as f64 / width.max(1) as f64).round() as u32;
                (w, h)
            }
            (None, Some(h)) => {
                let w = (width as f64 * h as f64 / height.max(1) as f64).round() as u32;
                (w, h)
            }
            (None, None) => (width, height),
        };
        even_dimensions(width, height)
    }

    fn effective_bitrate(&self, width: u32, height: u32, duration: FrameDuration) -> Option<usize> {
        if self.bitrate.is_some() {
            return self.bitrate;
        }
        if self.codec.supports_crf() && self.crf.is_some() {
            return None;
        }
        let bits = width as f64 * height as f64 * duration.frames_per_second() * DEFAULT_BITS_PER_PIXEL;
        Some((bits as usize).max(MIN_DEFAULT_BITRATE))
    }
}

/// Encoder, scaler and stream bookkeeping, set up on the first frame.
struct EncodingState {
    encoder: encoder::video::Encoder,
    scaler: ScalingContext,
    stream_index: usize,
    stream_time_base: Rational,
    encoder_time_base: Rational,
    width: u32,
    height: u32,
    next_pts: i64,
    last_step: i64,
}

/// FFmpeg-backed [`MovieWriter`].
///
/// [`create`](FfmpegMovieWriter::create) opens the destination file
/// immediately, so creation failures surface before any frame work. The
/// encoder is configured from the first appended frame; if that fails the
/// writer stays broken and every later append returns the same
/// [`ImageSequenceError::EncoderSetup`]. Dropping an unfinished writer
/// finalizes it.
///
/// QuickTime and MP4 outputs are written as fragmented movies with one
/// fragment per [`flush`](MovieWriter::flush), so the frames flushed so far
/// stay playable if the process dies before [`finish`](MovieWriter::finish).
pub struct FfmpegMovieWriter {
    path: PathBuf,
    options: EncoderOptions,
    output: Output,
    state: Option<EncodingState>,
    setup_error: Option<String>,
    fragmented: bool,
    frames_written: u64,
    finished: bool,
}

impl FfmpegMovieWriter {
    /// Open `path` for writing, replacing any existing file.
    ///
    /// # Errors
    ///
    /// - [`ImageSequenceError::Creation`] if the container cannot be created
    ///   (missing directory, permissions, unknown extension, ...).
    /// - [`ImageSequenceError::InvalidResolution`] for a zero output dimension.
    pub fn create<P: AsRef<Path>>(
        path: P,
        options: &EncoderOptions,
    ) -> Result<Self, ImageSequenceError> {
        let path = path.as_ref();
        options.validate()?;
        ffmpeg::initialize()?;

        let output = ffmpeg_next::format::output(path).map_err(|e| ImageSequenceError::Creation {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let fragmented = FRAGMENTED_MUXERS.contains(&output.format().name());
        log::debug!(
            "Opened {:?} for writing ({}{})",
            path,
            output.format().name(),
            if fragmented { ", fragmented" } else { "" },
        );

        Ok(Self {
            path: path.to_path_buf(),
            options: options.clone(),
            output,
            state: None,
            setup_error: None,
            fragmented,
            frames_written: 0,
            finished: false,
        })
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add the video stream, open the encoder and write the container header.
    fn start(
        &mut self,
        first: &DynamicImage,
        duration: FrameDuration,
    ) -> Result<EncodingState, ImageSequenceError> {
        let (width, height) = self.options.resolve_dimensions(first.width(), first.height());
        let codec = self.options.codec;
        let codec_id = codec.to_codec_id();
        let target_pixel = codec.input_pixel_format();
        let encoder_time_base = duration.time_base();

        let encoder_codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
            ImageSequenceError::EncoderSetup(format!("codec {codec_id:?} not available"))
        })?;

        let needs_global_header = self
            .output
            .format()
            .flags()
            .contains(FormatFlags::GLOBAL_HEADER);

        let mut stream = self
            .output
            .add_stream(encoder_codec)
            .map_err(|e| ImageSequenceError::EncoderSetup(format!("cannot add stream: {e}")))?;
        let stream_index = stream.index();
        stream.set_time_base(encoder_time_base);

        let mut video = CodecContext::new_with_codec(encoder_codec)
            .encoder()
            .video()
            .map_err(|e| ImageSequenceError::EncoderSetup(format!("cannot create encoder: {e}")))?;

        video.set_width(width);
        video.set_height(height);
        video.set_format(target_pixel);
        video.set_time_base(encoder_time_base);
        video.set_frame_rate(Some(duration.frame_rate()));
        video.set_max_b_frames(0);

        if let Some(bitrate) = self.options.effective_bitrate(width, height, duration) {
            video.set_bit_rate(bitrate);
        }

        if needs_global_header {
            video.set_flags(CodecFlags::GLOBAL_HEADER);
        }

        let mut attributes = Dictionary::new();
        match self.options.crf {
            Some(crf) if codec.supports_crf() && self.options.bitrate.is_none() => {
                attributes.set("crf", &crf.to_string());
            }
            Some(_) if !codec.supports_crf() => {
                log::debug!("{codec:?} has no CRF mode; using bitrate control");
            }
            _ => {}
        }

        let encoder = video
            .open_as_with(encoder_codec, attributes)
            .map_err(|e| ImageSequenceError::EncoderSetup(format!("cannot open encoder: {e}")))?;

        stream.set_parameters(&encoder);

        let mut muxer_options = Dictionary::new();
        if self.fragmented {
            muxer_options.set("movflags", FRAGMENT_MOVFLAGS);
        }
        self.output
            .write_header_with(muxer_options)
            .map_err(|e| ImageSequenceError::EncoderSetup(format!("cannot write header: {e}")))?;

        // The muxer may pick its own time base while writing the header.
        let stream_time_base = self
            .output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| ImageSequenceError::EncoderSetup("video stream vanished".to_string()))?;

        let scaler = ScalingContext::get(
            Pixel::RGB24,
            width,
            height,
            target_pixel,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|e| ImageSequenceError::EncoderSetup(format!("cannot create scaler: {e}")))?;

        log::info!(
            "Encoding {}x{} {:?} into {:?} at {} s/frame",
            width, height, codec, self.path, duration,
        );

        Ok(EncodingState {
            encoder,
            scaler,
            stream_index,
            stream_time_base,
            encoder_time_base,
            width,
            height,
            next_pts: 0,
            last_step: 1,
        })
    }

    /// Move every packet the encoder has ready into the container.
    fn drain_packets(&mut self, packet_duration: i64) -> Result<(), ImageSequenceError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };

        let mut packet = Packet::empty();
        while state.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(state.stream_index);
            if packet.duration() <= 0 {
                packet.set_duration(packet_duration);
            }
            packet.rescale_ts(state.encoder_time_base, state.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| ImageSequenceError::FfmpegError(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }
}

impl FfmpegMovieWriter {
    /// Close the current movie fragment so it is complete on disk.
    ///
    /// Only valid between `write_header` and `write_trailer`.
    fn cut_fragment(&mut self) -> Result<(), ImageSequenceError> {
        // SAFETY: the header has been written and the trailer has not, so the
        // muxer accepts a null packet as a flush request.
        let status = unsafe {
            let context = self.output.as_mut_ptr();
            let queued = ffmpeg_sys_next::av_interleaved_write_frame(context, ptr::null_mut());
            if queued < 0 {
                queued
            } else {
                ffmpeg_sys_next::av_write_frame(context, ptr::null_mut())
            }
        };
        if status < 0 {
            return Err(ImageSequenceError::FfmpegError(format!(
                "cannot flush movie fragment: {}",
                ffmpeg_next::Error::from(status)
            )));
        }
        Ok(())
    }
}

/// Number of encoder time-base units covered by `duration`.
fn duration_in_time_base(duration: FrameDuration, time_base: Rational) -> i64 {
    let numerator = duration.value() as i128 * time_base.denominator() as i128;
    let denominator = duration.scale() as i128 * time_base.numerator().max(1) as i128;
    (numerator / denominator) as i64
}

impl MovieWriter for FfmpegMovieWriter {
    fn append_frame(
        &mut self,
        image: &DynamicImage,
        duration: FrameDuration,
    ) -> Result<(), ImageSequenceError> {
        if self.finished {
            return Err(ImageSequenceError::FfmpegError(
                "movie already finalized".to_string(),
            ));
        }

        if let Some(reason) = &self.setup_error {
            return Err(ImageSequenceError::EncoderSetup(reason.clone()));
        }

        if self.state.is_none() {
            match self.start(image, duration) {
                Ok(state) => self.state = Some(state),
                Err(error) => {
                    // A half-built stream cannot be retried on the same output.
                    self.setup_error = Some(match &error {
                        ImageSequenceError::EncoderSetup(reason) => reason.clone(),
                        other => other.to_string(),
                    });
                    return Err(error);
                }
            }
        }

        let packet_duration = {
            let Some(state) = self.state.as_mut() else {
                return Err(ImageSequenceError::FfmpegError("encoder not initialized".to_string()));
            };

            let step = duration_in_time_base(duration, state.encoder_time_base);
            if step <= 0 {
                return Err(ImageSequenceError::FfmpegError(format!(
                    "frame duration {duration} is shorter than the movie timescale"
                )));
            }

            let rgb = image_to_rgb_frame(image, state.width, state.height);
            let mut frame = VideoFrame::empty();
            state
                .scaler
                .run(&rgb, &mut frame)
                .map_err(|e| ImageSequenceError::FfmpegError(format!("scaling failed: {e}")))?;

            frame.set_pts(Some(state.next_pts));
            state.next_pts += step;
            state.last_step = step;

            state
                .encoder
                .send_frame(&frame)
                .map_err(|e| ImageSequenceError::FfmpegError(format!("send_frame failed: {e}")))?;
            step
        };

        self.drain_packets(packet_duration)?;
        self.frames_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ImageSequenceError> {
        if self.fragmented && self.state.is_some() && !self.finished {
            self.cut_fragment()?;
        }

        // SAFETY: `pb` belongs to the output context we own exclusively and
        // stays valid until the context is dropped.
        unsafe {
            let pb = (*self.output.as_mut_ptr()).pb;
            if pb.is_null() {
                return Ok(());
            }
            ffmpeg_sys_next::avio_flush(pb);
            let status = (*pb).error;
            if status < 0 {
                return Err(ImageSequenceError::from(ffmpeg_next::Error::from(status)));
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ImageSequenceError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let Some(state) = self.state.as_mut() else {
            log::warn!("No frames were appended to {:?}; leaving it empty", self.path);
            return Ok(());
        };

        let packet_duration = state.last_step;

        state
            .encoder
            .send_eof()
            .map_err(|e| ImageSequenceError::FfmpegError(format!("send_eof failed: {e}")))?;
        self.drain_packets(packet_duration)?;

        self.output
            .write_trailer()
            .map_err(|e| ImageSequenceError::FfmpegError(format!("cannot write trailer: {e}")))?;
        self.flush()?;

        log::info!("Finalized {:?} with {} frame(s)", self.path, self.frames_written);
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Drop for FfmpegMovieWriter {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("Movie writer for {:?} dropped without finish; finalizing", self.path);
            if let Err(error) = self.finish() {
                log::warn!("Finalizing {:?} failed: {error}", self.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_names() {
        assert_eq!("mp4v".parse(), Ok(VideoCodec::Mpeg4));
        assert_eq!("HEVC".parse(), Ok(VideoCodec::H265));
        assert_eq!("jpeg".parse(), Ok(VideoCodec::Mjpeg));
        assert!("vp9".parse::<VideoCodec>().is_err());
    }

    #[test]
    fn resolution_follows_first_frame_and_stays_even() {
        let options = EncoderOptions::default();
        assert_eq!(options.resolve_dimensions(641, 481), (640, 480));
    }

    #[test]
    fn single_dimension_keeps_aspect_ratio() {
        let options = EncoderOptions {
            width: Some(320),
            ..EncoderOptions::default()
        };
        assert_eq!(options.resolve_dimensions(640, 480), (320, 240));
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let options = EncoderOptions::default().resolution(0, 480);
        assert!(matches!(
            options.validate(),
            Err(ImageSequenceError::InvalidResolution { width: 0, height: 480 })
        ));
    }

    #[test]
    fn bitrate_is_derived_for_mpeg4_only() {
        let duration = FrameDuration::default();
        let mpeg4 = EncoderOptions::default();
        assert!(mpeg4.effective_bitrate(640, 480, duration).unwrap() >= MIN_DEFAULT_BITRATE);

        let h264 = EncoderOptions::default().codec(VideoCodec::H264);
        assert_eq!(h264.effective_bitrate(640, 480, duration), None);

        let fixed = EncoderOptions::default().codec(VideoCodec::H264).bitrate(1_000_000);
        assert_eq!(fixed.effective_bitrate(640, 480, duration), Some(1_000_000));
    }

    #[test]
    fn durations_convert_to_time_base_units() {
        let fifteenth = FrameDuration::new(1, 15).unwrap();
        assert_eq!(duration_in_time_base(fifteenth, Rational::new(1, 15)), 1);
        assert_eq!(duration_in_time_base(fifteenth, Rational::new(1, 600)), 40);
        assert_eq!(duration_in_time_base(fifteenth, Rational::new(1, 10)), 0);
    }
}
