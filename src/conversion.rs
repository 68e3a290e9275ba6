//! Internal pixel helpers.
//!
//! Turning decoded images into FFmpeg frames and settling on a frame size
//! the encoder will accept.

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};
use image::DynamicImage;
use image::imageops::FilterType;

/// Round a frame size down to even dimensions (minimum 2x2).
///
/// Chroma-subsampled 4:2:0 formats cannot represent odd widths or heights.
pub fn even_dimensions(width: u32, height: u32) -> (u32, u32) {
    ((width & !1).max(2), (height & !1).max(2))
}

/// Copy an image into a new RGB24 FFmpeg frame of `width` x `height`.
///
/// The image is resized first when its size differs from the target.
pub fn image_to_rgb_frame(image: &DynamicImage, width: u32, height: u32) -> VideoFrame {
    let rgb = if image.width() != width || image.height() != height {
        image
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgb8()
    } else {
        image.to_rgb8()
    };

    let mut frame = VideoFrame::new(Pixel::RGB24, width, height);
    let stride = frame.stride(0);
    let row_len = (width as usize) * 3;
    let data = frame.data_mut(0);
    for (row, pixels) in rgb.as_raw().chunks_exact(row_len).enumerate() {
        let start = row * stride;
        data[start..start + row_len].copy_from_slice(pixels);
    }
    frame
}
