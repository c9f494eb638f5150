//! Image Probing
//!
//! The validator never looks at pixels itself; it asks an [`ImageProbe`] for
//! dimensions and frame count.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("not a WebP image")]
    NotWebp,

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("WebP decode failed: {0}")]
    Webp(#[from] image_webp::DecodingError),

    #[error("image read failed: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ImageProbe: Send + Sync {
    /// Decode an image of any supported format. Used for tray icons.
    fn probe_image(&self, bytes: &[u8]) -> Result<ImageInfo, ProbeError>;

    /// Decode a WebP image and report its frame count. Used for stickers.
    fn probe_webp(&self, bytes: &[u8]) -> Result<ImageInfo, ProbeError>;
}

/// Probe backed by the `image` and `image-webp` decoders.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodingProbe;

impl ImageProbe for DecodingProbe {
    fn probe_image(&self, bytes: &[u8]) -> Result<ImageInfo, ProbeError> {
        let decoded = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?;
        Ok(ImageInfo {
            width: decoded.width(),
            height: decoded.height(),
            frames: 1,
        })
    }

    fn probe_webp(&self, bytes: &[u8]) -> Result<ImageInfo, ProbeError> {
        if image::guess_format(bytes).ok() != Some(ImageFormat::WebP) {
            return Err(ProbeError::NotWebp);
        }

        let decoder = image_webp::WebPDecoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions();
        let frames = if decoder.is_animated() {
            decoder.num_frames().max(1)
        } else {
            1
        };

        // Headers can be fine while the bitstream is not.
        if frames == 1 {
            image::load_from_memory_with_format(bytes, ImageFormat::WebP)?;
        }

        Ok(ImageInfo { width, height, frames })
    }
}
