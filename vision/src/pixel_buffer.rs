//! Raw pixel buffers handed to the model provider.
//!
//! A [`PixelBuffer`] is the contract between preprocessing and inference:
//!
//! - `width` × `height` pixels, rows stored top to bottom
//! - 4 bytes per pixel, 8 bits per channel, no row padding
//!   (`bytes_per_row == width * 4`)
//! - channel order given by [`PixelFormat`]; the alpha byte is ignored by
//!   consumers and always written as `0xFF`

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;

/// Channel order of a 32-bit pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Alpha, red, green, blue.
    #[default]
    Argb32,
    /// Blue, green, red, alpha.
    Bgra32,
}

impl PixelFormat {
    /// Bytes used by one pixel.
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Pack an RGB triple in this channel order.
    pub fn pack(self, [r, g, b]: [u8; 3]) -> [u8; 4] {
        match self {
            PixelFormat::Argb32 => [0xFF, r, g, b],
            PixelFormat::Bgra32 => [b, g, r, 0xFF],
        }
    }

    /// Recover the RGB triple from a packed pixel.
    pub fn unpack(self, pixel: [u8; 4]) -> [u8; 3] {
        match self {
            PixelFormat::Argb32 => [pixel[1], pixel[2], pixel[3]],
            PixelFormat::Bgra32 => [pixel[2], pixel[1], pixel[0]],
        }
    }
}

/// A packed 32-bit pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Pack an RGB image into the given format.
    pub fn from_rgb(image: &RgbImage, format: PixelFormat) -> Result<Self, PreprocessError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PreprocessError::EmptySource { width, height });
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(PixelFormat::BYTES_PER_PIXEL))
            .ok_or(PreprocessError::BufferTooLarge { width, height })?;

        let mut data = Vec::with_capacity(len);
        for pixel in image.pixels() {
            data.extend_from_slice(&format.pack(pixel.0));
        }

        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel order.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row.
    pub fn bytes_per_row(&self) -> usize {
        self.width as usize * PixelFormat::BYTES_PER_PIXEL
    }

    /// Raw bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The packed pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = y as usize * self.bytes_per_row() + x as usize * PixelFormat::BYTES_PER_PIXEL;
        let bytes = self.data.get(offset..offset + PixelFormat::BYTES_PER_PIXEL)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// The RGB value at `(x, y)`.
    pub fn rgb(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.pixel(x, y).map(|p| self.format.unpack(p))
    }
}
