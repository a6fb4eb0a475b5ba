//! Bitmap preprocessing.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::config::ClassifierConfig;
use crate::error::PreprocessError;
use crate::pixel_buffer::{PixelBuffer, PixelFormat};

/// Turns a decoded bitmap into the pixel buffer a model consumes.
///
/// Runs on a blocking thread, so implementations may do heavy work.
pub trait Preprocess: Send + Sync {
    /// Prepare the model input for `image`.
    fn prepare(&self, image: &DynamicImage) -> Result<PixelBuffer, PreprocessError>;
}

/// Stretches the image to a fixed geometry and packs it as 32-bit pixels.
///
/// The aspect ratio is not preserved.
#[derive(Debug, Clone, Copy)]
pub struct ResizePreprocessor {
    width: u32,
    height: u32,
    format: PixelFormat,
    filter: FilterType,
}

impl ResizePreprocessor {
    /// Create a preprocessor for the given output geometry and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            filter: FilterType::Triangle,
        }
    }

    /// Build a preprocessor from the classifier configuration.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.input_width, config.input_height, config.pixel_format)
            .with_filter(config.filter.into())
    }

    /// Set the resampling filter.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl Preprocess for ResizePreprocessor {
    fn prepare(&self, image: &DynamicImage) -> Result<PixelBuffer, PreprocessError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PreprocessError::EmptySource {
                width: image.width(),
                height: image.height(),
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(PreprocessError::InvalidTarget {
                width: self.width,
                height: self.height,
            });
        }

        let resized = image.resize_exact(self.width, self.height, self.filter);
        PixelBuffer::from_rgb(&resized.to_rgb8(), self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stretches_to_target_geometry() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 120, Rgb([0, 128, 255])));
        let buffer = ResizePreprocessor::from_config(&ClassifierConfig::default())
            .prepare(&image)
            .unwrap();

        assert_eq!((buffer.width(), buffer.height()), (224, 224));
        assert_eq!(buffer.format(), PixelFormat::Argb32);
        assert_eq!(buffer.as_bytes().len(), 224 * 224 * 4);
        assert_eq!(buffer.rgb(100, 100), Some([0, 128, 255]));
    }

    #[test]
    fn test_single_pixel_image_is_upscaled() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([9, 9, 9])));
        let buffer = ResizePreprocessor::new(4, 2, PixelFormat::Bgra32)
            .with_filter(FilterType::Nearest)
            .prepare(&image)
            .unwrap();

        assert_eq!(buffer.pixel(3, 1), Some([9, 9, 9, 0xFF]));
    }

    #[test]
    fn test_empty_source_fails() {
        let image = DynamicImage::new_rgb8(0, 0);
        let err = ResizePreprocessor::new(224, 224, PixelFormat::Argb32)
            .prepare(&image)
            .unwrap_err();
        assert!(matches!(err, PreprocessError::EmptySource { .. }));
    }

    #[test]
    fn test_zero_target_fails() {
        let image = DynamicImage::new_rgb8(8, 8);
        let err = ResizePreprocessor::new(0, 224, PixelFormat::Argb32)
            .prepare(&image)
            .unwrap_err();
        assert_eq!(err, PreprocessError::InvalidTarget {
            width: 0,
            height: 224
        });
    }
}
