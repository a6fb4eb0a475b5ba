//! Configuration for the image classifier.

use std::path::PathBuf;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::INPUT_SIZE;
use crate::pixel_buffer::PixelFormat;

/// Configuration for the image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Location of the model, interpreted by the model provider.
    pub model_path: Option<PathBuf>,

    /// Width of the model input.
    pub input_width: u32,

    /// Height of the model input.
    pub input_height: u32,

    /// Pixel layout the model consumes.
    pub pixel_format: PixelFormat,

    /// Resampling filter used when stretching to the input geometry.
    pub filter: ResizeFilter,
}

impl ClassifierConfig {
    /// Create a configuration for the model at `path`.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Self::default()
        }
    }

    /// Set the model input geometry.
    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_width = width;
        self.input_height = height;
        self
    }

    /// Set the pixel format.
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Set the resampling filter.
    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_width: INPUT_SIZE,
            input_height: INPUT_SIZE,
            pixel_format: PixelFormat::Argb32,
            filter: ResizeFilter::Triangle,
        }
    }
}

/// Resampling filter for resizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    /// Bicubic.
    CatmullRom,
    /// Lanczos with window 3.
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}
