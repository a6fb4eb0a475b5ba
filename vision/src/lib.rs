//! # Vision
//!
//! Image classification for the photo search system. A pre-trained
//! classifier is consumed through the [`ModelProvider`] trait; this crate
//! owns everything around it:
//!
//! - **Lazy Loading**: the model is loaded on first use, exactly once
//! - **Preprocessing**: decoded bitmaps become fixed-geometry pixel buffers
//! - **Soft Failure**: malformed images yield an empty prediction
//! - **Cancellation**: callers may cancel before any model work starts
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Image Classifier                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DynamicImage ──► Preprocess ──► PixelBuffer ──► ModelProvider  │
//! │                                                       │         │
//! │                  OnceCell<Handle> ◄── load ───────────┤         │
//! │                                                       ▼         │
//! │                  ImagePrediction ◄── ClassifierOutput           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod pixel_buffer;
pub mod preprocess;
pub mod provider;

pub use classifier::{ImageClassifier, ImagePrediction};
pub use config::{ClassifierConfig, ResizeFilter};
pub use error::{ClassifierError, PreprocessError, Result};
pub use pixel_buffer::{PixelBuffer, PixelFormat};
pub use preprocess::{Preprocess, ResizePreprocessor};
pub use provider::{ClassifierOutput, ModelProvider};

// Re-exported so callers can cancel predictions without a direct dependency.
pub use tokio_util::sync::CancellationToken;

/// Input edge length expected by MobileNet-style classifiers.
pub const INPUT_SIZE: u32 = 224;
