//! The image classifier.

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClassifierConfig;
use crate::error::{ClassifierError, Result};
use crate::pixel_buffer::PixelBuffer;
use crate::preprocess::{Preprocess, ResizePreprocessor};
use crate::provider::{ClassifierOutput, ModelProvider};

/// Best label for an image and the model's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePrediction {
    /// Predicted label; empty when the image could not be classified.
    pub label: String,

    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl ImagePrediction {
    /// Create a prediction. The confidence is clamped to `[0, 1]`; NaN
    /// becomes 0.0.
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// The prediction returned for images that could not be prepared.
    pub fn empty() -> Self {
        Self {
            label: String::new(),
            confidence: 0.0,
        }
    }

    /// Whether this is the empty prediction.
    pub fn is_empty(&self) -> bool {
        self.label.is_empty()
    }
}

/// Classifies decoded bitmaps with a lazily loaded model.
///
/// The model handle is created on the first prediction (or [`warm_up`]) and
/// reused for the lifetime of the classifier. Concurrent first calls share a
/// single load; a failed load is not cached.
///
/// [`warm_up`]: ImageClassifier::warm_up
pub struct ImageClassifier<P: ModelProvider> {
    provider: P,
    config: ClassifierConfig,
    preprocessor: Arc<dyn Preprocess>,
    model: OnceCell<P::Handle>,
}

impl<P: ModelProvider> ImageClassifier<P> {
    /// Create a classifier. Nothing is loaded until first use.
    pub fn new(provider: P, config: ClassifierConfig) -> Self {
        let preprocessor = Arc::new(ResizePreprocessor::from_config(&config));
        Self {
            provider,
            config,
            preprocessor,
            model: OnceCell::new(),
        }
    }

    /// Replace the preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn Preprocess>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Get the model provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Load the model now instead of on the first prediction.
    pub async fn warm_up(&self) -> Result<()> {
        self.model().await.map(|_| ())
    }

    /// Predict the best label for an image.
    ///
    /// Cancellation is checked once, before the model is touched. An image
    /// that cannot be preprocessed yields [`ImagePrediction::empty`].
    pub async fn predict(
        &self,
        image: DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<ImagePrediction> {
        let Some(output) = self.classify(image, cancel).await? else {
            return Ok(ImagePrediction::empty());
        };

        Ok(output
            .best()
            .map(|(label, confidence)| ImagePrediction::new(label, confidence))
            .unwrap_or_else(ImagePrediction::empty))
    }

    /// Predict the `k` most probable labels for an image.
    ///
    /// Returns an empty list when the image cannot be preprocessed.
    pub async fn predict_top_k(
        &self,
        image: DynamicImage,
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImagePrediction>> {
        let Some(output) = self.classify(image, cancel).await? else {
            return Ok(Vec::new());
        };

        Ok(output
            .ranked()
            .into_iter()
            .take(k)
            .map(|(label, confidence)| ImagePrediction::new(label, confidence))
            .collect())
    }

    async fn classify(
        &self,
        image: DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<Option<ClassifierOutput>> {
        if cancel.is_cancelled() {
            debug!("Prediction cancelled before start");
            return Err(ClassifierError::Cancelled);
        }

        let model = self.model().await?;

        let Some(input) = self.prepare(image).await else {
            return Ok(None);
        };

        let output = self
            .provider
            .infer(model, &input)
            .await
            .map_err(|e| ClassifierError::Inference(format!("{e:#}")))?;

        debug!(
            "Prediction: {:?} {:?}",
            output.top_label, output.probabilities
        );

        Ok(Some(output))
    }

    async fn model(&self) -> Result<&P::Handle> {
        self.model
            .get_or_try_init(|| async {
                info!("Loading classification model ({})", self.provider.name());
                match self.provider.load(&self.config).await {
                    Ok(handle) => {
                        info!("Classification model loaded");
                        Ok(handle)
                    }
                    Err(e) => {
                        warn!("Failed to load classification model: {e:#}");
                        Err(ClassifierError::ModelUnavailable {
                            reason: format!("{e:#}"),
                        })
                    }
                }
            })
            .await
    }

    async fn prepare(&self, image: DynamicImage) -> Option<PixelBuffer> {
        let preprocessor = Arc::clone(&self.preprocessor);
        match tokio::task::spawn_blocking(move || preprocessor.prepare(&image)).await {
            Ok(Ok(buffer)) => Some(buffer),
            Ok(Err(e)) => {
                warn!("Image preprocessing failed: {e}");
                None
            }
            Err(e) => {
                warn!("Image preprocessing task failed: {e}");
                None
            }
        }
    }
}
