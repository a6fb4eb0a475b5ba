//! Integration tests for the image classifier.
//!
//! A counting model provider stands in for a real model so the tests can
//! observe how often the model is loaded and what it is fed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use pretty_assertions::assert_eq;

use photosearch_vision::{
    CancellationToken, ClassifierConfig, ClassifierError, ClassifierOutput, ImageClassifier,
    ImagePrediction, ModelProvider, PixelBuffer, PixelFormat, Preprocess, PreprocessError,
};

struct FakeModel;

#[derive(Default)]
struct CountingProvider {
    loads: AtomicUsize,
    inferences: AtomicUsize,
    failing_loads: AtomicUsize,
    fail_inference: bool,
    inputs: Mutex<Vec<(u32, u32, PixelFormat)>>,
    output: ClassifierOutput,
}

impl CountingProvider {
    fn new(output: ClassifierOutput) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }

    fn failing_first_loads(self, count: usize) -> Self {
        self.failing_loads.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl ModelProvider for CountingProvider {
    type Handle = FakeModel;

    fn name(&self) -> &str {
        "counting"
    }

    async fn load(&self, _config: &ClassifierConfig) -> anyhow::Result<FakeModel> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        if self
            .failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("model file missing");
        }
        Ok(FakeModel)
    }

    async fn infer(
        &self,
        _handle: &FakeModel,
        input: &PixelBuffer,
    ) -> anyhow::Result<ClassifierOutput> {
        self.inferences.fetch_add(1, Ordering::SeqCst);
        self.inputs
            .lock()
            .unwrap()
            .push((input.width(), input.height(), input.format()));

        if self.fail_inference {
            anyhow::bail!("tensor shape mismatch");
        }
        Ok(self.output.clone())
    }
}

/// Rejects images smaller than 2x2.
struct MinimumSizePreprocessor;

impl Preprocess for MinimumSizePreprocessor {
    fn prepare(&self, image: &DynamicImage) -> Result<PixelBuffer, PreprocessError> {
        let (width, height) = image.dimensions();
        if width < 2 || height < 2 {
            return Err(PreprocessError::Unsupported(format!(
                "{width}x{height} is too small"
            )));
        }
        PixelBuffer::from_rgb(&image.to_rgb8(), PixelFormat::Argb32)
    }
}

fn dog_output() -> ClassifierOutput {
    let probabilities: HashMap<String, f32> = [
        ("golden retriever".to_string(), 0.82),
        ("labrador retriever".to_string(), 0.11),
        ("tennis ball".to_string(), 0.04),
    ]
    .into_iter()
    .collect();
    ClassifierOutput::new(probabilities).with_top_label("golden retriever")
}

fn photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([120, 90, 40])))
}

fn classifier(provider: CountingProvider) -> ImageClassifier<CountingProvider> {
    ImageClassifier::new(provider, ClassifierConfig::default())
}

#[tokio::test]
async fn test_predicts_top_label() {
    let classifier = classifier(CountingProvider::new(dog_output()));

    let prediction = classifier
        .predict(photo(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prediction, ImagePrediction::new("golden retriever", 0.82));
    assert!(classifier.is_loaded());
}

#[tokio::test]
async fn test_concurrent_first_calls_load_model_once() {
    let classifier = classifier(CountingProvider::new(dog_output()));
    let token = CancellationToken::new();

    let (first, second) = tokio::join!(
        classifier.predict(photo(), &token),
        classifier.predict(photo(), &token)
    );

    assert_eq!(first.unwrap().label, "golden retriever");
    assert_eq!(second.unwrap().label, "golden retriever");
    assert_eq!(classifier.provider().loads.load(Ordering::SeqCst), 1);
    assert_eq!(classifier.provider().inferences.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_tasks_share_one_load() {
    let classifier = Arc::new(classifier(CountingProvider::new(dog_output())));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let classifier = Arc::clone(&classifier);
            tokio::spawn(async move {
                classifier
                    .predict(photo(), &CancellationToken::new())
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
    assert_eq!(classifier.provider().loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_does_no_work() {
    let classifier = classifier(CountingProvider::new(dog_output()));
    let token = CancellationToken::new();
    token.cancel();

    let result = classifier.predict(photo(), &token).await;

    assert!(matches!(result, Err(ClassifierError::Cancelled)));
    assert_eq!(classifier.provider().loads.load(Ordering::SeqCst), 0);
    assert!(!classifier.is_loaded());
}

#[tokio::test]
async fn test_failed_preprocessing_returns_empty_prediction() {
    let classifier = classifier(CountingProvider::new(dog_output()))
        .with_preprocessor(Arc::new(MinimumSizePreprocessor));
    let tiny = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 255, 255])));

    let prediction = classifier
        .predict(tiny, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prediction, ImagePrediction::new("", 0.0));
    assert_eq!(classifier.provider().inferences.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_bitmap_returns_empty_prediction() {
    let classifier = classifier(CountingProvider::new(dog_output()));

    let prediction = classifier
        .predict(DynamicImage::new_rgb8(0, 0), &CancellationToken::new())
        .await
        .unwrap();

    assert!(prediction.is_empty());
    assert_eq!(prediction.confidence, 0.0);
}

#[tokio::test]
async fn test_model_unavailable_is_not_cached() {
    let classifier = classifier(CountingProvider::new(dog_output()).failing_first_loads(1));
    let token = CancellationToken::new();

    let first = classifier.predict(photo(), &token).await;
    match first {
        Err(ClassifierError::ModelUnavailable { reason }) => {
            assert!(reason.contains("model file missing"));
        }
        other => panic!("expected ModelUnavailable, got {other:?}"),
    }
    assert!(!classifier.is_loaded());

    let second = classifier.predict(photo(), &token).await.unwrap();
    assert_eq!(second.label, "golden retriever");
    assert_eq!(classifier.provider().loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_model_receives_configured_geometry() {
    let provider = CountingProvider::new(dog_output());
    let config = ClassifierConfig::default()
        .with_input_size(299, 299)
        .with_pixel_format(PixelFormat::Bgra32);
    let classifier = ImageClassifier::new(provider, config);

    classifier.warm_up().await.unwrap();
    classifier
        .predict(photo(), &CancellationToken::new())
        .await
        .unwrap();

    let inputs = classifier.provider().inputs.lock().unwrap().clone();
    assert_eq!(inputs, vec![(299, 299, PixelFormat::Bgra32)]);
    assert_eq!(classifier.provider().loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_top_label_missing_from_probabilities_scores_zero() {
    let output = ClassifierOutput::default().with_top_label("lakeside");
    let classifier = classifier(CountingProvider::new(output));

    let prediction = classifier
        .predict(photo(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prediction, ImagePrediction::new("lakeside", 0.0));
}

#[tokio::test]
async fn test_inference_failure_is_reported() {
    let provider = CountingProvider {
        fail_inference: true,
        ..CountingProvider::new(dog_output())
    };
    let classifier = classifier(provider);

    let result = classifier.predict(photo(), &CancellationToken::new()).await;
    assert!(matches!(result, Err(ClassifierError::Inference(_))));
}

#[tokio::test]
async fn test_predict_top_k() {
    let classifier = classifier(CountingProvider::new(dog_output()));

    let labels: Vec<String> = classifier
        .predict_top_k(photo(), 2, &CancellationToken::new())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.label)
        .collect();

    assert_eq!(labels, vec!["golden retriever", "labrador retriever"]);
}
