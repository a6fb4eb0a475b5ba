//! Model providers.
//!
//! The classifier never touches a model format directly. A provider knows how
//! to build a model handle from a [`ClassifierConfig`] and how to run that
//! handle on a [`PixelBuffer`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::pixel_buffer::PixelBuffer;

/// Raw output of a classification model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    /// Label the model reports as its best guess, if it reports one.
    pub top_label: Option<String>,

    /// Probability per label.
    pub probabilities: HashMap<String, f32>,
}

impl ClassifierOutput {
    /// Create an output from a label → probability map.
    pub fn new(probabilities: HashMap<String, f32>) -> Self {
        Self {
            top_label: None,
            probabilities,
        }
    }

    /// Set the reported best label.
    pub fn with_top_label(mut self, label: impl Into<String>) -> Self {
        self.top_label = Some(label.into());
        self
    }

    /// The best label and its probability.
    ///
    /// Uses the reported top label when present, otherwise the most probable
    /// label (ties go to the alphabetically first). A reported label missing
    /// from the map scores 0.0, as does a NaN probability.
    pub fn best(&self) -> Option<(&str, f32)> {
        let label = match self.top_label.as_deref() {
            Some(label) => label,
            None => self.ranked().into_iter().next()?.0,
        };
        let confidence = self
            .probabilities
            .get(label)
            .copied()
            .map_or(0.0, sanitize);

        Some((label, confidence))
    }

    /// All labels, most probable first. NaN probabilities count as 0.0.
    pub fn ranked(&self) -> Vec<(&str, f32)> {
        let mut ranked: Vec<(&str, f32)> = self
            .probabilities
            .iter()
            .map(|(label, p)| (label.as_str(), sanitize(*p)))
            .collect();
        ranked.sort_by(|(la, pa), (lb, pb)| pb.total_cmp(pa).then_with(|| la.cmp(lb)));
        ranked
    }
}

fn sanitize(probability: f32) -> f32 {
    if probability.is_nan() { 0.0 } else { probability }
}

/// Trait for image classification model providers.
#[async_trait]
pub trait ModelProvider: Send + Sync + 'static {
    /// Loaded model handle.
    type Handle: Send + Sync + 'static;

    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Build a model handle. Called at most once at a time per classifier.
    async fn load(&self, config: &ClassifierConfig) -> anyhow::Result<Self::Handle>;

    /// Run the model on a prepared input.
    async fn infer(
        &self,
        handle: &Self::Handle,
        input: &PixelBuffer,
    ) -> anyhow::Result<ClassifierOutput>;
}
