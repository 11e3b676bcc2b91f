// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The classification service: preprocess → network → label + confidence.
//!
//! An [`InferenceService`] is built once at startup and then shared by
//! reference (or behind an `Arc`) across every request. Each call to
//! [`InferenceService::infer`] is independent: it allocates its own tensors
//! and only reads the shared weights, so calls may run on any number of
//! threads at once.

use crate::{
    ImagePreprocessor, InferenceError, InferenceMetrics, NetworkGraph, RuntimeConfig,
    RuntimeError, WeightStore,
};
use model_ir::architecture::{self, NUM_CLASSES};
use std::sync::Arc;
use std::time::Instant;
use tensor_core::{Shape, Tensor, TensorError};

// ── Labels ─────────────────────────────────────────────────────

/// The two diagnostic classes, in network output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Label {
    /// Output index 0.
    #[serde(rename = "NORMAL")]
    Normal,
    /// Output index 1.
    #[serde(rename = "PNEUMONIA")]
    Pneumonia,
}

impl Label {
    /// All labels, indexed by network output position.
    pub const ALL: [Label; NUM_CLASSES] = [Label::Normal, Label::Pneumonia];

    /// Returns the label for an output index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position of this label in the network output.
    pub fn index(self) -> usize {
        match self {
            Self::Normal => 0,
            Self::Pneumonia => 1,
        }
    }

    /// Returns the wire name (`"NORMAL"` / `"PNEUMONIA"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Pneumonia => "PNEUMONIA",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Results ────────────────────────────────────────────────────

/// The outcome of classifying one image.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassificationResult {
    /// The label with the highest probability (lower index on ties).
    pub label: Label,
    /// Winning probability as a percentage rounded to two decimals.
    pub confidence: f64,
    /// Probability of each label, indexed like [`Label::ALL`].
    pub probabilities: [f32; NUM_CLASSES],
}

impl ClassificationResult {
    /// Builds a result from a probability vector.
    pub fn from_probabilities(probabilities: [f32; NUM_CLASSES]) -> Self {
        let mut best = 0;
        for (i, &p) in probabilities.iter().enumerate().skip(1) {
            if p > probabilities[best] {
                best = i;
            }
        }
        let label = Label::ALL[best];
        Self {
            label,
            confidence: to_percent(probabilities[best]),
            probabilities,
        }
    }

    /// Probability assigned to `label`.
    pub fn probability(&self, label: Label) -> f32 {
        self.probabilities[label.index()]
    }

    /// Converts into the JSON body served to clients.
    pub fn to_response(&self) -> PredictionResponse {
        PredictionResponse {
            prediction: self.label,
            confidence: format_percent(self.confidence),
            probabilities: LabelPercentages {
                normal: format_percent(to_percent(self.probability(Label::Normal))),
                pneumonia: format_percent(to_percent(self.probability(Label::Pneumonia))),
            },
        }
    }
}

/// Response body:
/// `{"prediction": "PNEUMONIA", "confidence": "97.31%", "probabilities": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PredictionResponse {
    pub prediction: Label,
    pub confidence: String,
    pub probabilities: LabelPercentages,
}

/// Formatted percentage per label.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelPercentages {
    #[serde(rename = "NORMAL")]
    pub normal: String,
    #[serde(rename = "PNEUMONIA")]
    pub pneumonia: String,
}

/// `p` in `[0, 1]` as a percentage rounded to two decimals.
///
/// Rounds the exact binary value with ties to even, so `0.53125` becomes
/// `53.12` and the two label percentages of a pair still sum to `100.00`.
fn to_percent(p: f32) -> f64 {
    let percent = f64::from(p) * 100.0;
    format!("{percent:.2}").parse().unwrap_or(percent)
}

fn format_percent(percent: f64) -> String {
    format!("{percent:.2}%")
}

// ── Service ────────────────────────────────────────────────────

/// Classifies chest X-ray images.
#[derive(Debug, Clone)]
pub struct InferenceService {
    preprocessor: ImagePreprocessor,
    network: NetworkGraph,
    enable_profiling: bool,
}

impl InferenceService {
    /// Wraps a bound network.
    ///
    /// # Errors
    /// [`RuntimeError::ModelError`] if the network does not take the
    /// preprocessor's `[1, 3, 64, 64]` tensor or does not end in one
    /// log-probability per label.
    pub fn new(network: NetworkGraph) -> Result<Self, RuntimeError> {
        let preprocessor = ImagePreprocessor::new();
        let graph = network.graph();
        let expected_output = Shape::matrix(1, NUM_CLASSES);
        if graph.input_shape() != &preprocessor.output_shape()
            || graph.output_shape() != &expected_output
        {
            return Err(model_ir::ModelError::InvalidGraph(format!(
                "classifier must map {} to {expected_output}, graph maps {} to {}",
                preprocessor.output_shape(),
                graph.input_shape(),
                graph.output_shape(),
            ))
            .into());
        }

        Ok(Self {
            preprocessor,
            network,
            enable_profiling: true,
        })
    }

    /// Loads the weight file named by `config` into the fixed architecture.
    ///
    /// Called once at startup; any error here means the service must not
    /// start.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let graph = architecture::xray_classifier()?;
        tracing::info!("{}", graph.summary());
        let weights = WeightStore::load(&config.weights_path, &graph)?;
        let network = NetworkGraph::new(graph, Arc::new(weights))?;
        let service = Self::new(network)?.with_profiling(config.enable_profiling);
        tracing::info!(
            "inference service ready (profiling {})",
            if service.enable_profiling { "on" } else { "off" }
        );
        Ok(service)
    }

    /// Enables or disables per-layer metrics in [`infer_with_metrics`](Self::infer_with_metrics).
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.enable_profiling = enabled;
        self
    }

    /// The bound network.
    pub fn network(&self) -> &NetworkGraph {
        &self.network
    }

    /// Classifies one encoded image.
    pub fn infer(&self, image_bytes: &[u8]) -> Result<ClassificationResult, InferenceError> {
        let input = self.preprocessor.preprocess(image_bytes)?;
        let output = self.network.forward(input)?;
        let result = classify(&output)?;
        tracing::debug!("classified as {} ({:.2}%)", result.label, result.confidence);
        Ok(result)
    }

    /// Classifies one encoded image and reports where the time went.
    ///
    /// Per-layer entries are only recorded when profiling is enabled; the
    /// preprocessing and total durations are always filled in.
    pub fn infer_with_metrics(
        &self,
        image_bytes: &[u8],
    ) -> Result<(ClassificationResult, InferenceMetrics), InferenceError> {
        let start = Instant::now();
        let mut metrics = InferenceMetrics::new();

        let input = self.preprocessor.preprocess(image_bytes)?;
        metrics.record_preprocess(start.elapsed());

        let output = if self.enable_profiling {
            self.network.forward_profiled(input, Some(&mut metrics))?
        } else {
            self.network.forward(input)?
        };
        let result = classify(&output)?;

        metrics.finalise(start.elapsed());
        tracing::debug!("{}", metrics.summary());
        Ok((result, metrics))
    }
}

/// Turns the `[1, 2]` log-probabilities into a classification.
fn classify(log_probs: &Tensor) -> Result<ClassificationResult, RuntimeError> {
    let output_error = |source: TensorError| RuntimeError::ExecutionError {
        layer: "output".into(),
        source,
    };

    let values = log_probs.as_f32_slice();
    let &[normal, pneumonia] = values else {
        return Err(output_error(TensorError::ShapeMismatch {
            op: "classify",
            lhs: Shape::matrix(1, NUM_CLASSES),
            rhs: log_probs.shape().clone(),
        }));
    };

    let probabilities = [normal.exp(), pneumonia.exp()];
    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(output_error(TensorError::Numeric {
            op: "classify",
            detail: format!("non-finite probabilities {probabilities:?}"),
        }));
    }
    Ok(ClassificationResult::from_probabilities(probabilities))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order() {
        assert_eq!(Label::from_index(0), Some(Label::Normal));
        assert_eq!(Label::from_index(1), Some(Label::Pneumonia));
        assert_eq!(Label::from_index(2), None);
        for label in Label::ALL {
            assert_eq!(Label::ALL[label.index()], label);
        }
        assert_eq!(Label::Pneumonia.to_string(), "PNEUMONIA");
    }

    #[test]
    fn test_argmax_and_rounding() {
        let result = ClassificationResult::from_probabilities([0.026_9, 0.973_1]);
        assert_eq!(result.label, Label::Pneumonia);
        assert_eq!(result.confidence, 97.31);

        let result = ClassificationResult::from_probabilities([0.876_54, 0.123_46]);
        assert_eq!(result.label, Label::Normal);
        assert_eq!(result.confidence, 87.65);
    }

    #[test]
    fn test_rounding_ties_to_even() {
        let result = ClassificationResult::from_probabilities([0.468_75, 0.531_25]);
        assert_eq!(result.label, Label::Pneumonia);
        assert_eq!(result.confidence, 53.12);

        let response = result.to_response();
        assert_eq!(response.confidence, "53.12%");
        assert_eq!(response.probabilities.normal, "46.88%");
        assert_eq!(response.probabilities.pneumonia, "53.12%");

        let result = ClassificationResult::from_probabilities([0.406_25, 0.593_75]);
        assert_eq!(result.to_response().confidence, "59.38%");
    }

    #[test]
    fn test_tie_prefers_first_label() {
        let result = ClassificationResult::from_probabilities([0.5, 0.5]);
        assert_eq!(result.label, Label::Normal);
        assert_eq!(result.confidence, 50.0);
    }

    #[test]
    fn test_response_shape() {
        let result = ClassificationResult::from_probabilities([0.026_9, 0.973_1]);
        let json = serde_json::to_value(result.to_response()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prediction": "PNEUMONIA",
                "confidence": "97.31%",
                "probabilities": { "NORMAL": "2.69%", "PNEUMONIA": "97.31%" }
            })
        );
    }

    #[test]
    fn test_classify_rejects_bad_output() {
        let wrong = Tensor::zeros(Shape::matrix(1, 3));
        assert!(matches!(
            classify(&wrong),
            Err(RuntimeError::ExecutionError { source: TensorError::ShapeMismatch { .. }, .. })
        ));

        let overflow = Tensor::from_f32(Shape::matrix(1, 2), &[100.0, 0.0]).unwrap();
        assert!(matches!(
            classify(&overflow),
            Err(RuntimeError::ExecutionError { source: TensorError::Numeric { .. }, .. })
        ));
    }

    #[test]
    fn test_classify_exponentiates() {
        let log_probs =
            Tensor::from_f32(Shape::matrix(1, 2), &[0.25f32.ln(), 0.75f32.ln()]).unwrap();
        let result = classify(&log_probs).unwrap();
        assert_eq!(result.label, Label::Pneumonia);
        assert!((result.probability(Label::Pneumonia) - 0.75).abs() < 1e-6);
        assert_eq!(result.confidence, 75.0);
    }
}
