// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference profiling metrics.
//!
//! [`InferenceMetrics`] collects per-layer and aggregate timing for a single
//! classification: how long preprocessing took, how long each layer ran and
//! what it produced, and the wall-clock total.

use std::time::Duration;
use tensor_core::Shape;

/// Metrics for a single layer's execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LayerMetrics {
    /// Layer name.
    pub layer_name: String,
    /// Shape of the activation the layer produced.
    pub output_shape: Shape,
    /// Time spent executing the layer, including fused ReLU and pooling.
    pub compute_duration: Duration,
}

/// Aggregate metrics for a complete inference run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InferenceMetrics {
    /// Total wall-clock time for the inference run.
    pub total_duration: Duration,
    /// Time spent decoding, resizing and normalising the image.
    pub preprocess_duration: Duration,
    /// Total time spent in layer computation.
    pub total_compute_duration: Duration,
    /// Per-layer metrics, in execution order.
    pub layer_metrics: Vec<LayerMetrics>,
}

impl InferenceMetrics {
    /// Creates an empty metrics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the preprocessing time.
    pub fn record_preprocess(&mut self, duration: Duration) {
        self.preprocess_duration = duration;
    }

    /// Records metrics for a single layer.
    pub fn record_layer(&mut self, name: String, output_shape: Shape, compute: Duration) {
        self.total_compute_duration += compute;
        self.layer_metrics.push(LayerMetrics {
            layer_name: name,
            output_shape,
            compute_duration: compute,
        });
    }

    /// Finalises metrics with the total wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Returns the layer that took longest, if any were recorded.
    pub fn slowest_layer(&self) -> Option<&LayerMetrics> {
        self.layer_metrics.iter().max_by_key(|l| l.compute_duration)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let compute_pct = if self.total_duration.as_secs_f64() > 0.0 {
            (self.total_compute_duration.as_secs_f64() / self.total_duration.as_secs_f64())
                * 100.0
        } else {
            0.0
        };

        let mut s = format!(
            "Inference: {:.2}ms total, {:.2}ms preprocess, {:.2}ms compute ({:.0}%) over {} layers",
            self.total_duration.as_secs_f64() * 1000.0,
            self.preprocess_duration.as_secs_f64() * 1000.0,
            self.total_compute_duration.as_secs_f64() * 1000.0,
            compute_pct,
            self.layer_metrics.len(),
        );
        if let Some(slowest) = self.slowest_layer() {
            s.push_str(&format!(
                ", slowest '{}' {:.2}ms",
                slowest.layer_name,
                slowest.compute_duration.as_secs_f64() * 1000.0,
            ));
        }
        s
    }
}
