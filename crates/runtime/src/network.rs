// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Forward evaluation of a validated graph with bound weights.
//!
//! ```text
//! input ─▶ [conv2d | linear] ─▶ relu? ─▶ max_pool? ─▶ … ─▶ log_softmax
//! ```
//!
//! Each layer consumes the previous activation by value and allocates a
//! fresh output, so no buffer outlives the layer that reads it and nothing
//! is shared between concurrent calls except the read-only weights.

use crate::{InferenceMetrics, RuntimeError, WeightStore};
use model_ir::{graph::Validated, LayerDef, LayerType, ModelGraph};
use std::sync::Arc;
use std::time::Instant;
use tensor_core::{Shape, Tensor, TensorError};

/// A validated graph wired to its parameters.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    graph: Arc<ModelGraph<Validated>>,
    weights: Arc<WeightStore>,
}

impl NetworkGraph {
    /// Binds `weights` to `graph`.
    ///
    /// # Errors
    /// [`RuntimeError::WeightLoadError`] if the store lacks a tensor the
    /// graph declares or holds it in another shape.
    pub fn new(graph: ModelGraph<Validated>, weights: Arc<WeightStore>) -> Result<Self, RuntimeError> {
        weights.covers(&graph)?;
        tracing::debug!("network: bound {} tensors to '{}'", weights.num_tensors(), graph.name);
        Ok(Self {
            graph: Arc::new(graph),
            weights,
        })
    }

    /// The graph being evaluated.
    pub fn graph(&self) -> &ModelGraph<Validated> {
        &self.graph
    }

    /// The shared parameter store.
    pub fn weights(&self) -> &Arc<WeightStore> {
        &self.weights
    }

    /// Runs every layer in order and returns the final activation.
    pub fn forward(&self, input: Tensor) -> Result<Tensor, RuntimeError> {
        self.forward_profiled(input, None)
    }

    /// Like [`forward`](Self::forward), additionally recording each layer's
    /// compute time and output shape into `metrics`.
    pub fn forward_profiled(
        &self,
        input: Tensor,
        mut metrics: Option<&mut InferenceMetrics>,
    ) -> Result<Tensor, RuntimeError> {
        let mut activation = input;
        for layer in self.graph.iter_layers() {
            let start = Instant::now();
            activation = self.run_layer(layer, activation)?;
            let elapsed = start.elapsed();

            tracing::debug!(
                "layer {} '{}' -> {} in {:.3}ms",
                layer.index,
                layer.name,
                activation.shape(),
                elapsed.as_secs_f64() * 1000.0,
            );
            if let Some(m) = metrics.as_deref_mut() {
                m.record_layer(layer.name.clone(), activation.shape().clone(), elapsed);
            }
        }
        Ok(activation)
    }

    /// Executes one layer: main op, then the fused ReLU and max-pool.
    fn run_layer(&self, layer: &LayerDef, input: Tensor) -> Result<Tensor, RuntimeError> {
        let exec = |source: TensorError| RuntimeError::ExecutionError {
            layer: layer.name.clone(),
            source,
        };

        check_activation("layer input", &layer.input_shape, input.shape()).map_err(exec)?;

        let mut output = match layer.layer_type {
            LayerType::Conv2d(params) => {
                let p = self.weights.parameters(layer)?;
                let shape = tensor_core::conv2d_output_shape(input.shape(), p.weight.shape(), params)
                    .map_err(exec)?;
                let mut out = Tensor::zeros(shape);
                tensor_core::conv2d(&input.view(), &p.weight, &p.bias, params, &mut out)
                    .map_err(exec)?;
                out
            }
            LayerType::Linear => {
                let p = self.weights.parameters(layer)?;
                let shape = tensor_core::linear_output_shape(input.shape(), p.weight.shape())
                    .map_err(exec)?;
                let mut out = Tensor::zeros(shape);
                tensor_core::linear(&input.view(), &p.weight, &p.bias, &mut out).map_err(exec)?;
                out
            }
            LayerType::LogSoftmax => {
                let mut out = Tensor::zeros(input.shape().clone());
                tensor_core::log_softmax(&input.view(), &mut out).map_err(exec)?;
                out
            }
        };
        drop(input);

        if layer.relu {
            tensor_core::relu_inplace(&mut output);
        }
        if let Some(window) = layer.pool {
            let shape = tensor_core::max_pool2d_output_shape(output.shape(), window, window)
                .map_err(exec)?;
            let mut pooled = Tensor::zeros(shape);
            tensor_core::max_pool2d(&output.view(), window, window, &mut pooled).map_err(exec)?;
            output = pooled;
        }

        check_activation("layer output", &layer.output_shape, output.shape()).map_err(exec)?;
        Ok(output)
    }
}

fn check_activation(op: &'static str, expected: &Shape, actual: &Shape) -> Result<(), TensorError> {
    if expected != actual {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: expected.clone(),
            rhs: actual.clone(),
        });
    }
    Ok(())
}
