// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer definitions for the classifier IR.
//!
//! Each [`LayerDef`] describes a single stage of the network: its
//! computation, the fused ReLU / max-pool that follows it, the names and
//! shapes of its parameters, and its input and output activation shapes.
//! Weight data is **not** stored here, only names (keys into the weight
//! file). Weights are bound by the runtime.

use crate::ModelError;
use tensor_core::{conv2d_output_shape, linear_output_shape, max_pool2d_output_shape};
use tensor_core::{Conv2dParams, Shape};

/// The computation a layer performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerType {
    /// 2-D convolution with weight `[out, in, k, k]` and bias `[out]`.
    Conv2d(Conv2dParams),
    /// Dense transform with weight `[out, in]` and bias `[out]`; the input
    /// is flattened behind the batch dimension.
    Linear,
    /// Log-softmax over the class dimension. Has no parameters.
    LogSoftmax,
}

impl LayerType {
    /// Returns a human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conv2d(_) => "conv2d",
            Self::Linear => "linear",
            Self::LogSoftmax => "log_softmax",
        }
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conv2d(p) => write!(f, "conv2d(k={}, p={}, s={})", p.kernel_size, p.padding, p.stride),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Metadata describing a single layer in the model graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerDef {
    /// Unique identifier for this layer (e.g., `"conv1"`).
    pub name: String,
    /// The computation this layer performs.
    pub layer_type: LayerType,
    /// Index in the execution order (0-based).
    pub index: usize,
    /// Names of parameter tensors: `[weight, bias]`, or empty.
    pub weight_names: Vec<String>,
    /// Shapes of the parameter tensors (parallel to `weight_names`).
    pub weight_shapes: Vec<Shape>,
    /// Whether a ReLU follows the main computation.
    pub relu: bool,
    /// Window (and stride) of a max-pool applied after the ReLU, if any.
    pub pool: Option<usize>,
    /// Shape of the layer's input activation.
    pub input_shape: Shape,
    /// Shape of the layer's output activation, after ReLU and pooling.
    pub output_shape: Shape,
}

impl LayerDef {
    /// Builds a convolution layer, deriving its parameter and output shapes
    /// from `input_shape` (`[N, C, H, W]`).
    pub fn conv2d(
        name: &str,
        index: usize,
        input_shape: &Shape,
        out_channels: usize,
        params: Conv2dParams,
        relu: bool,
        pool: Option<usize>,
    ) -> Result<Self, ModelError> {
        let in_channels = input_shape.dim(1).ok_or_else(|| ModelError::InvalidLayer {
            layer: name.to_string(),
            detail: format!("convolution input must be [N, C, H, W], got {input_shape}"),
        })?;
        let mut layer = Self {
            name: name.to_string(),
            layer_type: LayerType::Conv2d(params),
            index,
            weight_names: vec![format!("{name}.weight"), format!("{name}.bias")],
            weight_shapes: vec![
                Shape::nchw(out_channels, in_channels, params.kernel_size, params.kernel_size),
                Shape::vector(out_channels),
            ],
            relu,
            pool,
            input_shape: input_shape.clone(),
            output_shape: Shape::new(vec![]),
        };
        layer.output_shape = layer.derive_output_shape()?;
        Ok(layer)
    }

    /// Builds a dense layer over the flattened features of `input_shape`.
    pub fn linear(
        name: &str,
        index: usize,
        input_shape: &Shape,
        out_features: usize,
        relu: bool,
    ) -> Result<Self, ModelError> {
        let in_features: usize = input_shape.dims().iter().skip(1).product();
        let mut layer = Self {
            name: name.to_string(),
            layer_type: LayerType::Linear,
            index,
            weight_names: vec![format!("{name}.weight"), format!("{name}.bias")],
            weight_shapes: vec![
                Shape::matrix(out_features, in_features),
                Shape::vector(out_features),
            ],
            relu,
            pool: None,
            input_shape: input_shape.clone(),
            output_shape: Shape::new(vec![]),
        };
        layer.output_shape = layer.derive_output_shape()?;
        Ok(layer)
    }

    /// Builds the parameter-free log-softmax head.
    pub fn log_softmax(index: usize, input_shape: &Shape) -> Self {
        Self {
            name: "log_softmax".to_string(),
            layer_type: LayerType::LogSoftmax,
            index,
            weight_names: Vec::new(),
            weight_shapes: Vec::new(),
            relu: false,
            pool: None,
            input_shape: input_shape.clone(),
            output_shape: input_shape.clone(),
        }
    }

    /// Recomputes the output shape from the input and parameter shapes.
    ///
    /// Used by the builders and by graph validation to catch declared
    /// shapes that the layer cannot actually produce.
    pub fn derive_output_shape(&self) -> Result<Shape, ModelError> {
        let invalid = |detail: String| ModelError::InvalidLayer {
            layer: self.name.clone(),
            detail,
        };

        match self.layer_type {
            LayerType::LogSoftmax => {
                if !self.weight_shapes.is_empty() {
                    return Err(invalid("log_softmax takes no parameters".into()));
                }
                Ok(self.input_shape.clone())
            }
            LayerType::Conv2d(params) => {
                let [weight, bias] = self.parameter_shapes()?;
                let conv = conv2d_output_shape(&self.input_shape, weight, params)
                    .map_err(|e| invalid(e.to_string()))?;
                check_bias(self, bias, weight)?;
                match self.pool {
                    Some(window) => max_pool2d_output_shape(&conv, window, window)
                        .map_err(|e| invalid(e.to_string())),
                    None => Ok(conv),
                }
            }
            LayerType::Linear => {
                let [weight, bias] = self.parameter_shapes()?;
                if self.pool.is_some() {
                    return Err(invalid("pooling is only defined for convolutions".into()));
                }
                let out = linear_output_shape(&self.input_shape, weight)
                    .map_err(|e| invalid(e.to_string()))?;
                check_bias(self, bias, weight)?;
                Ok(out)
            }
        }
    }

    /// Returns `true` if the layer owns a weight/bias pair.
    pub fn has_parameters(&self) -> bool {
        !self.weight_names.is_empty()
    }

    /// Name of the weight tensor, if the layer has parameters.
    pub fn weight_name(&self) -> Option<&str> {
        self.weight_names.first().map(String::as_str)
    }

    /// Name of the bias tensor, if the layer has parameters.
    pub fn bias_name(&self) -> Option<&str> {
        self.weight_names.get(1).map(String::as_str)
    }

    /// Number of scalar parameters (weights + biases).
    pub fn parameter_count(&self) -> usize {
        self.weight_shapes.iter().map(Shape::num_elements).sum()
    }

    /// Memory required for this layer's parameters in bytes.
    pub fn estimated_weight_bytes(&self) -> usize {
        self.weight_shapes.iter().map(Shape::size_bytes).sum()
    }

    /// Memory required for this layer's input and output activations in
    /// bytes; both are live while the layer runs.
    pub fn estimated_activation_bytes(&self) -> usize {
        self.input_shape.size_bytes() + self.output_shape.size_bytes()
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        let mut ops = self.layer_type.to_string();
        if self.relu {
            ops.push_str(" + relu");
        }
        if let Some(window) = self.pool {
            ops.push_str(&format!(" + max_pool({window})"));
        }
        format!(
            "[{}] {} ({}) {} -> {}, {} params",
            self.index,
            self.name,
            ops,
            self.input_shape,
            self.output_shape,
            self.parameter_count(),
        )
    }

    fn parameter_shapes(&self) -> Result<[&Shape; 2], ModelError> {
        match (self.weight_names.len(), self.weight_shapes.as_slice()) {
            (2, [weight, bias]) => Ok([weight, bias]),
            _ => Err(ModelError::InvalidLayer {
                layer: self.name.clone(),
                detail: format!(
                    "expected a weight and a bias, got {} names and {} shapes",
                    self.weight_names.len(),
                    self.weight_shapes.len(),
                ),
            }),
        }
    }
}

fn check_bias(layer: &LayerDef, bias: &Shape, weight: &Shape) -> Result<(), ModelError> {
    let out = weight.dim(0).unwrap_or(0);
    if bias.dims() != [out] {
        return Err(ModelError::InvalidLayer {
            layer: layer.name.clone(),
            detail: format!("bias shape {bias} does not match {out} outputs"),
        });
    }
    Ok(())
}
