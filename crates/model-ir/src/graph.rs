// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: the classifier as an ordered chain of layers.
//!
//! # Type-State Pattern
//!
//! The graph transitions through states enforced at compile time:
//!
//! ```text
//! ModelGraph<Loaded>     : layers assembled, not yet checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated>  : shapes verified, ready to bind weights.
//! ```
//!
//! The runtime only accepts `ModelGraph<Validated>`, so a network can never
//! be wired to an unchecked layer chain. The marker types are `PhantomData`
//! (zero-sized).

use crate::{LayerDef, LayerType, ModelError};
use std::collections::HashSet;
use std::fmt;
use tensor_core::Shape;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been assembled but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── ModelGraph ─────────────────────────────────────────────────────

/// The complete model represented as an ordered sequence of layers.
///
/// Layers are fixed once the graph is built; a validated graph can only
/// be read through [`iter_layers`](ModelGraph::iter_layers) and
/// [`layer`](ModelGraph::layer):
///
/// ```compile_fail
/// let mut graph = model_ir::architecture::xray_classifier().unwrap();
/// graph.layers.clear();
/// ```
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    /// Human-readable model name.
    pub name: String,
    layers: Vec<LayerDef>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Creates a new graph in the `Loaded` state.
    pub fn new(name: String, layers: Vec<LayerDef>) -> Self {
        Self {
            name,
            layers,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The graph is non-empty.
    /// - Layer indices are consecutive starting from 0.
    /// - No layer has zero-element shapes.
    /// - Each layer's declared output shape is the one its input and
    ///   parameter shapes actually produce.
    /// - Each layer's output shape equals the next layer's input shape.
    /// - Parameter tensor names are unique.
    /// - Only the last layer may be a log-softmax.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::InvalidGraph(
                "model graph contains no layers".into(),
            ));
        }

        for (i, layer) in self.layers.iter().enumerate() {
            if layer.index != i {
                return Err(ModelError::InvalidLayer {
                    layer: layer.name.clone(),
                    detail: format!("expected index {i}, got {}", layer.index),
                });
            }
            if layer.input_shape.is_empty() || layer.output_shape.is_empty() {
                return Err(ModelError::InvalidLayer {
                    layer: layer.name.clone(),
                    detail: "activation shape has zero elements".into(),
                });
            }
            let derived = layer.derive_output_shape()?;
            if derived != layer.output_shape {
                return Err(ModelError::InvalidLayer {
                    layer: layer.name.clone(),
                    detail: format!(
                        "declared output {} but parameters produce {derived}",
                        layer.output_shape
                    ),
                });
            }
            if layer.layer_type == LayerType::LogSoftmax && i + 1 != self.layers.len() {
                return Err(ModelError::InvalidLayer {
                    layer: layer.name.clone(),
                    detail: "log_softmax must be the final layer".into(),
                });
            }
        }

        for pair in self.layers.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            if current.output_shape != next.input_shape {
                return Err(ModelError::InvalidGraph(format!(
                    "'{}' produces {} but '{}' expects {}",
                    current.name, current.output_shape, next.name, next.input_shape,
                )));
            }
        }

        let mut seen = HashSet::new();
        for name in self.layers.iter().flat_map(|l| &l.weight_names) {
            if !seen.insert(name.as_str()) {
                return Err(ModelError::InvalidGraph(format!(
                    "duplicate parameter tensor name '{name}'"
                )));
            }
        }

        tracing::debug!("validated graph '{}' ({} layers)", self.name, self.layers.len());

        Ok(ModelGraph {
            name: self.name,
            layers: self.layers,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    /// Returns the total number of layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Shape of the tensor the first layer consumes.
    pub fn input_shape(&self) -> &Shape {
        &self.layers[0].input_shape
    }

    /// Shape of the tensor the last layer produces.
    pub fn output_shape(&self) -> &Shape {
        &self.layers[self.layers.len() - 1].output_shape
    }

    /// Total number of scalar parameters.
    pub fn total_parameters(&self) -> usize {
        self.layers.iter().map(LayerDef::parameter_count).sum()
    }

    /// Returns the total memory for all parameters in bytes.
    pub fn total_weight_bytes(&self) -> usize {
        self.layers.iter().map(LayerDef::estimated_weight_bytes).sum()
    }

    /// Returns the largest activation footprint of any single layer.
    pub fn peak_activation_bytes(&self) -> usize {
        self.layers
            .iter()
            .map(LayerDef::estimated_activation_bytes)
            .max()
            .unwrap_or(0)
    }

    /// Returns an iterator over the layers in execution order.
    pub fn iter_layers(&self) -> impl Iterator<Item = &LayerDef> {
        self.layers.iter()
    }

    /// Returns a reference to a layer by index.
    pub fn layer(&self, index: usize) -> Option<&LayerDef> {
        self.layers.get(index)
    }

    /// Returns a reference to a layer by name.
    pub fn layer_by_name(&self, name: &str) -> Option<&LayerDef> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        format!(
            "Model '{}': {} layers, {} -> {}, {} parameters ({:.1} MB)",
            self.name,
            self.num_layers(),
            self.input_shape(),
            self.output_shape(),
            self.total_parameters(),
            self.total_weight_bytes() as f64 / (1024.0 * 1024.0),
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' ({} layers):", self.name, self.layers.len())?;
        for layer in &self.layers {
            writeln!(f, "  {}", layer.summary())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Conv2dParams;

    /// Helper: conv → dense → log-softmax over a 1x4x4 input.
    fn make_layers() -> Vec<LayerDef> {
        let conv = LayerDef::conv2d(
            "conv",
            0,
            &Shape::nchw(1, 1, 4, 4),
            2,
            Conv2dParams::new(3, 1),
            true,
            Some(2),
        )
        .unwrap();
        let fc = LayerDef::linear("fc", 1, &conv.output_shape, 2, false).unwrap();
        let head = LayerDef::log_softmax(2, &fc.output_shape);
        vec![conv, fc, head]
    }

    #[test]
    fn test_validate_ok() {
        let graph = ModelGraph::new("test".into(), make_layers());
        let validated = graph.validate().unwrap();
        assert_eq!(validated.num_layers(), 3);
        assert_eq!(validated.input_shape(), &Shape::nchw(1, 1, 4, 4));
        assert_eq!(validated.output_shape(), &Shape::matrix(1, 2));
    }

    #[test]
    fn test_validated_layers_read_through_accessors() {
        let validated = ModelGraph::new("test".into(), make_layers()).validate().unwrap();
        let names: Vec<_> = validated.iter_layers().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["conv", "fc", "log_softmax"]);
        assert_eq!(&validated.layer(0).unwrap().input_shape, validated.input_shape());
        assert_eq!(&validated.layer(2).unwrap().output_shape, validated.output_shape());
        assert!(validated.layer(3).is_none());
        assert_eq!(validated.layer_by_name("fc").unwrap().index, 1);
    }

    #[test]
    fn test_validate_empty() {
        let graph = ModelGraph::new("empty".into(), vec![]);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_bad_index() {
        let mut layers = make_layers();
        layers[1].index = 5;
        let graph = ModelGraph::new("bad".into(), layers);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_zero_shape() {
        let mut layers = make_layers();
        layers[2].input_shape = Shape::matrix(0, 2);
        let graph = ModelGraph::new("zero".into(), layers);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_broken_chain() {
        let mut layers = make_layers();
        layers[1] = LayerDef::linear("fc", 1, &Shape::matrix(1, 7), 2, false).unwrap();
        let err = ModelGraph::new("chain".into(), layers).validate().unwrap_err();
        assert!(matches!(err, ModelError::InvalidGraph(_)));
    }

    #[test]
    fn test_validate_declared_output_mismatch() {
        let mut layers = make_layers();
        layers[0].output_shape = Shape::nchw(1, 2, 4, 4);
        let graph = ModelGraph::new("declared".into(), layers);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_names() {
        let mut layers = make_layers();
        layers[1].weight_names = vec!["conv.weight".into(), "fc.bias".into()];
        let graph = ModelGraph::new("dup".into(), layers);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_log_softmax_not_last() {
        let layers = make_layers();
        let head = LayerDef::log_softmax(0, &Shape::matrix(1, 2));
        let mut tail = layers[2].clone();
        tail.index = 1;
        let graph = ModelGraph::new("head-first".into(), vec![head, tail]);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_totals() {
        let validated = ModelGraph::new("test".into(), make_layers())
            .validate()
            .unwrap();
        // conv: 2*1*3*3 + 2 = 20; fc: 2*8 + 2 = 18.
        assert_eq!(validated.total_parameters(), 38);
        assert_eq!(validated.total_weight_bytes(), 38 * 4);
        // Largest activation footprint is the conv: 16 in + 8 out.
        assert_eq!(validated.peak_activation_bytes(), (16 + 8) * 4);
    }

    #[test]
    fn test_summary_and_display() {
        let validated = ModelGraph::new("tiny".into(), make_layers())
            .validate()
            .unwrap();
        let s = validated.summary();
        assert!(s.contains("tiny"));
        assert!(s.contains("3 layers"));

        let display = format!("{validated}");
        assert!(display.contains("conv"));
        assert!(display.contains("log_softmax"));
    }

    #[test]
    fn test_layer_access() {
        let validated = ModelGraph::new("test".into(), make_layers())
            .validate()
            .unwrap();
        assert_eq!(validated.layer(0).unwrap().name, "conv");
        assert_eq!(validated.layer_by_name("fc").unwrap().index, 1);
        assert!(validated.layer(3).is_none());
        let names: Vec<_> = validated.iter_layers().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["conv", "fc", "log_softmax"]);
    }
}
