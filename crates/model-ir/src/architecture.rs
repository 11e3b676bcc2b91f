// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The fixed chest X-ray classifier architecture.
//!
//! ```text
//! [1,3,64,64]
//!   conv1 11x11 p2  3→64  + relu + pool  → [1,64,29,29]
//!   conv2  5x5  p2 64→66  + relu + pool  → [1,66,14,14]
//!   conv3  3x3  p1 66→68  + relu         → [1,68,14,14]
//!   conv4  3x3  p1 68→70  + relu         → [1,70,14,14]
//!   conv5  3x3  p1 70→72  + relu + pool  → [1,72,7,7]
//!   fc1   3528→4096 + relu
//!   fc2   4096→1000 + relu
//!   fc3   1000→2
//!   log_softmax                          → [1,2]
//! ```
//!
//! Channel counts and kernel/padding pairs must match the trained weight
//! file exactly; the 7x7 spatial size feeding `fc1` follows from them and
//! the 64x64 input.

use crate::{graph::Validated, LayerDef, ModelError, ModelGraph};
use tensor_core::{Conv2dParams, Shape};

/// Name reported by the graph summary.
pub const MODEL_NAME: &str = "xray-alexnet";

/// Colour channels of the network input.
pub const INPUT_CHANNELS: usize = 3;

/// Height and width of the network input.
pub const INPUT_SIZE: usize = 64;

/// Number of output classes.
pub const NUM_CLASSES: usize = 2;

/// Max-pool window and stride.
pub const POOL_WINDOW: usize = 2;

/// `(name, out_channels, kernel, padding, pool)` for each convolution block.
const CONV_BLOCKS: [(&str, usize, usize, usize, bool); 5] = [
    ("conv1", 64, 11, 2, true),
    ("conv2", 66, 5, 2, true),
    ("conv3", 68, 3, 1, false),
    ("conv4", 70, 3, 1, false),
    ("conv5", 72, 3, 1, true),
];

/// `(name, out_features, relu)` for each dense layer.
const DENSE_LAYERS: [(&str, usize, bool); 3] = [
    ("fc1", 4096, true),
    ("fc2", 1000, true),
    ("fc3", NUM_CLASSES, false),
];

/// Shape of the preprocessed network input: `[1, 3, 64, 64]`.
pub fn input_shape() -> Shape {
    Shape::nchw(1, INPUT_CHANNELS, INPUT_SIZE, INPUT_SIZE)
}

/// Builds and validates the classifier graph.
pub fn xray_classifier() -> Result<ModelGraph<Validated>, ModelError> {
    let mut layers = Vec::with_capacity(CONV_BLOCKS.len() + DENSE_LAYERS.len() + 1);
    let mut shape = input_shape();

    for (name, out_channels, kernel, padding, pool) in CONV_BLOCKS {
        let layer = LayerDef::conv2d(
            name,
            layers.len(),
            &shape,
            out_channels,
            Conv2dParams::new(kernel, padding),
            true,
            pool.then_some(POOL_WINDOW),
        )?;
        shape = layer.output_shape.clone();
        layers.push(layer);
    }

    let flattened = Shape::nchw(1, 72, 7, 7);
    if shape != flattened {
        return Err(ModelError::InvalidGraph(format!(
            "convolution stack produces {shape}, dense head expects {flattened}"
        )));
    }

    for (name, out_features, relu) in DENSE_LAYERS {
        let layer = LayerDef::linear(name, layers.len(), &shape, out_features, relu)?;
        shape = layer.output_shape.clone();
        layers.push(layer);
    }

    layers.push(LayerDef::log_softmax(layers.len(), &shape));

    ModelGraph::new(MODEL_NAME.to_string(), layers).validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayerType;

    #[test]
    fn test_activation_shapes() {
        let graph = xray_classifier().unwrap();
        let outputs: Vec<_> = graph.iter_layers().map(|l| l.output_shape.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                Shape::nchw(1, 64, 29, 29),
                Shape::nchw(1, 66, 14, 14),
                Shape::nchw(1, 68, 14, 14),
                Shape::nchw(1, 70, 14, 14),
                Shape::nchw(1, 72, 7, 7),
                Shape::matrix(1, 4096),
                Shape::matrix(1, 1000),
                Shape::matrix(1, 2),
                Shape::matrix(1, 2),
            ]
        );
    }

    #[test]
    fn test_weight_shapes_match_state_dict() {
        let graph = xray_classifier().unwrap();
        let expected = [
            ("conv1.weight", Shape::nchw(64, 3, 11, 11)),
            ("conv2.weight", Shape::nchw(66, 64, 5, 5)),
            ("conv3.weight", Shape::nchw(68, 66, 3, 3)),
            ("conv4.weight", Shape::nchw(70, 68, 3, 3)),
            ("conv5.weight", Shape::nchw(72, 70, 3, 3)),
            ("fc1.weight", Shape::matrix(4096, 72 * 7 * 7)),
            ("fc2.weight", Shape::matrix(1000, 4096)),
            ("fc3.weight", Shape::matrix(2, 1000)),
        ];
        for (layer, (name, shape)) in graph.iter_layers().zip(expected) {
            assert_eq!(layer.weight_names[0], name);
            assert_eq!(layer.weight_shapes[0], shape);
            assert_eq!(layer.weight_shapes[1], Shape::vector(shape.dims()[0]));
        }
    }

    #[test]
    fn test_block_structure() {
        let graph = xray_classifier().unwrap();
        let pooled: Vec<_> = graph
            .iter_layers()
            .filter(|l| l.pool.is_some())
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(pooled, ["conv1", "conv2", "conv5"]);

        let fc3 = graph.layer_by_name("fc3").unwrap();
        assert!(!fc3.relu);
        assert_eq!(graph.layer(8).unwrap().layer_type, LayerType::LogSoftmax);
    }

    #[test]
    fn test_parameter_count() {
        let graph = xray_classifier().unwrap();
        assert_eq!(graph.total_parameters(), 18_811_550);
        assert_eq!(graph.input_shape(), &input_shape());
        assert_eq!(graph.output_shape(), &Shape::matrix(1, NUM_CLASSES));
    }
}
