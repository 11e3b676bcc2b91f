// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Dense `f32` tensors and the forward-only primitives of a small
//! convolutional classifier.
//!
//! This crate provides:
//! - [`Tensor`] — an owned, row-major tensor whose buffer length always
//!   matches its shape.
//! - [`TensorView`] — a borrowed, read-only view used as operation input.
//! - [`Shape`] — dimension descriptors with strides and flat offsets.
//! - Layer primitives: 2-D convolution, max pooling, ReLU, dense (linear),
//!   softmax and log-softmax.
//!
//! # Design Goals
//! - Operations write into caller-allocated outputs.
//! - Every shape disagreement is a [`TensorError::ShapeMismatch`], never a
//!   silent coercion.
//! - Clean error types via `thiserror`.

mod error;
mod ops;
mod shape;
mod tensor;

pub use error::TensorError;
pub use ops::{
    conv2d, conv2d_output_shape, linear, linear_output_shape, log_softmax, max_pool2d,
    max_pool2d_output_shape, relu, relu_inplace, softmax, Conv2dParams,
};
pub use shape::Shape;
pub use tensor::{Tensor, TensorView};
