// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Forward-only layer primitives.
//!
//! Each operation reads borrowed [`crate::TensorView`]s and writes into a
//! pre-allocated output [`crate::Tensor`] whose shape it validates. The
//! `*_output_shape` helpers let callers size that output first.

mod conv2d_op;
mod linear_op;
mod pool_op;
mod relu_op;
mod softmax_op;

pub use conv2d_op::{conv2d, conv2d_output_shape, Conv2dParams};
pub use linear_op::{linear, linear_output_shape};
pub use pool_op::{max_pool2d, max_pool2d_output_shape};
pub use relu_op::{relu, relu_inplace};
pub use softmax_op::{log_softmax, softmax};
