// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rectified linear unit.

use crate::{Tensor, TensorError, TensorView};

/// Applies `max(0, x)` element-wise.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
pub fn relu(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "relu",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }

    for (d, &x) in output.as_f32_slice_mut().iter_mut().zip(input.as_f32_slice()) {
        *d = x.max(0.0);
    }
    Ok(())
}

/// In-place variant of [`relu`]; the network applies it directly to a
/// layer's freshly produced activation.
pub fn relu_inplace(tensor: &mut Tensor) {
    for x in tensor.as_f32_slice_mut() {
        *x = x.max(0.0);
    }
}
