// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully-connected (dense) transform.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Computes the output shape of [`linear`]: `[N, out_features]`.
///
/// The leading input dimension is the batch; all remaining dimensions are
/// flattened and must multiply to the weight's input dimension.
pub fn linear_output_shape(input: &Shape, weight: &Shape) -> Result<Shape, TensorError> {
    let mismatch = || TensorError::ShapeMismatch {
        op: "linear",
        lhs: input.clone(),
        rhs: weight.clone(),
    };

    let &[out_features, in_features] = weight.dims() else {
        return Err(mismatch());
    };
    if input.rank() < 2 || input.is_empty() || weight.is_empty() {
        return Err(mismatch());
    }
    let batch = input.dims()[0];
    let features: usize = input.dims()[1..].iter().product();
    if features != in_features {
        return Err(mismatch());
    }
    Ok(Shape::matrix(batch, out_features))
}

/// Performs `output[n] = weight · flatten(input[n]) + bias`.
///
/// `weight` is `[out, in]` (the PyTorch `nn.Linear` layout), `bias` is
/// `[out]`, and `output` must be `[N, out]`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if the flattened feature count
/// differs from the weight's input dimension, or bias/output are misshaped.
pub fn linear(
    input: &TensorView<'_>,
    weight: &TensorView<'_>,
    bias: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let expected = linear_output_shape(input.shape(), weight.shape())?;
    let (batch, out_features) = (expected.dims()[0], expected.dims()[1]);
    let in_features = weight.shape().dims()[1];

    if bias.shape().dims() != [out_features] {
        return Err(TensorError::ShapeMismatch {
            op: "linear (bias)",
            lhs: Shape::vector(out_features),
            rhs: bias.shape().clone(),
        });
    }
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "linear (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let x = input.as_f32_slice();
    let w = weight.as_f32_slice();
    let b = bias.as_f32_slice();
    let y = output.as_f32_slice_mut();

    for n in 0..batch {
        let features = &x[n * in_features..(n + 1) * in_features];
        let out_row = &mut y[n * out_features..(n + 1) * out_features];
        for (o, d) in out_row.iter_mut().enumerate() {
            let w_row = &w[o * in_features..(o + 1) * in_features];
            let dot: f32 = w_row.iter().zip(features).map(|(a, b)| a * b).sum();
            *d = dot + b[o];
        }
    }

    Ok(())
}
