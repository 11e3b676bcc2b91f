// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax and log-softmax over the last dimension.

use crate::{Tensor, TensorError, TensorView};

/// Computes softmax along the last dimension: `output[i] = exp(x[i] - max) / sum(exp(x - max))`.
///
/// Uses the numerically stable variant that subtracts the maximum value
/// before exponentiation to prevent overflow.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ
/// or the input is empty.
pub fn softmax(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    let last_dim = check_shapes("softmax", input, output)?;

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for (row_src, row_dst) in src.chunks_exact(last_dim).zip(dst.chunks_exact_mut(last_dim)) {
        // Find max for numerical stability.
        let max_val = row_src.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        // Compute exp(x - max) and sum.
        let mut sum = 0.0f32;
        for (d, &s) in row_dst.iter_mut().zip(row_src.iter()) {
            let e = (s - max_val).exp();
            *d = e;
            sum += e;
        }

        // Normalize.
        if sum > 0.0 {
            let inv_sum = 1.0 / sum;
            for d in row_dst.iter_mut() {
                *d *= inv_sum;
            }
        }
    }

    Ok(())
}

/// Computes log-softmax along the last dimension:
/// `output[i] = (x[i] - max) - ln(sum(exp(x - max)))`.
///
/// Every output is `<= 0`, and `exp` of a row sums to one.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ
/// or the input is empty, and [`TensorError::Numeric`] if a row contains no
/// finite maximum (all `-inf` or any NaN).
pub fn log_softmax(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    let last_dim = check_shapes("log_softmax", input, output)?;

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for (row_src, row_dst) in src.chunks_exact(last_dim).zip(dst.chunks_exact_mut(last_dim)) {
        let max_val = row_src.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !max_val.is_finite() || row_src.iter().any(|x| x.is_nan()) {
            return Err(TensorError::Numeric {
                op: "log_softmax",
                detail: format!("row has no finite maximum: {row_src:?}"),
            });
        }

        let sum: f32 = row_src.iter().map(|&s| (s - max_val).exp()).sum();
        let log_sum = sum.ln();
        for (d, &s) in row_dst.iter_mut().zip(row_src) {
            *d = (s - max_val) - log_sum;
        }
    }

    Ok(())
}

/// Validates matching, non-empty shapes and returns the last dimension.
fn check_shapes(
    op: &'static str,
    input: &TensorView<'_>,
    output: &Tensor,
) -> Result<usize, TensorError> {
    if input.shape() != output.shape() || input.shape().is_empty() {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    // Non-empty shapes have rank >= 1.
    Ok(input.shape().dims()[input.shape().rank() - 1])
}
