// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Max pooling over the spatial axes of `[N, C, H, W]` tensors.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Computes the output shape of [`max_pool2d`].
///
/// Output spatial size is `floor((size - window) / stride) + 1`; trailing
/// rows and columns that do not fill a whole window are dropped.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if the input is not rank 4, is
/// empty, or is spatially smaller than the window.
pub fn max_pool2d_output_shape(
    input: &Shape,
    window: usize,
    stride: usize,
) -> Result<Shape, TensorError> {
    let mismatch = || TensorError::ShapeMismatch {
        op: "max_pool2d",
        lhs: input.clone(),
        rhs: Shape::matrix(window, window),
    };

    let &[n, c, h, w] = input.dims() else {
        return Err(mismatch());
    };
    if input.is_empty() || window == 0 || stride == 0 || h < window || w < window {
        return Err(mismatch());
    }
    Ok(Shape::nchw(n, c, (h - window) / stride + 1, (w - window) / stride + 1))
}

/// Takes the maximum of each `window × window` patch, stepping by `stride`.
///
/// The network uses `window = stride = 2` (non-overlapping 2×2 pooling).
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if the input is too small or the
/// output shape is wrong.
pub fn max_pool2d(
    input: &TensorView<'_>,
    window: usize,
    stride: usize,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let expected = max_pool2d_output_shape(input.shape(), window, stride)?;
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "max_pool2d (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let in_dims = input.shape().dims();
    let (planes, in_h, in_w) = (in_dims[0] * in_dims[1], in_dims[2], in_dims[3]);
    let (out_h, out_w) = (expected.dims()[2], expected.dims()[3]);

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for p in 0..planes {
        let plane = &src[p * in_h * in_w..(p + 1) * in_h * in_w];
        let out = &mut dst[p * out_h * out_w..(p + 1) * out_h * out_w];
        for oy in 0..out_h {
            for ox in 0..out_w {
                let mut max_val = f32::NEG_INFINITY;
                for ky in 0..window {
                    let row = (oy * stride + ky) * in_w;
                    for kx in 0..window {
                        max_val = max_val.max(plane[row + ox * stride + kx]);
                    }
                }
                out[oy * out_w + ox] = max_val;
            }
        }
    }

    Ok(())
}
