// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 2-D convolution (cross-correlation) over `[N, C, H, W]` tensors.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Hyper-parameters of a square-kernel convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Conv2dParams {
    /// Side length of the square kernel.
    pub kernel_size: usize,
    /// Zero padding added on every spatial border.
    pub padding: usize,
    /// Step between adjacent windows.
    pub stride: usize,
}

impl Conv2dParams {
    /// Stride-1 convolution with the given kernel and padding.
    pub fn new(kernel_size: usize, padding: usize) -> Self {
        Self {
            kernel_size,
            padding,
            stride: 1,
        }
    }

    /// Output length along one spatial axis:
    /// `floor((input + 2 * padding - kernel) / stride) + 1`.
    ///
    /// Returns `None` when the kernel does not fit in the padded input or
    /// the stride is zero.
    pub fn output_size(&self, input: usize) -> Option<usize> {
        if self.stride == 0 || self.kernel_size == 0 {
            return None;
        }
        let padded = input + 2 * self.padding;
        if padded < self.kernel_size {
            return None;
        }
        Some((padded - self.kernel_size) / self.stride + 1)
    }
}

/// Computes the output shape of [`conv2d`] for an `[N, C, H, W]` input and an
/// `[O, C, K, K]` weight.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if either shape has the wrong rank,
/// the channel counts disagree, the kernel does not match `params`, or the
/// kernel does not fit in the padded input.
pub fn conv2d_output_shape(
    input: &Shape,
    weight: &Shape,
    params: Conv2dParams,
) -> Result<Shape, TensorError> {
    let mismatch = || TensorError::ShapeMismatch {
        op: "conv2d",
        lhs: input.clone(),
        rhs: weight.clone(),
    };

    let (&[n, c, h, w], &[o, wc, kh, kw]) = (input.dims(), weight.dims()) else {
        return Err(mismatch());
    };
    if input.is_empty() || weight.is_empty() {
        return Err(mismatch());
    }
    if wc != c || kh != params.kernel_size || kw != params.kernel_size {
        return Err(mismatch());
    }
    match (params.output_size(h), params.output_size(w)) {
        (Some(oh), Some(ow)) => Ok(Shape::nchw(n, o, oh, ow)),
        _ => Err(mismatch()),
    }
}

/// Standard 2-D cross-correlation with zero padding:
///
/// `out[n, o, y, x] = bias[o] + Σ_c Σ_ky Σ_kx in[n, c, y*s + ky - p, x*s + kx - p] * w[o, c, ky, kx]`
///
/// `input` is `[N, C, H, W]`, `weight` is `[O, C, K, K]`, `bias` is `[O]`,
/// and `output` must already have the shape returned by
/// [`conv2d_output_shape`]. No dilation and no grouping.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if any operand has an unexpected
/// shape.
pub fn conv2d(
    input: &TensorView<'_>,
    weight: &TensorView<'_>,
    bias: &TensorView<'_>,
    params: Conv2dParams,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let expected = conv2d_output_shape(input.shape(), weight.shape(), params)?;

    let in_dims = input.shape().dims();
    let (batch, in_ch, in_h, in_w) = (in_dims[0], in_dims[1], in_dims[2], in_dims[3]);
    let out_ch = weight.shape().dims()[0];

    if bias.shape().dims() != [out_ch] {
        return Err(TensorError::ShapeMismatch {
            op: "conv2d (bias)",
            lhs: Shape::vector(out_ch),
            rhs: bias.shape().clone(),
        });
    }
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "conv2d (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let out_h = expected.dims()[2];
    let out_w = expected.dims()[3];
    let k = params.kernel_size;

    let src = input.as_f32_slice();
    let w = weight.as_f32_slice();
    let b = bias.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    let in_plane = in_h * in_w;
    let out_plane = out_h * out_w;

    for n in 0..batch {
        let src_n = &src[n * in_ch * in_plane..(n + 1) * in_ch * in_plane];
        for o in 0..out_ch {
            let base = (n * out_ch + o) * out_plane;
            let dst_plane = &mut dst[base..base + out_plane];
            dst_plane.iter_mut().for_each(|v| *v = b[o]);

            for c in 0..in_ch {
                let plane = &src_n[c * in_plane..(c + 1) * in_plane];
                let kernel = &w[(o * in_ch + c) * k * k..(o * in_ch + c + 1) * k * k];
                accumulate_plane(plane, kernel, dst_plane, in_h, in_w, out_h, out_w, params);
            }
        }
    }

    Ok(())
}

/// Adds the correlation of one input plane with one `k × k` kernel into
/// `dst`. Taps that fall into the zero padding are skipped.
#[allow(clippy::too_many_arguments)]
fn accumulate_plane(
    plane: &[f32],
    kernel: &[f32],
    dst: &mut [f32],
    in_h: usize,
    in_w: usize,
    out_h: usize,
    out_w: usize,
    params: Conv2dParams,
) {
    let k = params.kernel_size;
    let pad = params.padding as isize;
    let stride = params.stride as isize;

    for ky in 0..k {
        for kx in 0..k {
            let wv = kernel[ky * k + kx];
            for oy in 0..out_h {
                let iy = oy as isize * stride + ky as isize - pad;
                if iy < 0 || iy >= in_h as isize {
                    continue;
                }
                let row = &plane[iy as usize * in_w..(iy as usize + 1) * in_w];
                let out_row = &mut dst[oy * out_w..(oy + 1) * out_w];
                for (ox, d) in out_row.iter_mut().enumerate() {
                    let ix = ox as isize * stride + kx as isize - pad;
                    if ix >= 0 && ix < in_w as isize {
                        *d += wv * row[ix as usize];
                    }
                }
            }
        }
    }
}
