// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Image decoding and normalisation into the network input tensor.
//!
//! The steps and constants reproduce the transform the classifier was
//! trained with and must not drift:
//!
//! 1. decode any supported format, convert to 8-bit RGB;
//! 2. resize to 64x64 with a triangle (bilinear) filter;
//! 3. scale `v / 255` into `[0, 1]`;
//! 4. normalise each channel `(v - 0.5) / 0.5` into `[-1, 1]`;
//! 5. lay out channel-first as `[1, 3, 64, 64]`.

use crate::RuntimeError;
use image::imageops::{self, FilterType};
use model_ir::architecture::{INPUT_CHANNELS, INPUT_SIZE};
use tensor_core::{Shape, Tensor};

/// Per-channel normalisation mean.
const MEAN: f32 = 0.5;
/// Per-channel normalisation standard deviation.
const STD: f32 = 0.5;

/// Converts raw image bytes into the `[1, 3, 64, 64]` network input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Creates a preprocessor.
    pub fn new() -> Self {
        Self
    }

    /// Shape of every tensor this preprocessor produces.
    pub fn output_shape(&self) -> Shape {
        Shape::nchw(1, INPUT_CHANNELS, INPUT_SIZE, INPUT_SIZE)
    }

    /// Decodes, resizes and normalises `bytes`.
    ///
    /// # Errors
    /// [`RuntimeError::DecodeError`] if the bytes are empty, corrupt, or in
    /// an unsupported format.
    pub fn preprocess(&self, bytes: &[u8]) -> Result<Tensor, RuntimeError> {
        let decoded = image::load_from_memory(bytes)?;
        tracing::debug!(
            "preprocess: decoded {}x{} image",
            decoded.width(),
            decoded.height(),
        );

        let rgb = decoded.to_rgb8();
        let size = INPUT_SIZE as u32;
        let resized = imageops::resize(&rgb, size, size, FilterType::Triangle);

        let plane = INPUT_SIZE * INPUT_SIZE;
        let mut data = vec![0.0f32; INPUT_CHANNELS * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let offset = y as usize * INPUT_SIZE + x as usize;
            for (c, &v) in pixel.0.iter().enumerate() {
                data[c * plane + offset] = (f32::from(v) / 255.0 - MEAN) / STD;
            }
        }

        Tensor::from_vec(self.output_shape(), data).map_err(|source| {
            RuntimeError::ExecutionError {
                layer: "preprocess".into(),
                source,
            }
        })
    }
}
