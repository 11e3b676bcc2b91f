// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime.

/// Errors raised while loading weights, preprocessing or executing the network.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The image bytes could not be decoded.
    #[error("cannot decode image: {0}")]
    DecodeError(#[from] image::ImageError),

    /// A parameter tensor (or the weight file itself) could not be loaded.
    #[error("weight loading failed for '{tensor}': {detail}")]
    WeightLoadError { tensor: String, detail: String },

    /// A tensor operation failed during layer execution.
    #[error("execution error in layer '{layer}': {source}")]
    ExecutionError {
        layer: String,
        #[source]
        source: tensor_core::TensorError,
    },

    /// The architecture description is invalid.
    #[error("model error: {0}")]
    ModelError(#[from] model_ir::ModelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// The failure of a single inference call.
///
/// Serving layers map this to a client-facing error body; the service and
/// its weights stay usable for subsequent calls.
#[derive(Debug, thiserror::Error)]
#[error("inference failed: {source}")]
pub struct InferenceError {
    #[from]
    source: RuntimeError,
}

impl InferenceError {
    /// Human-readable cause, without the `inference failed` prefix.
    pub fn cause(&self) -> String {
        self.source.to_string()
    }

    /// The underlying runtime error.
    pub fn runtime_error(&self) -> &RuntimeError {
        &self.source
    }

    /// Returns `true` if the input image could not be decoded.
    pub fn is_decode_error(&self) -> bool {
        matches!(self.source, RuntimeError::DecodeError(_))
    }
}
