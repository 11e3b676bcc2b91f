// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for architecture construction and validation.

/// Errors that can occur when describing or validating a model graph.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A layer definition is invalid (e.g., incompatible shapes).
    #[error("invalid layer '{layer}': {detail}")]
    InvalidLayer { layer: String, detail: String },

    /// The model graph as a whole is malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),
}
