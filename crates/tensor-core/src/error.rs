// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::Shape;

/// Errors that can occur during tensor operations.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// Two shapes are incompatible for the requested operation.
    ///
    /// `lhs` is the shape that was expected (or the operand on the left),
    /// `rhs` is the shape that was supplied.
    #[error("shape mismatch in {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// A coordinate lies outside the tensor's bounds or has the wrong rank.
    #[error("index {index:?} out of range for shape {shape}")]
    IndexOutOfRange { index: Vec<usize>, shape: Shape },

    /// A numeric computation failed (e.g., NaN or overflow).
    #[error("numeric error in {op}: {detail}")]
    Numeric {
        op: &'static str,
        detail: String,
    },
}
