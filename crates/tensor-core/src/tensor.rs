// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and view abstractions.

use crate::{Shape, TensorError};

/// An owned, n-dimensional `f32` tensor stored in contiguous memory.
///
/// `Tensor` is the data carrier between pipeline stages. It owns its buffer
/// and exposes immutable views via [`TensorView`]. The buffer length always
/// equals `shape.num_elements()`; every constructor and [`reshape`](Tensor::reshape)
/// enforces this.
///
/// # Memory Layout
/// Data is stored in row-major (C) order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::zeros(Shape::matrix(2, 3));
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape) -> Self {
        Self::full(shape, 0.0)
    }

    /// Creates a new tensor with every element set to `value`.
    pub fn full(shape: Shape, value: f32) -> Self {
        let n = shape.num_elements();
        Self {
            shape,
            data: vec![value; n],
        }
    }

    /// Creates a tensor that takes ownership of `data`.
    ///
    /// Returns [`TensorError::ShapeMismatch`] if `data.len()` differs from
    /// the number of elements in `shape`.
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self, TensorError> {
        if data.len() != shape.num_elements() {
            return Err(TensorError::ShapeMismatch {
                op: "from_vec",
                lhs: shape,
                rhs: Shape::vector(data.len()),
            });
        }
        Ok(Self { shape, data })
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_f32_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_vec(shape, values.to_vec())
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns an immutable view over this tensor's data.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            shape: &self.shape,
            data: &self.data,
        }
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes()
    }

    /// Reinterprets the tensor with a new shape of equal element count.
    ///
    /// The buffer is moved, never copied or resized.
    pub fn reshape(self, shape: Shape) -> Result<Self, TensorError> {
        if shape.num_elements() != self.data.len() {
            return Err(TensorError::ShapeMismatch {
                op: "reshape",
                lhs: self.shape,
                rhs: shape,
            });
        }
        Ok(Self {
            shape,
            data: self.data,
        })
    }

    /// Reads the element at a multi-dimensional coordinate.
    pub fn get(&self, index: &[usize]) -> Result<f32, TensorError> {
        let offset = self.checked_offset(index)?;
        Ok(self.data[offset])
    }

    /// Writes the element at a multi-dimensional coordinate.
    pub fn set(&mut self, index: &[usize], value: f32) -> Result<(), TensorError> {
        let offset = self.checked_offset(index)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Returns the flat buffer.
    pub fn as_f32_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the flat buffer mutably.
    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Fills the tensor with a constant value.
    pub fn fill_f32(&mut self, value: f32) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Consumes the tensor and returns its backing buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    fn checked_offset(&self, index: &[usize]) -> Result<usize, TensorError> {
        self.shape
            .offset(index)
            .ok_or_else(|| TensorError::IndexOutOfRange {
                index: index.to_vec(),
                shape: self.shape.clone(),
            })
    }
}

/// A borrowed, read-only view over a [`Tensor`]'s data.
///
/// Views are zero-copy and tied to the lifetime of the source tensor,
/// enforced by the borrow checker.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    shape: &'a Shape,
    data: &'a [f32],
}

impl<'a> TensorView<'a> {
    /// Creates a view from raw parts.
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the slice length does not
    /// match the shape.
    pub fn from_parts(shape: &'a Shape, data: &'a [f32]) -> Result<Self, TensorError> {
        if data.len() != shape.num_elements() {
            return Err(TensorError::ShapeMismatch {
                op: "view",
                lhs: shape.clone(),
                rhs: Shape::vector(data.len()),
            });
        }
        Ok(Self { shape, data })
    }

    /// Returns the shape of the viewed tensor.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the viewed elements as a flat slice.
    pub fn as_f32_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Copies the view into a new owned tensor.
    pub fn to_tensor(&self) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.to_vec(),
        }
    }
}
