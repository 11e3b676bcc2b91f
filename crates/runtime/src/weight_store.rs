// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Trained parameters loaded from SafeTensors files with memory-mapped I/O.
//!
//! [`WeightStore`] holds one weight and one bias tensor per parameterised
//! layer, keyed by the layer's tensor names (`conv1.weight`, `conv1.bias`,
//! …). It is built in one of three ways:
//!
//! 1. **File-backed**: [`WeightStore::load`] memory-maps a SafeTensors file
//!    and copies each tensor out after checking its dtype and shape against
//!    the graph. This is the production path.
//! 2. **Synthetic**: [`WeightStore::constant`] fills every tensor with a
//!    constant, for fixtures and benchmarks without a trained model.
//! 3. **In-memory**: [`WeightStore::from_tensors`] validates caller-built
//!    tensors.
//!
//! Once built, the store is immutable and meant to be shared behind an
//! `Arc` by every inference call.

use crate::RuntimeError;
use model_ir::{graph::Validated, LayerDef, ModelGraph};
use safetensors::{Dtype, SafeTensors};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tensor_core::{Shape, Tensor, TensorView};

/// Placeholder tensor name for errors that concern the whole file.
const FILE_SCOPE: &str = "<file>";

/// Borrowed weight and bias of one layer.
#[derive(Debug, Clone, Copy)]
pub struct LayerParameters<'a> {
    /// Convolution weight `[out, in, k, k]` or dense weight `[out, in]`.
    pub weight: TensorView<'a>,
    /// Bias `[out]`.
    pub bias: TensorView<'a>,
}

/// Immutable parameter tensors for every layer of a graph.
pub struct WeightStore {
    tensors: BTreeMap<String, Tensor>,
    source: Option<PathBuf>,
}

impl WeightStore {
    /// Loads every parameter tensor `graph` declares from a SafeTensors file.
    ///
    /// Only little-endian `F32` tensors are accepted. Tensors in the file that
    /// the graph does not declare are ignored with a warning.
    ///
    /// # Errors
    /// [`RuntimeError::WeightLoadError`] if the file is missing or corrupt,
    /// or any declared tensor is absent, not `F32`, or misshaped.
    pub fn load(path: &Path, graph: &ModelGraph<Validated>) -> Result<Self, RuntimeError> {
        let file_error = |detail: String| RuntimeError::WeightLoadError {
            tensor: FILE_SCOPE.into(),
            detail,
        };

        let file = std::fs::File::open(path)
            .map_err(|e| file_error(format!("cannot open '{}': {e}", path.display())))?;
        // SAFETY: the mapping is read-only and only lives for the duration of
        // this call; every tensor is copied out before it is dropped.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| file_error(format!("mmap of '{}' failed: {e}", path.display())))?;
        tracing::info!(
            "weight store: mmap'd {} ({:.2} MB)",
            path.display(),
            mmap.len() as f64 / (1024.0 * 1024.0),
        );

        let st = SafeTensors::deserialize(&mmap)
            .map_err(|e| file_error(format!("SafeTensors parse error: {e}")))?;

        let mut tensors = BTreeMap::new();
        for layer in graph.iter_layers() {
            for (name, shape) in layer.weight_names.iter().zip(&layer.weight_shapes) {
                let view = st.tensor(name).map_err(|e| RuntimeError::WeightLoadError {
                    tensor: name.clone(),
                    detail: format!("not found in '{}': {e}", path.display()),
                })?;
                tensors.insert(name.clone(), tensor_from_view(name, shape, &view)?);
            }
        }

        for extra in st.names().into_iter().filter(|n| !tensors.contains_key(n.as_str())) {
            tracing::warn!("weight store: ignoring unexpected tensor '{extra}'");
        }

        let store = Self {
            tensors,
            source: Some(path.to_path_buf()),
        };
        tracing::info!(
            "weight store: loaded {} tensors, {} parameters",
            store.num_tensors(),
            store.total_parameters(),
        );
        Ok(store)
    }

    /// Creates a store whose weights all equal `weight` and biases all equal
    /// `bias`.
    pub fn constant(graph: &ModelGraph<Validated>, weight: f32, bias: f32) -> Self {
        let mut tensors = BTreeMap::new();
        for layer in graph.iter_layers() {
            if let (Some(w), Some(b)) = (layer.weight_name(), layer.bias_name()) {
                tensors.insert(w.to_string(), Tensor::full(layer.weight_shapes[0].clone(), weight));
                tensors.insert(b.to_string(), Tensor::full(layer.weight_shapes[1].clone(), bias));
            }
        }
        tracing::debug!("weight store: synthetic constant weights ({weight}, {bias})");
        Self {
            tensors,
            source: None,
        }
    }

    /// Builds a store from in-memory tensors keyed by tensor name.
    ///
    /// # Errors
    /// [`RuntimeError::WeightLoadError`] if a tensor the graph declares is
    /// missing or has the wrong shape. Undeclared tensors are dropped.
    pub fn from_tensors(
        graph: &ModelGraph<Validated>,
        mut tensors: HashMap<String, Tensor>,
    ) -> Result<Self, RuntimeError> {
        let mut bound = BTreeMap::new();
        for layer in graph.iter_layers() {
            for (name, shape) in layer.weight_names.iter().zip(&layer.weight_shapes) {
                let tensor = tensors.remove(name).ok_or_else(|| RuntimeError::WeightLoadError {
                    tensor: name.clone(),
                    detail: "tensor not provided".into(),
                })?;
                check_shape(name, shape, tensor.shape())?;
                bound.insert(name.clone(), tensor);
            }
        }
        for extra in tensors.keys() {
            tracing::warn!("weight store: ignoring unexpected tensor '{extra}'");
        }
        Ok(Self {
            tensors: bound,
            source: None,
        })
    }

    /// Writes every tensor to a SafeTensors file that [`WeightStore::load`]
    /// reads back.
    pub fn save(&self, path: &Path) -> Result<(), RuntimeError> {
        let write_error = |detail: String| RuntimeError::WeightLoadError {
            tensor: FILE_SCOPE.into(),
            detail,
        };

        let encoded: Vec<(&str, Vec<usize>, Vec<u8>)> = self
            .tensors
            .iter()
            .map(|(name, tensor)| {
                let bytes = tensor
                    .as_f32_slice()
                    .iter()
                    .flat_map(|v| v.to_le_bytes())
                    .collect();
                (name.as_str(), tensor.shape().dims().to_vec(), bytes)
            })
            .collect();

        let mut views = Vec::with_capacity(encoded.len());
        for (name, dims, bytes) in &encoded {
            let view = safetensors::tensor::TensorView::new(Dtype::F32, dims.clone(), bytes)
                .map_err(|e| RuntimeError::WeightLoadError {
                    tensor: name.to_string(),
                    detail: format!("cannot encode: {e}"),
                })?;
            views.push((*name, view));
        }

        safetensors::serialize_to_file(views.iter().map(|(n, v)| (*n, v)), &None, path)
            .map_err(|e| write_error(format!("cannot write '{}': {e}", path.display())))?;
        tracing::info!("weight store: wrote {} tensors to {}", encoded.len(), path.display());
        Ok(())
    }

    /// Returns the weight and bias bound to `layer`.
    ///
    /// # Errors
    /// [`RuntimeError::WeightLoadError`] if the layer has no parameters or
    /// the store does not hold them.
    pub fn parameters(&self, layer: &LayerDef) -> Result<LayerParameters<'_>, RuntimeError> {
        let (Some(weight), Some(bias)) = (layer.weight_name(), layer.bias_name()) else {
            return Err(RuntimeError::WeightLoadError {
                tensor: layer.name.clone(),
                detail: format!("layer '{}' has no parameters", layer.name),
            });
        };
        Ok(LayerParameters {
            weight: self.require(weight)?.view(),
            bias: self.require(bias)?.view(),
        })
    }

    /// Checks that the store holds every tensor `graph` declares, in the
    /// declared shapes.
    pub fn covers(&self, graph: &ModelGraph<Validated>) -> Result<(), RuntimeError> {
        for layer in graph.iter_layers() {
            for (name, shape) in layer.weight_names.iter().zip(&layer.weight_shapes) {
                check_shape(name, shape, self.require(name)?.shape())?;
            }
        }
        Ok(())
    }

    /// Returns a tensor by name.
    pub fn tensor(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Returns an iterator over `(name, tensor)` pairs, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Number of tensors held.
    pub fn num_tensors(&self) -> usize {
        self.tensors.len()
    }

    /// Total number of scalar parameters.
    pub fn total_parameters(&self) -> usize {
        self.tensors.values().map(|t| t.shape().num_elements()).sum()
    }

    /// Total size of all parameters in bytes.
    pub fn total_bytes(&self) -> usize {
        self.tensors.values().map(Tensor::size_bytes).sum()
    }

    /// The file the weights were loaded from, if file-backed.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn require(&self, name: &str) -> Result<&Tensor, RuntimeError> {
        self.tensors.get(name).ok_or_else(|| RuntimeError::WeightLoadError {
            tensor: name.to_string(),
            detail: "tensor not loaded".into(),
        })
    }
}

impl std::fmt::Debug for WeightStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightStore")
            .field("source", &self.source)
            .field("tensors", &self.tensors.len())
            .field("parameters", &self.total_parameters())
            .finish()
    }
}

// ── Private helpers ────────────────────────────────────────────

/// Copies a SafeTensors view into an owned `f32` tensor.
fn tensor_from_view(
    name: &str,
    expected: &Shape,
    view: &safetensors::tensor::TensorView<'_>,
) -> Result<Tensor, RuntimeError> {
    if view.dtype() != Dtype::F32 {
        return Err(RuntimeError::WeightLoadError {
            tensor: name.to_string(),
            detail: format!("expected F32, found {:?}", view.dtype()),
        });
    }
    check_shape(name, expected, &Shape::from(view.shape()))?;

    let data: Vec<f32> = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Tensor::from_vec(expected.clone(), data).map_err(|e| RuntimeError::WeightLoadError {
        tensor: name.to_string(),
        detail: e.to_string(),
    })
}

fn check_shape(name: &str, expected: &Shape, actual: &Shape) -> Result<(), RuntimeError> {
    if expected != actual {
        return Err(RuntimeError::WeightLoadError {
            tensor: name.to_string(),
            detail: format!("expected shape {expected}, found {actual}"),
        });
    }
    Ok(())
}
