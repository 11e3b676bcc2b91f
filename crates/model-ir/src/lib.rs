// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! A lightweight intermediate representation (IR) for the X-ray classifier.
//!
//! The crate captures what the runtime needs to evaluate the network and
//! nothing more:
//!
//! - [`LayerType`] — the kind of computation each layer performs.
//! - [`LayerDef`] — a single layer's parameters, fused activation/pooling,
//!   weight tensor names and shapes, and activation shapes.
//! - [`ModelGraph`] — the full model as an ordered chain of layers, with a
//!   **type-state pattern** (`Loaded` → `Validated`).
//! - [`architecture`] — the fixed five-convolution / three-dense topology.
//!
//! # Example
//! ```
//! let graph = model_ir::architecture::xray_classifier().unwrap();
//! println!("{}", graph.summary());
//! for layer in graph.iter_layers() {
//!     println!("  {}", layer.summary());
//! }
//! ```

pub mod architecture;
mod error;
pub mod graph;
mod layer;

pub use error::ModelError;
pub use graph::ModelGraph;
pub use layer::{LayerDef, LayerType};
