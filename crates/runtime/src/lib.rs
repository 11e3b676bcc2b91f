// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The inference runtime that turns chest X-ray images into
//! `NORMAL` / `PNEUMONIA` classifications.
//!
//! The runtime takes:
//! - A validated `ModelGraph` from `model-ir` (normally
//!   [`model_ir::architecture::xray_classifier`]).
//! - A [`WeightStore`] holding the trained parameters, loaded once from a
//!   SafeTensors file.
//!
//! And evaluates the network layer by layer with the `tensor-core` ops,
//! optionally recording per-layer timings.
//!
//! # Pipeline
//! ```text
//! bytes ─▶ ImagePreprocessor ─▶ [1,3,64,64] ─▶ NetworkGraph ─▶ [1,2] log-probs
//!       ─▶ exp + argmax ─▶ ClassificationResult
//! ```
//!
//! # Concurrency
//! Weights are immutable and shared behind an `Arc`; every call allocates
//! its own activations. [`InferenceService`] is `Send + Sync` and can be
//! called from any number of threads without locking. Calls are blocking
//! and CPU-bound, so async callers should run them on a blocking pool.
//!
//! # Example
//! ```no_run
//! use runtime::{InferenceService, RuntimeConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = InferenceService::from_config(&RuntimeConfig::default())?;
//! let bytes = std::fs::read("chest.png")?;
//! let result = service.infer(&bytes)?;
//! println!("{}", serde_json::to_string(&result.to_response())?);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod metrics;
mod network;
mod preprocess;
mod service;
mod weight_store;

pub use config::RuntimeConfig;
pub use error::{InferenceError, RuntimeError};
pub use metrics::{InferenceMetrics, LayerMetrics};
pub use network::NetworkGraph;
pub use preprocess::ImagePreprocessor;
pub use service::{
    ClassificationResult, InferenceService, Label, LabelPercentages, PredictionResponse,
};
pub use weight_store::{LayerParameters, WeightStore};
