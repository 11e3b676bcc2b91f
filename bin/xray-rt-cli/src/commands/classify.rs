// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `xray-rt classify` command: classify images, one JSON line per image.
//!
//! The service is built once; images are then classified on blocking tasks,
//! at most `num_threads` at a time, and printed in argument order. A failing
//! image prints `{"error": "..."}` and does not stop the others.

use anyhow::Context;
use runtime::{InferenceService, RuntimeConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub async fn execute(
    mut config: RuntimeConfig,
    weights: Option<PathBuf>,
    threads: Option<usize>,
    images: Vec<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(weights) = weights {
        config.weights_path = weights;
    }
    if let Some(threads) = threads {
        anyhow::ensure!(threads > 0, "--threads must be at least 1");
        config.num_threads = Some(threads);
    }

    let service = InferenceService::from_config(&config).with_context(|| {
        format!("cannot start with weights '{}'", config.weights_path.display())
    })?;
    let service = Arc::new(service);
    let semaphore = Arc::new(Semaphore::new(config.resolve_threads()));
    tracing::info!(
        "classifying {} images, {} at a time",
        images.len(),
        config.resolve_threads()
    );

    let mut tasks = Vec::with_capacity(images.len());
    for path in images {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let service = Arc::clone(&service);
        tasks.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            classify_file(&service, &path)
        }));
    }

    let mut failures = 0;
    for task in tasks {
        let response = task.await?;
        if response.get("error").is_some() {
            failures += 1;
        }
        println!("{response}");
    }
    if failures > 0 {
        tracing::warn!("{failures} image(s) could not be classified");
    }
    Ok(())
}

/// Classifies one file into its response body (or error body).
fn classify_file(service: &InferenceService, path: &Path) -> serde_json::Value {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("cannot read {}: {e}", path.display());
            return error_body(format!("cannot read '{}': {e}", path.display()));
        }
    };

    match service.infer(&bytes) {
        Ok(result) => match serde_json::to_value(result.to_response()) {
            Ok(value) => value,
            Err(e) => error_body(e.to_string()),
        },
        Err(e) => {
            tracing::warn!("{}: {e}", path.display());
            error_body(e.cause())
        }
    }
}

fn error_body(cause: String) -> serde_json::Value {
    serde_json::json!({ "error": cause })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let body = error_body("cannot decode image: bad".into());
        assert_eq!(body.to_string(), r#"{"error":"cannot decode image: bad"}"#);
    }
}
