// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `xray-rt inspect` command: display the architecture and verify weights.
//!
//! Prints the layer table with activation shapes and parameter counts. When
//! a weight file is given (by `--weights`, or by `weights_path` in the
//! `--config` file) it is loaded with the same checks the service applies
//! at startup, and per-tensor statistics are printed.

use runtime::{RuntimeConfig, WeightStore};
use std::path::PathBuf;

/// Weight file to verify: the `--weights` flag, else the config file's
/// `weights_path`. Built-in defaults do not name a file to verify.
pub fn resolve_weights(
    flag: Option<PathBuf>,
    config_file: Option<&RuntimeConfig>,
) -> Option<PathBuf> {
    flag.or_else(|| config_file.map(|config| config.weights_path.clone()))
}

pub fn execute(weights: Option<PathBuf>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              xray-rt · Model Inspector              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let graph = model_ir::architecture::xray_classifier()?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Model: {}", graph.name);
    println!("  Layers: {}", graph.num_layers());
    println!("  Input: {}  Output: {}", graph.input_shape(), graph.output_shape());
    println!("  Parameters: {}", graph.total_parameters());
    println!(
        "  Total weights: {:.2} MB",
        graph.total_weight_bytes() as f64 / (1024.0 * 1024.0),
    );
    println!(
        "  Peak activations: {:.2} MB",
        graph.peak_activation_bytes() as f64 / (1024.0 * 1024.0),
    );
    println!();

    // ── Per-Layer Detail ───────────────────────────────────────
    println!(
        "  {:<4} {:<12} {:<26} {:<18} {:>12}",
        "Idx", "Name", "Op", "Output", "Params",
    );
    println!("  {}", "-".repeat(76));

    for layer in graph.iter_layers() {
        let mut op = layer.layer_type.to_string();
        if layer.relu {
            op.push_str("+relu");
        }
        if layer.pool.is_some() {
            op.push_str("+pool");
        }
        println!(
            "  {:<4} {:<12} {:<26} {:<18} {:>12}",
            layer.index,
            layer.name,
            op,
            layer.output_shape.to_string(),
            layer.parameter_count(),
        );
    }
    println!();

    // ── Weight Verification ────────────────────────────────────
    let Some(path) = weights else {
        println!("  No weight file given; pass --weights to verify one.");
        return Ok(());
    };

    let store = WeightStore::load(&path, &graph)
        .map_err(|e| anyhow::anyhow!("weight file '{}' is not usable: {e}", path.display()))?;

    println!("  Weights: {} (all {} tensors verified)", path.display(), store.num_tensors());
    println!(
        "  {:<14} {:<18} {:>12} {:>12} {:>12}",
        "Tensor", "Shape", "Min", "Max", "Mean",
    );
    println!("  {}", "-".repeat(72));
    for layer in graph.iter_layers() {
        for name in &layer.weight_names {
            let Some(tensor) = store.tensor(name) else {
                continue;
            };
            let values = tensor.as_f32_slice();
            let min = values.iter().copied().fold(f32::INFINITY, f32::min);
            let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len().max(1) as f64;
            println!(
                "  {:<14} {:<18} {:>12.5} {:>12.5} {:>12.5}",
                name,
                tensor.shape().to_string(),
                min,
                max,
                mean,
            );
        }
    }
    println!();
    Ok(())
}
