// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `xray-rt fixture` command: write a constant-valued weight file.

use runtime::WeightStore;
use std::path::PathBuf;

pub fn execute(out: PathBuf, weight_value: f32, bias_value: f32) -> anyhow::Result<()> {
    let graph = model_ir::architecture::xray_classifier()?;
    let store = WeightStore::constant(&graph, weight_value, bias_value);
    store.save(&out)?;

    println!(
        "Wrote {} tensors ({} parameters, {:.2} MB) to {}",
        store.num_tensors(),
        store.total_parameters(),
        store.total_bytes() as f64 / (1024.0 * 1024.0),
        out.display(),
    );
    println!("  weights = {weight_value}, biases = {bias_value}");
    Ok(())
}
