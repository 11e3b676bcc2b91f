// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `xray-rt benchmark` command: repeated inference on one image.
//!
//! Runs one warm-up classification, then `runs` timed ones with per-layer
//! profiling forced on, and prints mean timings per layer plus latency
//! statistics for the whole call.

use runtime::{InferenceMetrics, InferenceService, RuntimeConfig};
use std::path::PathBuf;
use std::time::Duration;

pub fn execute(
    mut config: RuntimeConfig,
    weights: Option<PathBuf>,
    image: PathBuf,
    runs: usize,
) -> anyhow::Result<()> {
    anyhow::ensure!(runs > 0, "--runs must be at least 1");
    if let Some(weights) = weights {
        config.weights_path = weights;
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             xray-rt · Benchmark Suite               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let service = InferenceService::from_config(&config)?.with_profiling(true);
    let bytes = std::fs::read(&image)
        .map_err(|e| anyhow::anyhow!("cannot read '{}': {e}", image.display()))?;

    println!("  Weights: {}", config.weights_path.display());
    println!("  Image:   {} ({} bytes)", image.display(), bytes.len());
    println!("  Runs:    {runs} (+1 warm-up)");
    println!();

    // Warm up: first run pays for page faults on the weights.
    let (result, _) = service.infer_with_metrics(&bytes)?;

    let mut all: Vec<InferenceMetrics> = Vec::with_capacity(runs);
    for _ in 0..runs {
        let (_, metrics) = service.infer_with_metrics(&bytes)?;
        all.push(metrics);
    }

    // ── Per-Layer Table ────────────────────────────────────────
    println!("  {:<14} {:<18} {:>12} {:>8}", "Layer", "Output", "Mean", "Share");
    println!("  {}", "-".repeat(56));

    let mean_compute = mean(all.iter().map(|m| m.total_compute_duration));
    for (i, layer) in all[0].layer_metrics.iter().enumerate() {
        let layer_mean = mean(all.iter().filter_map(|m| m.layer_metrics.get(i)).map(|l| l.compute_duration));
        let share = if mean_compute.is_zero() {
            0.0
        } else {
            layer_mean.as_secs_f64() / mean_compute.as_secs_f64() * 100.0
        };
        println!(
            "  {:<14} {:<18} {:>10.3}ms {:>7.1}%",
            layer.layer_name,
            layer.output_shape.to_string(),
            layer_mean.as_secs_f64() * 1000.0,
            share,
        );
    }
    println!();

    // ── Latency ────────────────────────────────────────────────
    let mut totals: Vec<Duration> = all.iter().map(|m| m.total_duration).collect();
    totals.sort();
    let ms = |d: Duration| d.as_secs_f64() * 1000.0;
    println!("  Latency:");
    println!("   Mean:         {:.2}ms", ms(mean(totals.iter().copied())));
    println!("   Min / Max:    {:.2}ms / {:.2}ms", ms(totals[0]), ms(totals[totals.len() - 1]));
    println!("   Median:       {:.2}ms", ms(totals[totals.len() / 2]));
    println!(
        "   Preprocess:   {:.2}ms",
        ms(mean(all.iter().map(|m| m.preprocess_duration))),
    );
    println!(
        "   Throughput:   {:.1} images/s (single thread)",
        1.0 / mean(totals.iter().copied()).as_secs_f64().max(f64::EPSILON),
    );
    println!();
    println!("  Prediction: {} ({:.2}%)", result.label, result.confidence);
    println!();

    Ok(())
}

fn mean(durations: impl Iterator<Item = Duration>) -> Duration {
    let (sum, count) = durations.fold((Duration::ZERO, 0u32), |(s, n), d| (s + d, n + 1));
    if count == 0 {
        Duration::ZERO
    } else {
        sum / count
    }
}
