// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # xray-rt
//!
//! Command-line interface for the chest X-ray classification runtime.
//!
//! ## Usage
//! ```bash
//! # Classify one or more images (one JSON response per line)
//! xray-rt classify --weights ./results/xray_classifier.safetensors chest1.png chest2.jpeg
//!
//! # Inspect the architecture and verify a weight file
//! xray-rt inspect --weights ./results/xray_classifier.safetensors
//!
//! # Write a constant-valued weight file for testing
//! xray-rt fixture --out ./fixture.safetensors --weight-value 0.01
//!
//! # Benchmark inference
//! xray-rt benchmark --weights ./fixture.safetensors --image chest1.png --runs 20
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "xray-rt",
    about = "Chest X-ray NORMAL / PNEUMONIA classification runtime",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (command-line flags take precedence).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify images and print one JSON response per image.
    Classify {
        /// Path to the SafeTensors weight file.
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Maximum number of images classified concurrently.
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Image files to classify.
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Print the architecture and, given a weight file, verify every tensor.
    Inspect {
        /// Path to the SafeTensors weight file.
        #[arg(short, long)]
        weights: Option<PathBuf>,
    },

    /// Write a constant-valued weight file for the fixed architecture.
    Fixture {
        /// Output path.
        #[arg(short, long)]
        out: PathBuf,

        /// Value of every weight element.
        #[arg(long, default_value_t = 0.01)]
        weight_value: f32,

        /// Value of every bias element.
        #[arg(long, default_value_t = 0.0)]
        bias_value: f32,
    },

    /// Run repeated inference on one image and report per-layer timings.
    Benchmark {
        /// Path to the SafeTensors weight file.
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Image file to classify.
        #[arg(short, long)]
        image: PathBuf,

        /// Number of timed runs (after one warm-up run).
        #[arg(short, long, default_value_t = 10)]
        runs: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify {
            weights,
            threads,
            images,
        } => commands::classify::execute(config, weights, threads, images).await,
        Commands::Inspect { weights } => {
            let config_file = cli.config.is_some().then_some(&config);
            commands::inspect::execute(commands::inspect::resolve_weights(weights, config_file))
        }
        Commands::Fixture {
            out,
            weight_value,
            bias_value,
        } => commands::fixture::execute(out, weight_value, bias_value),
        Commands::Benchmark {
            weights,
            image,
            runs,
        } => commands::benchmark::execute(config, weights, image, runs),
    }
}
