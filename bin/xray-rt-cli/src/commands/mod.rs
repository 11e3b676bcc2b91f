// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared CLI plumbing.

pub mod benchmark;
pub mod classify;
pub mod fixture;
pub mod inspect;

use runtime::RuntimeConfig;
use std::path::Path;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows the `-v` count:
/// warn, info, debug, trace. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the TOML config if one was given, else returns the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(path) => {
            let config = RuntimeConfig::from_file(path)?;
            tracing::info!("loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(RuntimeConfig::default()),
    }
}
