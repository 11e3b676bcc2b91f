// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! weights_path = "./results/xray_classifier.safetensors"
//! enable_profiling = true
//! num_threads = 4
//! ```

use std::path::{Path, PathBuf};

/// Configuration for the inference runtime.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Path to the SafeTensors weight file.
    pub weights_path: PathBuf,
    /// Whether to record per-layer profiling metrics.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
    /// Number of concurrent classifications (defaults to number of online CPU cores).
    pub num_threads: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, super::RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::RuntimeError::ConfigError(format!(
                "cannot read config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, super::RuntimeError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            super::RuntimeError::ConfigError(format!("TOML parse error: {e}"))
        })?;
        if config.num_threads == Some(0) {
            return Err(super::RuntimeError::ConfigError(
                "num_threads must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, super::RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| {
            super::RuntimeError::ConfigError(format!("TOML serialise error: {e}"))
        })
    }

    /// Resolves the number of worker threads.
    pub fn resolve_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            weights_path: PathBuf::from("./results/xray_classifier.safetensors"),
            enable_profiling: true,
            num_threads: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert_eq!(
            c.weights_path,
            PathBuf::from("./results/xray_classifier.safetensors")
        );
        assert!(c.enable_profiling);
        assert!(c.num_threads.is_none());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
weights_path = "/tmp/weights.safetensors"
num_threads = 2
enable_profiling = false
"#;
        let c = RuntimeConfig::from_toml(toml).unwrap();
        assert_eq!(c.weights_path, PathBuf::from("/tmp/weights.safetensors"));
        assert_eq!(c.num_threads, Some(2));
        assert!(!c.enable_profiling);
    }

    #[test]
    fn test_profiling_defaults_on() {
        let c = RuntimeConfig::from_toml(r#"weights_path = "w.safetensors""#).unwrap();
        assert!(c.enable_profiling);
    }

    #[test]
    fn test_from_toml_errors() {
        assert!(RuntimeConfig::from_toml("enable_profiling = true").is_err());
        assert!(RuntimeConfig::from_toml("weights_path = ").is_err());
        let zero = "weights_path = \"w\"\nnum_threads = 0";
        assert!(matches!(
            RuntimeConfig::from_toml(zero),
            Err(crate::RuntimeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("xray_rt_missing_config.toml");
        assert!(RuntimeConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = RuntimeConfig {
            num_threads: Some(3),
            ..Default::default()
        };
        let toml = c.to_toml().unwrap();
        let back = RuntimeConfig::from_toml(&toml).unwrap();
        assert_eq!(back.weights_path, c.weights_path);
        assert_eq!(back.num_threads, Some(3));
    }

    #[test]
    fn test_resolve_threads() {
        let c = RuntimeConfig {
            num_threads: Some(8),
            ..Default::default()
        };
        assert_eq!(c.resolve_threads(), 8);

        let c2 = RuntimeConfig {
            num_threads: None,
            ..Default::default()
        };
        assert!(c2.resolve_threads() >= 1);
    }
}
