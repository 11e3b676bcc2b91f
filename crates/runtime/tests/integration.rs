// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end classification pipeline.
//!
//! These tests exercise the complete flow from image bytes → preprocessing
//! → network evaluation → classification, proving that the three crates
//! compose correctly. The full-size architecture is only evaluated where
//! the result is known analytically; everything else runs on a small
//! graph with the same input and output shapes.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use model_ir::{architecture, graph::Validated, LayerDef, ModelGraph};
use runtime::{
    ClassificationResult, ImagePreprocessor, InferenceService, Label, NetworkGraph,
    RuntimeConfig, RuntimeError, WeightStore,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tensor_core::{Conv2dParams, Shape, Tensor};

// ── Helpers ────────────────────────────────────────────────────

/// conv(3→2, 3x3, relu, pool) → fc(2048→2) → log_softmax over `[1,3,64,64]`.
fn small_graph() -> ModelGraph<Validated> {
    let conv = LayerDef::conv2d(
        "conv1",
        0,
        &architecture::input_shape(),
        2,
        Conv2dParams::new(3, 1),
        true,
        Some(2),
    )
    .unwrap();
    let fc = LayerDef::linear("fc1", 1, &conv.output_shape, 2, false).unwrap();
    let head = LayerDef::log_softmax(2, &fc.output_shape);
    ModelGraph::new("small".into(), vec![conv, fc, head])
        .validate()
        .unwrap()
}

/// Deterministic, non-constant weights so the two classes differ by image.
fn small_service() -> InferenceService {
    let graph = small_graph();
    let mut tensors = HashMap::new();
    for layer in graph.iter_layers() {
        for (name, shape) in layer.weight_names.iter().zip(&layer.weight_shapes) {
            let values: Vec<f32> = (0..shape.num_elements())
                .map(|i| ((i * 7919 % 101) as f32 - 50.0) * 1e-3)
                .collect();
            tensors.insert(name.clone(), Tensor::from_vec(shape.clone(), values).unwrap());
        }
    }
    let weights = WeightStore::from_tensors(&graph, tensors).unwrap();
    let network = NetworkGraph::new(graph, Arc::new(weights)).unwrap();
    InferenceService::new(network).unwrap()
}

fn png(img: RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn solid_gray() -> Vec<u8> {
    png(RgbImage::from_pixel(64, 64, Rgb([128, 128, 128])))
}

fn gradient(width: u32, height: u32) -> Vec<u8> {
    png(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 200])
    }))
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("xray_rt_it_{}_{name}", std::process::id()))
}

// ── Golden scenarios on the full architecture ──────────────────

#[test]
fn test_golden_solid_gray_ties() {
    // All weights 0.01, biases 0: both fc3 rows are identical, so the two
    // logits are bit-identical and the distribution is exactly uniform.
    let graph = architecture::xray_classifier().unwrap();
    let path = temp_path("golden.safetensors");
    WeightStore::constant(&graph, 0.01, 0.0).save(&path).unwrap();

    let config = RuntimeConfig {
        weights_path: path.clone(),
        ..Default::default()
    };
    let service = InferenceService::from_config(&config);
    std::fs::remove_file(&path).ok();
    let service = service.unwrap();

    let result = service.infer(&solid_gray()).unwrap();
    assert_eq!(result.probabilities[0], result.probabilities[1]);
    assert!((result.probabilities[0] - 0.5).abs() < 1e-6);
    assert_eq!(result.label, Label::Normal);
    assert_eq!(result.confidence, 50.0);

    let response = result.to_response();
    assert_eq!(response.confidence, "50.00%");
    assert_eq!(response.probabilities.normal, "50.00%");
    assert_eq!(response.probabilities.pneumonia, "50.00%");
}

#[test]
fn test_golden_heavier_second_row_predicts_pneumonia() {
    let graph = architecture::xray_classifier().unwrap();
    let mut tensors: HashMap<String, Tensor> = WeightStore::constant(&graph, 0.01, 0.0)
        .iter()
        .map(|(name, tensor)| (name.to_string(), tensor.clone()))
        .collect();
    let fc3 = tensors.get_mut("fc3.weight").unwrap();
    for col in 0..1000 {
        fc3.set(&[1, col], 0.02).unwrap();
    }

    let weights = WeightStore::from_tensors(&graph, tensors).unwrap();
    let network = NetworkGraph::new(graph, Arc::new(weights)).unwrap();
    let service = InferenceService::new(network).unwrap();

    let result = service.infer(&solid_gray()).unwrap();
    assert_eq!(result.label, Label::Pneumonia);
    assert!(result.probability(Label::Pneumonia) > result.probability(Label::Normal));
}

#[test]
fn test_golden_solid_gray_logits() {
    // Same constant weights without the log-softmax head. Every channel of
    // every activation is identical, so the logit is a product of padded
    // box sums; a reference evaluation in f64 gives 665467.40.
    let full = architecture::xray_classifier().unwrap();
    let body: Vec<LayerDef> = full
        .iter_layers()
        .take(full.num_layers() - 1)
        .cloned()
        .collect();
    let graph = ModelGraph::new("xray-logits".into(), body).validate().unwrap();
    let weights = WeightStore::constant(&graph, 0.01, 0.0);
    let network = NetworkGraph::new(graph, Arc::new(weights)).unwrap();

    let input = ImagePreprocessor::new().preprocess(&solid_gray()).unwrap();
    let logits = network.forward(input).unwrap();
    assert_eq!(logits.shape(), &Shape::matrix(1, 2));

    let expected = 665_467.40_f64;
    for &logit in logits.as_f32_slice() {
        let rel = (f64::from(logit) - expected).abs() / expected;
        assert!(rel < 1e-3, "logit {logit} differs from {expected} by {rel:e}");
    }
}

#[test]
fn test_percentages_of_dyadic_pair() {
    let response = ClassificationResult::from_probabilities([0.468_75, 0.531_25]).to_response();
    assert_eq!(response.prediction, Label::Pneumonia);
    assert_eq!(response.confidence, "53.12%");
    assert_eq!(response.probabilities.normal, "46.88%");
    assert_eq!(response.probabilities.pneumonia, "53.12%");
}

// ── Properties ─────────────────────────────────────────────────

#[test]
fn test_probability_properties() {
    let service = small_service();
    let images = [solid_gray(), gradient(64, 64), gradient(640, 480), gradient(3, 200)];

    for bytes in &images {
        let result = service.infer(bytes).unwrap();
        let sum: f32 = result.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "probabilities sum to {sum}");
        assert!(result.probabilities.iter().all(|p| (0.0..=1.0).contains(p)));

        let best = if result.probabilities[1] > result.probabilities[0] { 1 } else { 0 };
        assert_eq!(result.label, Label::ALL[best]);

        let exact = f64::from(result.probabilities[best]) * 100.0;
        assert!((result.confidence - exact).abs() <= 0.005 + 1e-9);

        let response = result.to_response();
        let pct = |s: &str| s.trim_end_matches('%').parse::<f64>().unwrap();
        assert_eq!(pct(&response.confidence), result.confidence);
        let winner = match result.label {
            Label::Normal => &response.probabilities.normal,
            Label::Pneumonia => &response.probabilities.pneumonia,
        };
        assert_eq!(&response.confidence, winner);
        let total = pct(&response.probabilities.normal) + pct(&response.probabilities.pneumonia);
        assert!((total - 100.0).abs() <= 0.011, "percentages sum to {total}");
    }
}

#[test]
fn test_repeated_inference_is_bit_identical() {
    let service = small_service();
    let bytes = gradient(120, 90);
    let first = service.infer(&bytes).unwrap();
    for _ in 0..3 {
        let again = service.infer(&bytes).unwrap();
        assert_eq!(again.probabilities[0].to_bits(), first.probabilities[0].to_bits());
        assert_eq!(again.probabilities[1].to_bits(), first.probabilities[1].to_bits());
        assert_eq!(again, first);
    }
}

#[test]
fn test_corrupt_bytes_are_decode_errors() {
    let service = small_service();
    let mut truncated = solid_gray();
    truncated.truncate(truncated.len() / 2);

    for bytes in [Vec::new(), b"GIF89a nonsense".to_vec(), truncated] {
        let err = service.infer(&bytes).unwrap_err();
        assert!(err.is_decode_error(), "unexpected error: {err}");
        assert!(!err.cause().is_empty());
    }

    // A failed call leaves the service usable.
    assert!(service.infer(&solid_gray()).is_ok());
}

#[test]
fn test_metrics_cover_every_layer() {
    let service = small_service();
    let (result, metrics) = service.infer_with_metrics(&gradient(64, 64)).unwrap();
    assert_eq!(result, service.infer(&gradient(64, 64)).unwrap());

    let names: Vec<_> = metrics.layer_metrics.iter().map(|l| l.layer_name.as_str()).collect();
    assert_eq!(names, ["conv1", "fc1", "log_softmax"]);
    assert!(metrics.total_duration >= metrics.total_compute_duration);
    assert!(metrics.summary().contains("3 layers"));

    let quiet = small_service().with_profiling(false);
    let (_, metrics) = quiet.infer_with_metrics(&gradient(64, 64)).unwrap();
    assert!(metrics.layer_metrics.is_empty());
}

#[test]
fn test_service_rejects_foreign_graph() {
    let fc = LayerDef::linear("fc", 0, &Shape::matrix(1, 4), 2, false).unwrap();
    let head = LayerDef::log_softmax(1, &fc.output_shape);
    let graph = ModelGraph::new("foreign".into(), vec![fc, head])
        .validate()
        .unwrap();
    let weights = Arc::new(WeightStore::constant(&graph, 0.1, 0.0));
    let network = NetworkGraph::new(graph, weights).unwrap();
    assert!(matches!(
        InferenceService::new(network),
        Err(RuntimeError::ModelError(_))
    ));
}

// ── Weight files ───────────────────────────────────────────────

#[test]
fn test_weight_file_mismatch_is_fatal() {
    // A file written for the small graph has a conv1.weight of the wrong
    // shape and lacks conv2..fc3 entirely for the full architecture.
    let path = temp_path("small.safetensors");
    WeightStore::constant(&small_graph(), 0.1, 0.0).save(&path).unwrap();

    let config = RuntimeConfig {
        weights_path: path.clone(),
        ..Default::default()
    };
    let result = InferenceService::from_config(&config);
    let reloaded = WeightStore::load(&path, &small_graph());
    std::fs::remove_file(&path).ok();

    match result {
        Err(RuntimeError::WeightLoadError { tensor, .. }) => assert_eq!(tensor, "conv1.weight"),
        other => panic!("expected WeightLoadError, got {other:?}"),
    }
    assert_eq!(reloaded.unwrap().total_parameters(), 3 * 2 * 9 + 2 + 2 * 2048 + 2);
}

#[test]
fn test_missing_weight_file_is_fatal() {
    let config = RuntimeConfig {
        weights_path: temp_path("does_not_exist.safetensors"),
        ..Default::default()
    };
    assert!(matches!(
        InferenceService::from_config(&config),
        Err(RuntimeError::WeightLoadError { .. })
    ));
}

// ── Concurrency ────────────────────────────────────────────────

#[test]
fn test_concurrent_threads_share_weights() {
    let service = Arc::new(small_service());
    let expected = service.infer(&gradient(80, 80)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || service.infer(&gradient(80, 80)).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_tasks() {
    let service = Arc::new(small_service());
    let images = vec![solid_gray(), gradient(64, 64), b"broken".to_vec()];

    let mut tasks = Vec::new();
    for bytes in images {
        let service = Arc::clone(&service);
        tasks.push(tokio::task::spawn_blocking(move || service.infer(&bytes)));
    }

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.unwrap());
    }
    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_ok());
    assert!(outcomes[2].as_ref().unwrap_err().is_decode_error());
}

// ── Config ─────────────────────────────────────────────────────

#[test]
fn test_config_toml_roundtrip() {
    let config = RuntimeConfig {
        weights_path: PathBuf::from("/srv/xray.safetensors"),
        enable_profiling: false,
        num_threads: Some(2),
    };
    let toml = config.to_toml().unwrap();
    let back = RuntimeConfig::from_toml(&toml).unwrap();
    assert_eq!(back.weights_path, config.weights_path);
    assert!(!back.enable_profiling);
    assert_eq!(back.resolve_threads(), 2);
}
