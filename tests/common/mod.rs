//! Artifact fixtures written into temporary model directories.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use symptom_ensemble::config::ModelsConfig;
use symptom_ensemble::schema::fingerprint;

pub const COLUMNS: [&str; 4] = ["age", "gender_male", "fever", "cough"];
pub const CLASSES: [&str; 2] = ["flu", "cold"];

pub fn write_schemas(dir: &Path) {
    fs::write(dir.join("cols.json"), json!(COLUMNS).to_string()).unwrap();
    fs::write(
        dir.join("label_map.json"),
        json!({ "classes": CLASSES }).to_string(),
    )
    .unwrap();
}

pub fn envelope(model: Value) -> Value {
    json!({
        "format_version": 1,
        "feature_checksum": fingerprint(COLUMNS),
        "label_checksum": fingerprint(CLASSES),
        "model": model,
    })
}

/// Single-leaf tree that always predicts `ordinal`.
pub fn constant_tree(ordinal: usize) -> Value {
    let mut value = vec![0.0; CLASSES.len()];
    value[ordinal] = 1.0;
    json!({
        "kind": "decision_tree",
        "n_features": COLUMNS.len(),
        "n_classes": CLASSES.len(),
        "children_left": [-1],
        "children_right": [-1],
        "feature": [-2],
        "threshold": [-2.0],
        "value": [value],
    })
}

/// Tree voting flu (0) when fever is present, cold (1) otherwise.
pub fn fever_tree() -> Value {
    json!({
        "kind": "decision_tree",
        "n_features": COLUMNS.len(),
        "n_classes": CLASSES.len(),
        "children_left": [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature": [2, -2, -2],
        "threshold": [0.5, -2.0, -2.0],
        "value": [[5.0, 5.0], [1.0, 9.0], [9.0, 1.0]],
    })
}

/// Forest of fever trees.
pub fn fever_forest() -> Value {
    let mut tree = fever_tree();
    tree.as_object_mut().unwrap().remove("kind");
    json!({
        "kind": "random_forest",
        "n_features": COLUMNS.len(),
        "n_classes": CLASSES.len(),
        "trees": [tree.clone(), tree],
    })
}

/// Binary logistic model: cough pushes toward cold, fever toward flu.
pub fn cough_logistic() -> Value {
    json!({
        "kind": "logistic_regression",
        "n_features": COLUMNS.len(),
        "coef": [[0.0, 0.0, -3.0, 2.0]],
        "intercept": [-0.5],
    })
}

pub fn write_model(dir: &Path, stem: &str, artifact: &Value) {
    fs::write(dir.join(format!("{}.json", stem)), artifact.to_string()).unwrap();
}

pub fn models_config(dir: &Path) -> ModelsConfig {
    ModelsConfig {
        models_dir: dir.to_string_lossy().into_owned(),
        feature_schema_file: "cols.json".to_string(),
        label_schema_file: "label_map.json".to_string(),
        require_checksums: true,
        onnx_threads: 1,
    }
}
