#![allow(dead_code)]
use axum::{body::Body, http::Request, Router};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

use hvac_energy_advisor::api;
use hvac_energy_advisor::config::{Config, ReloadPolicy};
use hvac_energy_advisor::controller::AppState;

pub const WEDNESDAY_2PM: &str = "2024-03-13T14:00:00+00:00";

pub fn write_identity_scaler(dir: &Path) {
    let json = serde_json::json!({ "mean": vec![0.0; 12], "scale": vec![1.0; 12] });
    fs::write(dir.join("scaler.json"), json.to_string()).unwrap();
}

/// Linear model predicting `Energy_Lag1 * weight + intercept` on an identity scaler.
pub fn write_lag_model(dir: &Path, file: &str, weight: f64, intercept: f64) {
    let mut coefficients = vec![0.0; 12];
    coefficients[11] = weight;
    let json = serde_json::json!({
        "kind": "linear",
        "coefficients": coefficients,
        "intercept": intercept,
    });
    fs::write(dir.join(file), json.to_string()).unwrap();
}

/// Single-stump forest: 20 kWh below 30 °C, 40 kWh otherwise.
pub fn write_temperature_forest(dir: &Path, file: &str) {
    let json = serde_json::json!({
        "kind": "tree_ensemble",
        "aggregation": "mean",
        "trees": [{
            "nodes": [
                {"feature": 0, "threshold": 30.0, "left": 1, "right": 2},
                {"leaf": 20.0},
                {"leaf": 40.0}
            ]
        }]
    });
    fs::write(dir.join(file), json.to_string()).unwrap();
}

pub fn app(dir: &Path, reload: ReloadPolicy) -> Router {
    let mut cfg = Config::default();
    cfg.models.dir = dir.to_path_buf();
    cfg.models.reload = reload;
    let state = AppState::new(cfg.clone()).unwrap();
    api::router(state, &cfg)
}

pub fn full_model_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_identity_scaler(tmp.path());
    write_lag_model(tmp.path(), "xgb_model.json", 1.0, 0.0);
    write_temperature_forest(tmp.path(), "rf_model.json");
    write_lag_model(tmp.path(), "lgbm_model.json", 1.0, 2.0);
    write_lag_model(tmp.path(), "cat_model.json", 0.9, 0.0);
    tmp
}

pub async fn send(app: &Router, request: Request<Body>) -> (axum::http::StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
