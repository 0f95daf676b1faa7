//! Single-page inference form
//!
//! `GET /` renders the model summary and an eleven-field form, `POST /predict`
//! runs the model on the submitted values and renders the page again with the
//! predicted stress score. `POST /api/predict` is the JSON equivalent.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::model::Predictor;
use crate::types::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

/// Shared router state: the predictor handle built once at start-up
#[derive(Clone)]
pub struct AppState {
    predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(predictor: Arc<Predictor>) -> Self {
        Self { predictor }
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_json))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Bind `addr` and serve the router until the process is stopped
pub async fn serve(addr: &str, state: AppState) -> Result<(), ComputeError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "serving stress form");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(state.predictor(), &PageView::default()))
}

async fn predict_form(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let submitted: Vec<String> = (1..=FEATURE_COUNT)
        .map(|i| fields.get(&field_name(i)).cloned().unwrap_or_default())
        .collect();

    let outcome = parse_fields(&fields).and_then(|features| {
        state
            .predictor()
            .predict_clamped(features.as_slice())
            .map_err(|e| e.to_string())
    });

    match outcome {
        Ok(score) => {
            tracing::debug!(score, "form prediction");
            let view = PageView {
                values: submitted,
                output: Some(format!("{:.2}", score)),
                alert: None,
            };
            Html(render_page(state.predictor(), &view)).into_response()
        }
        Err(alert) => {
            let view = PageView {
                values: submitted,
                output: None,
                alert: Some(alert),
            };
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render_page(state.predictor(), &view)),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PredictRequest {
    features: Vec<f64>,
    #[serde(default = "default_clamp")]
    clamp: bool,
}

fn default_clamp() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    prediction: f64,
    clamped: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

async fn predict_json(State(state): State<AppState>, Json(body): Json<PredictRequest>) -> Response {
    let predictor = state.predictor();
    let result = if body.clamp {
        predictor.predict_clamped(&body.features)
    } else {
        predictor.predict_raw(&body.features)
    };

    match result {
        Ok(prediction) => Json(PredictResponse {
            prediction,
            clamped: body.clamp,
        })
        .into_response(),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

fn field_name(index: usize) -> String {
    format!("float{}", index)
}

/// Read `float1`..`float11` into a feature vector
fn parse_fields(fields: &HashMap<String, String>) -> Result<FeatureVector, String> {
    let mut values = [0.0; FEATURE_COUNT];
    for (i, slot) in values.iter_mut().enumerate() {
        let name = field_name(i + 1);
        let raw = fields
            .get(&name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| format!("Missing value for {} ({})", name, FEATURE_NAMES[i]))?;
        *slot = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{}' is not a number ({})", raw, FEATURE_NAMES[i]))?;
    }
    Ok(FeatureVector::new(values))
}

#[derive(Debug, Default)]
struct PageView {
    values: Vec<String>,
    output: Option<String>,
    alert: Option<String>,
}

fn render_page(predictor: &Predictor, view: &PageView) -> String {
    let mut inputs = String::new();
    for (i, label) in FEATURE_NAMES.iter().enumerate() {
        let value = view.values.get(i).map(String::as_str).unwrap_or("");
        inputs.push_str(&format!(
            "      <label>{label}<input type=\"number\" step=\"any\" name=\"{name}\" value=\"{value}\" required></label>\n",
            label = label,
            name = field_name(i + 1),
            value = html_escape::encode_double_quoted_attribute(value),
        ));
    }

    let alert = view
        .alert
        .as_deref()
        .map(|a| format!("    <p class=\"alert\">{}</p>\n", html_escape::encode_text(a)))
        .unwrap_or_default();
    let output = view
        .output
        .as_deref()
        .map(|o| format!("    <p class=\"output\">Predicted stress score: <strong>{}</strong></p>\n", o))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Stress score</title>
  </head>
  <body>
    <h1>Stress score</h1>
    <pre class="summary">{summary}</pre>
{alert}{output}    <form method="post" action="/predict">
{inputs}      <button type="submit">Predict</button>
    </form>
  </body>
</html>
"#,
        summary = html_escape::encode_text(&predictor.summary()),
        alert = alert,
        output = output,
        inputs = inputs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_models::sum_model;
    use axum::body::{self, Body};
    use axum::http::Request;
    use tower::ServiceExt as _;

    const BODY_LIMIT: usize = 1024 * 1024;

    fn test_router(bias: f64) -> Router {
        router(AppState::new(Arc::new(sum_model(bias))))
    }

    fn form_body(values: &[&str]) -> String {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("float{}={}", i + 1, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn body_string(resp: Response) -> String {
        let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let resp = test_router(0.0).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "ok");
    }

    #[tokio::test]
    async fn test_index_renders_form_and_summary() {
        let req = Request::get("/").body(Body::empty()).unwrap();
        let resp = test_router(0.0).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains("Model: &quot;sum&quot;") || html.contains("Model: \"sum\""));
        assert!(html.contains("name=\"float1\""));
        assert!(html.contains("name=\"float11\""));
        assert!(!html.contains("Predicted stress score"));
    }

    #[tokio::test]
    async fn test_form_prediction() {
        let values = ["1"; FEATURE_COUNT];
        let req = Request::post("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form_body(&values)))
            .unwrap();
        let resp = test_router(10.0).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains("Predicted stress score: <strong>21.00</strong>"));
    }

    #[tokio::test]
    async fn test_form_prediction_is_clamped() {
        let values = ["50"; FEATURE_COUNT];
        let req = Request::post("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form_body(&values)))
            .unwrap();
        let resp = test_router(0.0).oneshot(req).await.unwrap();

        let html = body_string(resp).await;
        assert!(html.contains("<strong>100.00</strong>"));
    }

    #[tokio::test]
    async fn test_form_rejects_non_numeric_value() {
        let mut values = ["1"; FEATURE_COUNT];
        values[4] = "abc";
        let req = Request::post("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form_body(&values)))
            .unwrap();
        let resp = test_router(0.0).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_string(resp).await;
        assert!(html.contains("class=\"alert\""));
        assert!(html.contains("spo2_average"));
    }

    #[tokio::test]
    async fn test_form_rejects_missing_field() {
        let values = ["1"; FEATURE_COUNT - 1];
        let req = Request::post("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form_body(&values)))
            .unwrap();
        let resp = test_router(0.0).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_string(resp).await.contains("Missing value for float11"));
    }

    #[tokio::test]
    async fn test_json_clamp_false_returns_raw_output() {
        let app = test_router(-5.0);

        let req = Request::post("/api/predict")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "features": vec![0.0f64; 11], "clamp": false }).to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(v["prediction"], -5.0);
        assert_eq!(v["clamped"], false);

        let req = Request::post("/api/predict")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "features": vec![0.0f64; 11] }).to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(v["prediction"], 0.0);
        assert_eq!(v["clamped"], true);
    }

    #[tokio::test]
    async fn test_json_rejects_unknown_field() {
        let req = Request::post("/api/predict")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "features": vec![0.0f64; 11], "raw": true }).to_string(),
            ))
            .unwrap();
        let resp = test_router(-5.0).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_json_shape_error() {
        let req = Request::post("/api/predict")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "features": [1.0, 2.0] }).to_string()))
            .unwrap();
        let resp = test_router(0.0).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let v: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert!(v["error"].as_str().unwrap().contains("expected 11"));
    }
}
