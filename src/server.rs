//! Axum HTTP server: the submission and reporting endpoints.
//!
//! Both handlers are stateless units of work against the shared record
//! store; every filesystem await completes before the request resolves.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/submit` | Persist one survey submission |
//! | GET | `/api/results` | Full ordered result set with averages |

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::models::{QuestionCatalog, RawSubmission, SurveyRecord};
use crate::results::ResultSet;
use crate::store::RecordStore;

/// Shared handler state: the storage seam plus the immutable question
/// catalog, both built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub catalog: Arc<QuestionCatalog>,
}

pub fn create_router(state: AppState, permissive_cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(handle_health_check))
        .route("/api/submit", post(handle_submit))
        .route("/api/results", get(handle_results))
        .with_state(state);

    if permissive_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

type HandlerError = (StatusCode, Json<serde_json::Value>);

fn error_response(status: StatusCode, msg: &str) -> HandlerError {
    (status, Json(json!({ "error": msg })))
}

fn submit_failure(status: StatusCode, msg: &str) -> HandlerError {
    (status, Json(json!({ "success": false, "message": msg })))
}

/// Best-effort caller network identifier: forwarded-for header, then
/// the direct-connection header, then `"unknown"`.
fn client_origin(headers: &HeaderMap) -> String {
    for name in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    "unknown".to_string()
}

async fn handle_health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

async fn handle_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RawSubmission>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    // Reject before any filesystem mutation.
    let submission = payload
        .validate()
        .map_err(|e| submit_failure(StatusCode::BAD_REQUEST, &e.to_string()))?;

    let origin = client_origin(&headers);
    let record = SurveyRecord::stamped(submission, origin);

    if let Err(e) = state.store.append(record).await {
        // Full detail stays in the operator log; the caller gets a
        // generic indicator.
        error!(error = ?e, "survey submission failed");
        return Err(submit_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store submission",
        ));
    }

    info!("survey submission stored");
    Ok(Json(json!({
        "success": true,
        "message": "Survey submitted successfully",
    })))
}

async fn handle_results(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    let snapshot = match state.store.scan_all().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = ?e, "failed to scan record store");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch results",
            ));
        }
    };

    let results = ResultSet::from_scan(snapshot);
    let averages: serde_json::Map<String, serde_json::Value> = results
        .averages(&state.catalog)
        .into_iter()
        .map(|(id, avg)| (id, json!(avg)))
        .collect();

    Ok(Json(json!({
        "results": results.records(),
        "averages": averages,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use std::collections::BTreeMap;

    fn test_state(dir: &std::path::Path) -> AppState {
        AppState {
            store: Arc::new(FileStore::new(dir.join("survey-results"))),
            catalog: Arc::new(QuestionCatalog::nasa_tlx()),
        }
    }

    fn payload(id: &str, responses: &[(&str, i64)]) -> RawSubmission {
        RawSubmission {
            participant_id: id.to_string(),
            participant_name: "Tester".to_string(),
            condition: Some("baseline".to_string()),
            responses: responses
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_client_origin_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "198.51.100.4".parse().unwrap());
        headers.insert("x-real-ip", "203.0.113.9".parse().unwrap());
        assert_eq!(client_origin(&headers), "198.51.100.4");
    }

    #[test]
    fn test_client_origin_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.9".parse().unwrap());
        assert_eq!(client_origin(&headers), "203.0.113.9");
    }

    #[test]
    fn test_client_origin_unknown_without_headers() {
        assert_eq!(client_origin(&HeaderMap::new()), "unknown");
    }

    #[tokio::test]
    async fn test_submit_then_results_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let body = handle_submit(
            State(state.clone()),
            HeaderMap::new(),
            Json(payload("P01", &[("mental", 40), ("effort", 60)])),
        )
        .await
        .unwrap();
        assert_eq!(body.0["success"], json!(true));

        let results = handle_results(State(state)).await.unwrap();
        let rows = results.0["results"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["participantId"], "P01");
        assert_eq!(rows[0]["ip"], "unknown");
        assert_eq!(rows[0]["responses"]["mental"], 40);
        assert_eq!(results.0["averages"]["mental"], json!(40.0));
        assert_eq!(results.0["averages"]["frustration"], json!(0.0));
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_id_without_touching_storage() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, body) = handle_submit(
            State(state),
            HeaderMap::new(),
            Json(payload("  ", &[("mental", 40)])),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["success"], json!(false));
        // Fail-fast: no directory churn on invalid input.
        assert!(!dir.path().join("survey-results").exists());
    }

    #[tokio::test]
    async fn test_results_empty_store_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let results = handle_results(State(state)).await.unwrap();
        assert_eq!(results.0["results"], json!([]));
    }
}
