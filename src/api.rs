//! HTTP surface for the claim decision service.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /process-claim` – Evaluate one claim against one uploaded policy document.
//!   Accepts a multipart form with a `query` text field and a `file` upload, and returns
//!   the structured decision payload in the query's language.
//! - `GET /health` – Liveness probe with a timestamp.
//! - `GET /languages` – Machine-readable table of supported response languages.
//! - `GET /metrics` – Observe claim and document counters.
//!
//! Fatal pipeline errors (unreadable or empty documents) come back as `422` with the
//! message translated into the query's language; malformed uploads come back as `400`.

use crate::language::Lang;
use crate::processing::{ClaimApi, ClaimError, ClaimResult};
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Build the HTTP router exposing the claim API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ClaimApi + 'static,
{
    Router::new()
        .route("/process-claim", post(process_claim::<S>))
        .route("/health", get(get_health))
        .route("/languages", get(get_languages))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Evaluate a claim query against an uploaded policy document.
///
/// The multipart form carries the free-text `query` (in any supported language) and the
/// policy `file` (PDF, DOCX, EML, or plain text). The whole pipeline runs per request;
/// repeated uploads of the same document reuse its cached clause embeddings.
async fn process_claim<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<ClaimResult>, AppError>
where
    S: ClaimApi,
{
    let mut query: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("query") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Unreadable query field: {e}")))?;
                query = Some(text);
            }
            Some("file") => {
                filename = Some(
                    field
                        .file_name()
                        .unwrap_or("document.txt")
                        .to_string(),
                );
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Unreadable file field: {e}")))?;
                bytes = Some(data.to_vec());
            }
            _ => {}
        }
    }

    let query = query.ok_or_else(|| AppError::bad_request("Missing 'query' field".to_string()))?;
    let (filename, bytes) = match (filename, bytes) {
        (Some(name), Some(data)) => (name, data),
        _ => return Err(AppError::bad_request("Missing 'file' upload".to_string())),
    };

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, filename, "Claim request received");
    match service.process_claim(&query, &filename, &bytes).await {
        Ok(result) => Ok(Json(result)),
        Err(error) => {
            tracing::warn!(%request_id, %error, filename, "Claim processing failed");
            let message = service.localize_error(&error.to_string(), &query).await;
            Err(AppError::unprocessable(error, message))
        }
    }
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

/// Liveness probe.
async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    })
}

/// One supported language in the `GET /languages` table.
#[derive(Serialize)]
struct LanguageDescriptor {
    code: &'static str,
    name: &'static str,
}

/// Response body for `GET /languages`.
#[derive(Serialize)]
struct LanguagesResponse {
    languages: Vec<LanguageDescriptor>,
}

/// Enumerate the languages claims can be submitted and answered in.
async fn get_languages() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: Lang::ALL
            .into_iter()
            .map(|lang| LanguageDescriptor {
                code: lang.code(),
                name: lang.display_name(),
            })
            .collect(),
    })
}

/// Return claim and document counters for observability.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: ClaimApi,
{
    Json(service.metrics_snapshot())
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    fn unprocessable(_error: ClaimError, message: String) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::extraction::ExtractionError;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        ClaimApi, ClaimError, ClaimResult, QueryDetails,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "claim-test-boundary";

    fn multipart_body(query: &str, filename: &str, document: &str) -> (String, String) {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"query\"\r\n\r\n\
             {query}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {document}\r\n\
             --{BOUNDARY}--\r\n"
        );
        (
            format!("multipart/form-data; boundary={BOUNDARY}"),
            body,
        )
    }

    fn sample_result() -> ClaimResult {
        ClaimResult {
            query_details: QueryDetails {
                age: Some(46),
                gender: Some("Male".into()),
                procedure: Some("knee surgery".into()),
                location: Some("Pune".into()),
                policy_duration: Some(3),
            },
            decision: "Rejected".into(),
            amount: None,
            justification: "Policy has 36-month waiting period. Current duration: 3 months."
                .into(),
            confidence: 0.91,
            relevant_clauses: vec![],
            language: "English".into(),
            processed_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[derive(Clone, Debug)]
    struct ClaimCall {
        query: String,
        filename: String,
        bytes: Vec<u8>,
    }

    struct StubClaimService {
        calls: Arc<Mutex<Vec<ClaimCall>>>,
        outcome: Result<ClaimResult, ClaimError>,
    }

    impl StubClaimService {
        fn new(outcome: Result<ClaimResult, ClaimError>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                outcome,
            }
        }

        async fn recorded_calls(&self) -> Vec<ClaimCall> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl ClaimApi for StubClaimService {
        async fn process_claim(
            &self,
            query: &str,
            filename: &str,
            bytes: &[u8],
        ) -> Result<ClaimResult, ClaimError> {
            let mut guard = self.calls.lock().await;
            guard.push(ClaimCall {
                query: query.to_string(),
                filename: filename.to_string(),
                bytes: bytes.to_vec(),
            });
            match &self.outcome {
                Ok(result) => Ok(result.clone()),
                Err(ClaimError::EmptyDocument) => Err(ClaimError::EmptyDocument),
                Err(ClaimError::Extraction(_)) => {
                    Err(ClaimError::Extraction(ExtractionError::NoText))
                }
            }
        }

        async fn localize_error(&self, message: &str, _query: &str) -> String {
            message.to_string()
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                claims_processed: 7,
                documents_parsed: 4,
                clauses_segmented: 120,
            }
        }
    }

    #[tokio::test]
    async fn process_claim_route_forwards_query_and_file() {
        let service = Arc::new(StubClaimService::new(Ok(sample_result())));
        let app = create_router(service.clone());

        let (content_type, body) = multipart_body(
            "46-year-old male, knee surgery in Pune, 3-month-old insurance policy",
            "policy.txt",
            "Knee surgery has a 36-month waiting period before claims are admissible.",
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/process-claim")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["Decision"], "Rejected");
        assert_eq!(json["QueryDetails"]["age"], 46);
        assert_eq!(json["Language"], "English");

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filename, "policy.txt");
        assert!(calls[0].query.contains("knee surgery"));
        assert!(!calls[0].bytes.is_empty());
    }

    #[tokio::test]
    async fn missing_query_field_is_a_bad_request() {
        let service = Arc::new(StubClaimService::new(Ok(sample_result())));
        let app = create_router(service);

        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"policy.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             some document\r\n\
             --{BOUNDARY}--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/process-claim")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_document_maps_to_unprocessable() {
        let service = Arc::new(StubClaimService::new(Err(ClaimError::EmptyDocument)));
        let app = create_router(service);

        let (content_type, body) = multipart_body("knee surgery claim", "policy.txt", "x");
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/process-claim")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["error"], "No content extracted from document");
    }

    #[tokio::test]
    async fn health_reports_status_and_timestamp() {
        let service = Arc::new(StubClaimService::new(Ok(sample_result())));
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["status"], "healthy");
        assert!(json["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn languages_table_lists_twelve_entries() {
        let service = Arc::new(StubClaimService::new(Ok(sample_result())));
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/languages")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        let languages = json["languages"].as_array().expect("array");
        assert_eq!(languages.len(), 12);
        assert!(languages
            .iter()
            .any(|l| l["code"] == "en" && l["name"] == "English"));
    }

    #[tokio::test]
    async fn metrics_route_returns_counters() {
        let service = Arc::new(StubClaimService::new(Ok(sample_result())));
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["claims_processed"], 7);
        assert_eq!(json["documents_parsed"], 4);
        assert_eq!(json["clauses_segmented"], 120);
    }
}
