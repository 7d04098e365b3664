//! HTTP surface for the document parser.
//!
//! - `POST /api/parse` – Multipart upload with a `file` part and a `doc_type` field. Runs OCR,
//!   asks the model for the matching schema, and returns the JSON record. Model and parse
//!   failures still answer `200` with an `{error, raw_output}` body; only a missing part is a
//!   `400`.
//! - `GET /metrics` – Parse counters since startup.
//! - `GET /commands` – Machine-readable catalog of the endpoints above.

use crate::processing::{DocumentType, ParseApi, ProcessingError, Upload};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const MISSING_PARTS_MESSAGE: &str = "Missing 'file' or 'doc_type'";

/// Build the HTTP router exposing the parse API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ParseApi + 'static,
{
    Router::new()
        .route("/api/parse", post(parse_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Parse an uploaded document image into a structured record.
async fn parse_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError>
where
    S: ParseApi,
{
    let request_id = Uuid::new_v4();
    // Empty or non-multipart bodies cannot carry a file part.
    let Ok(mut multipart) = multipart else {
        tracing::info!(%request_id, "Rejected parse request without multipart body");
        return Ok(bad_request(MISSING_PARTS_MESSAGE));
    };
    let mut upload: Option<Upload> = None;
    let mut doc_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        let filename = field.file_name().map(str::to_string);
        match (name.as_deref(), filename) {
            // A `file` part without a filename is a plain form value, not an upload.
            (Some("file"), Some(filename)) => {
                let bytes = field.bytes().await?;
                upload = Some(Upload {
                    filename: Some(filename),
                    bytes: bytes.to_vec(),
                });
            }
            (Some("doc_type"), _) => doc_type = Some(field.text().await?),
            _ => {}
        }
    }

    let (Some(upload), Some(doc_type)) = (upload, doc_type) else {
        tracing::info!(%request_id, "Rejected parse request with missing parts");
        return Ok(bad_request(MISSING_PARTS_MESSAGE));
    };

    tracing::info!(
        %request_id,
        doc_type = %doc_type,
        known_type = doc_type.parse::<DocumentType>().is_ok(),
        bytes = upload.bytes.len(),
        "Parse request received"
    );
    let record = service.parse_document(upload, &doc_type).await?;
    tracing::info!(%request_id, "Parse request completed");
    Ok(Json(record).into_response())
}

fn bad_request(message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Return parse counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsResponse>
where
    S: ParseApi,
{
    let snapshot = service.metrics_snapshot();
    Json(MetricsResponse {
        documents_parsed: snapshot.documents_parsed,
        records_extracted: snapshot.records_extracted,
        error_records: snapshot.error_records,
    })
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    documents_parsed: u64,
    records_extracted: u64,
    error_records: u64,
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    let doc_types: Vec<&str> = DocumentType::ALL.iter().map(|t| t.as_str()).collect();
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "parse",
                method: "POST",
                path: "/api/parse",
                description: "Upload a document image as multipart `file` with a `doc_type` field; returns the extracted JSON record or { \"error\", \"raw_output\" }.",
                request_example: Some(json!({
                    "file": "<binary image>",
                    "doc_type": doc_types,
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return parse counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Multipart(MultipartError),
    Processing(ProcessingError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Multipart(error) => {
                let status = error.status();
                tracing::info!(error = %error, %status, "Rejected multipart body");
                error_response(status, &error.body_text())
            }
            Self::Processing(error) => {
                tracing::error!(error = %error, "Parse request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_UPLOAD_BYTES, create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::ocr::OcrError;
    use crate::processing::{ParseApi, ParsedRecord, ProcessingError, Upload};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docparse-boundary";

    #[tokio::test]
    async fn commands_catalog_exposes_parse_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let parse = commands
            .iter()
            .find(|cmd| cmd.name == "parse")
            .expect("parse command present");

        assert_eq!(parse.method, "POST");
        assert_eq!(parse.path, "/api/parse");
        let example = parse.request_example.as_ref().expect("example");
        assert_eq!(example["doc_type"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn parse_route_forwards_upload_and_doc_type() {
        let service = Arc::new(StubParseService::returning(Ok(
            json!({"document_type": "Resume", "full_name": "Jane Doe"}),
        )));
        let app = create_router(service.clone());

        let body = multipart_body(Some(("cv.png", b"fake-image")), Some("Resume"));
        let response = app.oneshot(parse_request(body)).await.expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["full_name"], "Jane Doe");

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.filename.as_deref(), Some("cv.png"));
        assert_eq!(calls[0].0.bytes, b"fake-image");
        assert_eq!(calls[0].1, "Resume");
    }

    #[tokio::test]
    async fn parse_route_rejects_missing_file() {
        let service = Arc::new(StubParseService::returning(Ok(json!({}))));
        let app = create_router(service.clone());

        let body = multipart_body(None, Some("Shop Receipt"));
        let response = app.oneshot(parse_request(body)).await.expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_json(response).await,
            json!({"error": "Missing 'file' or 'doc_type'"})
        );
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn parse_route_rejects_missing_doc_type() {
        let service = Arc::new(StubParseService::returning(Ok(json!({}))));
        let app = create_router(service.clone());

        let body = multipart_body(Some(("id.png", b"bytes")), None);
        let response = app.oneshot(parse_request(body)).await.expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn error_records_keep_success_status() {
        let record = json!({"error": "upstream_unreachable: connection refused", "raw_output": ""});
        let service = Arc::new(StubParseService::returning(Ok(record.clone())));
        let app = create_router(service);

        let body = multipart_body(Some(("r.png", b"bytes")), Some("Shop Receipt"));
        let response = app.oneshot(parse_request(body)).await.expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, record);
    }

    #[tokio::test]
    async fn ocr_faults_surface_as_server_errors() {
        let service = Arc::new(StubParseService::returning(Err(|| {
            ProcessingError::Ocr(OcrError::CommandFailed {
                command: "tesseract".into(),
                status: "exit status: 1".into(),
                stderr: "Error in pixReadStream".into(),
            })
        })));
        let app = create_router(service);

        let body = multipart_body(Some(("r.png", b"bytes")), Some("Driving License"));
        let response = app.oneshot(parse_request(body)).await.expect("router response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn parse_route_rejects_non_multipart_bodies_with_json() {
        let service = Arc::new(StubParseService::returning(Ok(json!({}))));
        let requests = [
            Request::builder()
                .method(Method::POST)
                .uri("/api/parse")
                .body(Body::empty())
                .expect("request"),
            Request::builder()
                .method(Method::POST)
                .uri("/api/parse")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("doc_type=Resume"))
                .expect("request"),
        ];

        for request in requests {
            let app = create_router(service.clone());
            let response = app.oneshot(request).await.expect("router response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                response
                    .headers()
                    .get("content-type")
                    .and_then(|value| value.to_str().ok()),
                Some("application/json")
            );
            assert_eq!(
                response_json(response).await,
                json!({"error": "Missing 'file' or 'doc_type'"})
            );
        }
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn file_part_without_filename_counts_as_missing() {
        let service = Arc::new(StubParseService::returning(Ok(json!({}))));
        let app = create_router(service.clone());

        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\nnot-an-upload\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"doc_type\"\r\n\r\nResume\r\n\
             --{BOUNDARY}--\r\n"
        );
        let response = app
            .oneshot(parse_request(body.into_bytes()))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_json(response).await,
            json!({"error": "Missing 'file' or 'doc_type'"})
        );
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_keeps_payload_too_large_status() {
        let service = Arc::new(StubParseService::returning(Ok(json!({}))));
        let app = create_router(service.clone());

        let oversized = vec![b'x'; MAX_UPLOAD_BYTES + 1];
        let body = multipart_body(Some(("huge.png", oversized.as_slice())), Some("Resume"));
        let response = app.oneshot(parse_request(body)).await.expect("router response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = response_json(response).await;
        assert!(json["error"].as_str().is_some_and(|message| !message.is_empty()));
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn metrics_route_reports_snapshot() {
        let service = Arc::new(StubParseService::returning(Ok(json!({}))));
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["documents_parsed"], 4);
        assert_eq!(json["error_records"], 1);
    }

    fn multipart_body(file: Option<(&str, &[u8])>, doc_type: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(doc_type) = doc_type {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"doc_type\"\r\n\r\n{doc_type}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn parse_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/parse")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    type Outcome = Result<ParsedRecord, fn() -> ProcessingError>;

    struct StubParseService {
        calls: Arc<Mutex<Vec<(Upload, String)>>>,
        outcome: Outcome,
    }

    impl StubParseService {
        fn returning(outcome: Outcome) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                outcome,
            }
        }

        async fn recorded_calls(&self) -> Vec<(Upload, String)> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl ParseApi for StubParseService {
        async fn parse_document(
            &self,
            upload: Upload,
            doc_type: &str,
        ) -> Result<ParsedRecord, ProcessingError> {
            self.calls.lock().await.push((upload, doc_type.to_string()));
            match &self.outcome {
                Ok(record) => Ok(record.clone()),
                Err(make_error) => Err(make_error()),
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_parsed: 4,
                records_extracted: 3,
                error_records: 1,
            }
        }
    }
}
