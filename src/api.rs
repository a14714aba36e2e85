//! HTTP surface for DocSense.
//!
//! Every route lives under `/api`:
//!
//! - `POST /process-document` – Multipart upload (`document` field) summarized through the
//!   map/reduce pipeline. `?fullText=true` disables the display cap on `rawText`.
//! - `POST /process-text` – Summarize pasted text with a single structured prompt.
//! - `POST /simplify` – Rewrite text at a reading level (`standard` by default).
//! - `POST /analyze` – Risk list for arbitrary text; always non-empty.
//! - `POST /ask` – Answer a question against supplied context.
//! - `POST /translate` – Three-tier translation; the body field is `targetLang`.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for discovery.
//!
//! Failure bodies follow each route's contract: document routes answer `{error, details}`,
//! assistant routes answer `{success: false, error}`, and translation failures still carry
//! `translatedText`.

use crate::assist::AssistService;
use crate::config::Config;
use crate::extraction::{self, ExtractedDocument, ExtractionError, extension_of};
use crate::gateway::{Gateway, GatewayError};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::risk::{RiskAnalyzer, RiskItem};
use crate::summarize::{
    StructuredSummary, SummarizationService, SummarizeError, SummarySettings,
};
use crate::translation::TranslationService;
use crate::upload::{StagedUpload, UploadPolicy, UploadRejected, upload_dir};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Room left for multipart framing on top of the upload size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
const DOCUMENT_FIELD: &str = "document";

/// Shared handles used by every handler.
#[derive(Clone)]
pub struct AppState {
    summarizer: Arc<SummarizationService>,
    risk_analyzer: Arc<RiskAnalyzer>,
    translator: Arc<TranslationService>,
    assistant: Arc<AssistService>,
    upload_policy: UploadPolicy,
    upload_dir: PathBuf,
    metrics: Arc<PipelineMetrics>,
}

impl AppState {
    /// Build every service over one gateway using the given configuration.
    pub fn new(gateway: Gateway, config: &Config) -> Self {
        let metrics = Arc::new(PipelineMetrics::new());
        Self {
            summarizer: Arc::new(SummarizationService::new(
                gateway.clone(),
                SummarySettings::from_config(config),
                Arc::clone(&metrics),
            )),
            risk_analyzer: Arc::new(RiskAnalyzer::from_config(gateway.clone(), config)),
            translator: Arc::new(TranslationService::new(
                gateway.clone(),
                Arc::clone(&metrics),
            )),
            assistant: Arc::new(AssistService::new(gateway)),
            upload_policy: UploadPolicy::from_config(config),
            upload_dir: upload_dir(config),
            metrics,
        }
    }
}

/// Build the HTTP router with every route nested under `/api`.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.upload_policy.max_bytes() + MULTIPART_OVERHEAD_BYTES;
    let api = Router::new()
        .route("/process-document", post(process_document))
        .route("/process-text", post(process_text))
        .route("/simplify", post(simplify))
        .route("/analyze", post(analyze))
        .route("/ask", post(ask))
        .route("/translate", post(translate))
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Deserialize)]
struct ProcessDocumentQuery {
    #[serde(default, rename = "fullText")]
    full_text: Option<String>,
}

/// Success response for `POST /process-document`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessDocumentResponse {
    success: bool,
    summary: StructuredSummary,
    raw_text: String,
    full_length: usize,
    truncated: bool,
}

/// One uploaded `document` field, fully buffered.
struct UploadedFile {
    file_name: Option<String>,
    mime: Option<String>,
    bytes: Vec<u8>,
}

impl UploadedFile {
    fn extension(&self) -> Option<String> {
        self.file_name.as_deref().and_then(extension_of)
    }
}

/// Validate, stage, extract, and summarize one upload.
///
/// The staged file lives until the handler returns, whichever path it returns by.
async fn process_document(
    State(state): State<AppState>,
    Query(query): Query<ProcessDocumentQuery>,
    mut multipart: Multipart,
) -> Result<Json<ProcessDocumentResponse>, ApiError> {
    let upload = read_document_field(&mut multipart, state.upload_policy.clone()).await?;
    let extension = upload.extension();
    state.upload_policy.check(
        extension.as_deref(),
        upload.mime.as_deref(),
        upload.bytes.len(),
    )?;

    let staged = StagedUpload::stage(&state.upload_dir, &upload.bytes, extension.as_deref())
        .map_err(|error| {
            tracing::error!(error = %error, "Failed to stage upload");
            ApiError::details(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upload failed",
                error,
            )
        })?;
    tracing::info!(
        file_name = ?upload.file_name,
        mime = ?upload.mime,
        bytes = upload.bytes.len(),
        "Processing document"
    );

    let document = extract_staged(staged.path().to_path_buf(), upload.mime, extension).await?;
    let full_text = query.full_text.as_deref() == Some("true");
    let result = state
        .summarizer
        .summarize(&document, full_text)
        .await
        .map_err(|error| ApiError::summarize(error, "Failed to process document"))?;

    Ok(Json(ProcessDocumentResponse {
        success: true,
        summary: result.summary,
        raw_text: result.display.text,
        full_length: result.display.full_length,
        truncated: result.display.truncated,
    }))
}

async fn read_document_field(
    multipart: &mut Multipart,
    policy: UploadPolicy,
) -> Result<UploadedFile, UploadRejected> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(UploadRejected::Missing),
            Err(error) => return Err(rejection_for(error, &policy)),
        };
        if field.name() != Some(DOCUMENT_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let mime = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(error) => return Err(rejection_for(error, &policy)),
        };
        return Ok(UploadedFile {
            file_name,
            mime,
            bytes: bytes.to_vec(),
        });
    }
}

fn rejection_for(error: MultipartError, policy: &UploadPolicy) -> UploadRejected {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        policy.too_large()
    } else {
        UploadRejected::Malformed(error.body_text())
    }
}

/// Run the extractor over the staged file on a blocking thread.
async fn extract_staged(
    path: PathBuf,
    mime: Option<String>,
    extension: Option<String>,
) -> Result<ExtractedDocument, ApiError> {
    let joined = tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path).map_err(|error| {
            tracing::error!(path = %path.display(), error = %error, "Failed to read staged upload");
            ExtractionError::ExtractionFailed
        })?;
        extraction::extract(&bytes, mime.as_deref(), extension.as_deref())
    })
    .await;

    match joined {
        Ok(result) => result.map_err(ApiError::from),
        Err(error) => {
            tracing::error!(error = %error, "Extraction task failed");
            Err(ApiError::details(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process document",
                error,
            ))
        }
    }
}

#[derive(Deserialize)]
struct ProcessTextRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessTextResponse {
    success: bool,
    summary: StructuredSummary,
    original_length: usize,
    processed_length: usize,
    truncated: bool,
}

/// Summarize pasted text.
async fn process_text(
    State(state): State<AppState>,
    Json(request): Json<ProcessTextRequest>,
) -> Result<Json<ProcessTextResponse>, ApiError> {
    let text = required(request.text)
        .ok_or_else(|| ApiError::message(StatusCode::BAD_REQUEST, "No text provided"))?;
    let result = state
        .summarizer
        .summarize_text(&text)
        .await
        .map_err(|error| ApiError::summarize(error, "Failed to process text"))?;
    Ok(Json(ProcessTextResponse {
        success: true,
        summary: result.summary,
        original_length: result.original_length,
        processed_length: result.processed_length,
        truncated: result.truncated,
    }))
}

#[derive(Deserialize)]
struct SimplifyRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    level: Option<String>,
}

#[derive(Serialize)]
struct SimplifyResponse {
    success: bool,
    #[serde(flatten)]
    simplification: crate::assist::Simplification,
}

/// Rewrite text at the requested reading level.
async fn simplify(
    State(state): State<AppState>,
    Json(request): Json<SimplifyRequest>,
) -> Result<Json<SimplifyResponse>, ApiError> {
    let text = required(request.text)
        .ok_or_else(|| ApiError::failure(StatusCode::BAD_REQUEST, "Text content is required"))?;
    let simplification = state
        .assistant
        .simplify(&text, request.level.as_deref())
        .await
        .map_err(ApiError::gateway_failure)?;
    Ok(Json(SimplifyResponse {
        success: true,
        simplification,
    }))
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    risks: Vec<RiskItem>,
}

/// Analyze text for risks.
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let text = required(request.text).ok_or_else(|| {
        ApiError::message(StatusCode::BAD_REQUEST, "Text is required for risk analysis")
    })?;
    let risks = state.risk_analyzer.analyze_risks(&text).await;
    Ok(Json(AnalyzeResponse { risks }))
}

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Serialize)]
struct AskResponse {
    success: bool,
    answer: String,
}

/// Answer a question about supplied context.
async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let (Some(question), Some(context)) = (required(request.question), required(request.context))
    else {
        return Err(ApiError::failure(
            StatusCode::BAD_REQUEST,
            "Question and context are required",
        ));
    };
    let answer = state
        .assistant
        .answer_question(&question, &context)
        .await
        .map_err(ApiError::gateway_failure)?;
    Ok(Json(AskResponse {
        success: true,
        answer,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    target_lang: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    success: bool,
    translated_text: String,
}

/// Translate text through the three-tier cascade.
async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let original = request.text.clone().unwrap_or_default();
    let (Some(text), Some(target)) = (required(request.text), required(request.target_lang))
    else {
        return Err(ApiError::translation(
            StatusCode::BAD_REQUEST,
            "Text and target language are required",
            original,
        ));
    };

    let outcome = state.translator.translate(&text, &target).await;
    tracing::info!(tier = ?outcome.tier, language = %target, "Translation served");
    match outcome.unresolved {
        None => Ok(Json(TranslateResponse {
            success: true,
            translated_text: outcome.text,
        })),
        Some(reason) => Err(ApiError::translation(
            StatusCode::INTERNAL_SERVER_ERROR,
            reason,
            outcome.text,
        )),
    }
}

/// Return the pipeline counters.
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by clients.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "process_document",
                method: "POST",
                path: "/api/process-document",
                description: "Upload a PDF, DOC, DOCX, or TXT file as multipart field `document` and receive a structured summary plus the extracted text. Add ?fullText=true to skip the display cap.",
                request_example: None,
            },
            CommandDescriptor {
                name: "process_text",
                method: "POST",
                path: "/api/process-text",
                description: "Summarize pasted text into { summary, risks, keywords }.",
                request_example: Some(json!({ "text": "Pasted contract text" })),
            },
            CommandDescriptor {
                name: "simplify",
                method: "POST",
                path: "/api/simplify",
                description: "Rewrite text at a reading level and report the size reduction.",
                request_example: Some(json!({ "text": "Dense legal prose", "level": "standard" })),
            },
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/api/analyze",
                description: "Identify risks with title, description, and severity.",
                request_example: Some(json!({ "text": "Contract text" })),
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/api/ask",
                description: "Answer a question using the supplied context.",
                request_example: Some(json!({
                    "question": "What is the notice period?",
                    "context": "Either party may terminate with 30 days notice."
                })),
            },
            CommandDescriptor {
                name: "translate",
                method: "POST",
                path: "/api/translate",
                description: "Translate text via phrase dictionary, model, then word-by-word fallback.",
                request_example: Some(json!({ "text": "fast and reliable delivery", "targetLang": "es" })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/api/metrics",
                description: "Return pipeline counters for documents, chunks, failures, and translation tiers.",
                request_example: None,
            },
        ],
    })
}

/// Trimmed-non-empty view of an optional request field.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Error response with a status and a route-specific JSON body.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    /// `{error, details}` body used by the document routes.
    fn details(status: StatusCode, error: &str, details: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": error, "details": details.to_string() }),
        }
    }

    /// `{error}` body for validation failures on the document routes.
    fn message(status: StatusCode, error: &str) -> Self {
        Self {
            status,
            body: json!({ "error": error }),
        }
    }

    /// `{success: false, error}` body used by the assistant routes.
    fn failure(status: StatusCode, error: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": error.to_string() }),
        }
    }

    fn gateway_failure(error: GatewayError) -> Self {
        Self::failure(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    fn translation(
        status: StatusCode,
        error: impl std::fmt::Display,
        translated_text: String,
    ) -> Self {
        Self {
            status,
            body: json!({
                "success": false,
                "error": error.to_string(),
                "translatedText": translated_text,
            }),
        }
    }

    fn summarize(error: SummarizeError, label: &str) -> Self {
        match error {
            SummarizeError::SummarizationFailed {
                ref reason,
                display: Some(ref display),
            } => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({
                    "error": "Failed to generate summary",
                    "details": reason,
                    "rawText": display.text,
                    "fullLength": display.full_length,
                    "truncated": display.truncated,
                }),
            },
            SummarizeError::SummarizationFailed { .. } => Self::details(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate summary",
                error,
            ),
            other => Self::details(StatusCode::INTERNAL_SERVER_ERROR, label, other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<UploadRejected> for ApiError {
    fn from(rejection: UploadRejected) -> Self {
        let label = match rejection {
            UploadRejected::TooLarge { .. } => "File too large",
            UploadRejected::InvalidType => "Invalid file type",
            UploadRejected::Missing => "No document uploaded",
            UploadRejected::Malformed(_) => "Upload failed",
        };
        tracing::info!(reason = %rejection, "Upload rejected");
        Self::details(StatusCode::BAD_REQUEST, label, rejection)
    }
}

impl From<ExtractionError> for ApiError {
    fn from(error: ExtractionError) -> Self {
        let (status, label) = match error {
            ExtractionError::UnsupportedFormat(_) => {
                (StatusCode::BAD_REQUEST, "Unsupported file type")
            }
            ExtractionError::CorruptDocument(_) => {
                (StatusCode::BAD_REQUEST, "Failed to process document")
            }
            ExtractionError::EmptyDocument => {
                (StatusCode::BAD_REQUEST, "No text extracted from document")
            }
            ExtractionError::ExtractionFailed => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process document")
            }
        };
        tracing::warn!(error = %error, status = status.as_u16(), "Extraction failed");
        Self::details(status, label, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{ScriptedClient, gateway};
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use tower::ServiceExt;

    const SUMMARY_JSON: &str =
        r#"{"summary": "A short lease.", "risks": ["late fees"], "keywords": ["lease"]}"#;
    const BOUNDARY: &str = "docsense-test-boundary";

    struct Harness {
        router: Router,
        client: Arc<ScriptedClient>,
        uploads: tempfile::TempDir,
    }

    fn harness_with(client: Arc<ScriptedClient>, max_upload_bytes: usize) -> Harness {
        let uploads = tempfile::tempdir().expect("upload dir");
        let config = Config {
            upload_dir: uploads.path().to_string_lossy().into_owned(),
            max_upload_bytes,
            max_raw_text_length: 20,
            ..Config::default()
        };
        let state = AppState::new(gateway(client.clone()), &config);
        Harness {
            router: create_router(state),
            client,
            uploads,
        }
    }

    fn harness(client: Arc<ScriptedClient>) -> Harness {
        harness_with(client, 1024 * 1024)
    }

    fn summarizing_client() -> Arc<ScriptedClient> {
        ScriptedClient::new(|prompt| {
            if prompt.starts_with("Give a very short structured summary") {
                Ok("A partial summary.".into())
            } else {
                Ok(SUMMARY_JSON.into())
            }
        })
    }

    fn json_request(uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    fn multipart_request(uri: &str, field: &str, file_name: &str, mime: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json body");
        (status, json)
    }

    fn staged_files(harness: &Harness) -> usize {
        std::fs::read_dir(harness.uploads.path())
            .expect("read upload dir")
            .count()
    }

    #[tokio::test]
    async fn commands_catalog_lists_document_route() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let process = commands
            .iter()
            .find(|cmd| cmd.name == "process_document")
            .expect("process_document command present");
        assert_eq!(process.method, "POST");
        assert_eq!(process.path, "/api/process-document");
        assert!(commands.iter().any(|cmd| cmd.path == "/api/translate"));
    }

    #[tokio::test]
    async fn text_upload_is_summarized_and_cleaned_up() {
        let harness = harness(summarizing_client());
        let request = multipart_request(
            "/api/process-document",
            "document",
            "lease.txt",
            "text/plain",
            b"The tenant pays rent monthly. Late fees apply after five days.",
        );

        let (status, body) = send(&harness.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["summary"]["summary"], "A short lease.");
        assert_eq!(body["truncated"], true);
        assert_eq!(body["fullLength"], 62);
        assert_eq!(body["rawText"], "The tenant pays rent... [truncated]");
        assert_eq!(staged_files(&harness), 0);
        assert_eq!(harness.client.prompts().len(), 2);
    }

    #[tokio::test]
    async fn full_text_query_disables_display_cap() {
        let harness = harness(summarizing_client());
        let text = "The tenant pays rent monthly. Late fees apply after five days.";
        let request = multipart_request(
            "/api/process-document?fullText=true",
            "document",
            "lease.txt",
            "text/plain",
            text.as_bytes(),
        );

        let (status, body) = send(&harness.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rawText"], text);
        assert_eq!(body["truncated"], false);
    }

    #[tokio::test]
    async fn disallowed_type_is_rejected_before_extraction() {
        let harness = harness(summarizing_client());
        let request = multipart_request(
            "/api/process-document",
            "document",
            "tool.exe",
            "application/octet-stream",
            b"MZ",
        );

        let (status, body) = send(&harness.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid file type");
        assert_eq!(body["details"], "Only PDF, DOC, DOCX, and TXT files are allowed");
        assert!(harness.client.prompts().is_empty());
        assert_eq!(staged_files(&harness), 0);
    }

    #[tokio::test]
    async fn oversize_upload_is_rejected() {
        let harness = harness_with(summarizing_client(), 16);
        let request = multipart_request(
            "/api/process-document",
            "document",
            "notes.txt",
            "text/plain",
            &[b'a'; 64],
        );

        let (status, body) = send(&harness.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "File too large");
        assert!(harness.client.prompts().is_empty());
    }

    #[tokio::test]
    async fn missing_document_field_is_rejected() {
        let harness = harness(summarizing_client());
        let request = multipart_request(
            "/api/process-document",
            "attachment",
            "notes.txt",
            "text/plain",
            b"hello",
        );

        let (status, body) = send(&harness.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No document uploaded");
    }

    #[tokio::test]
    async fn whitespace_document_reports_empty_extraction() {
        let harness = harness(summarizing_client());
        let request = multipart_request(
            "/api/process-document",
            "document",
            "blank.txt",
            "text/plain",
            b"  \n\t ",
        );

        let (status, body) = send(&harness.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No text extracted from document");
        assert_eq!(staged_files(&harness), 0);
    }

    #[tokio::test]
    async fn unparseable_merge_reply_still_returns_raw_text() {
        let client = ScriptedClient::new(|prompt| {
            if prompt.starts_with("Give a very short structured summary") {
                Ok("partial".into())
            } else {
                Ok("Here is the JSON you asked for".into())
            }
        });
        let harness = harness(client);
        let request = multipart_request(
            "/api/process-document",
            "document",
            "short.txt",
            "text/plain",
            b"Short document.",
        );

        let (status, body) = send(&harness.router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to generate summary");
        assert_eq!(body["rawText"], "Short document.");
        assert_eq!(body["fullLength"], 15);
        assert_eq!(body["truncated"], false);
        assert_eq!(staged_files(&harness), 0);
    }

    #[tokio::test]
    async fn process_text_reports_lengths() {
        let harness = harness(summarizing_client());
        let (status, body) = send(
            &harness.router,
            json_request("/api/process-text", json!({ "text": "Rent is due monthly." })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["keywords"][0], "lease");
        assert_eq!(body["originalLength"], 20);
        assert_eq!(body["processedLength"], 20);
        assert_eq!(body["truncated"], false);
    }

    #[tokio::test]
    async fn process_text_requires_text() {
        let harness = harness(summarizing_client());
        let (status, body) =
            send(&harness.router, json_request("/api/process-text", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No text provided");
    }

    #[tokio::test]
    async fn simplify_returns_reduction() {
        let harness = harness(ScriptedClient::new(|_| Ok("Pay rent.".into())));
        let (status, body) = send(
            &harness.router,
            json_request(
                "/api/simplify",
                json!({ "text": "The lessee shall remit payment." }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["simplified"], "Pay rent.");
        assert_eq!(body["originalLength"], 31);
        assert_eq!(body["simplifiedLength"], 9);
        assert_eq!(body["reduction"], 71);
    }

    #[tokio::test]
    async fn analyze_never_fails_on_gateway_error() {
        let harness = harness(ScriptedClient::failing());
        let (status, body) = send(
            &harness.router,
            json_request("/api/analyze", json!({ "text": "Unlimited liability." })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["risks"][0]["title"], "Analysis Error");
        assert_eq!(body["risks"][0]["severity"], "high");
    }

    #[tokio::test]
    async fn ask_surfaces_gateway_failure() {
        let harness = harness(ScriptedClient::failing());
        let (status, body) = send(
            &harness.router,
            json_request("/api/ask", json!({ "question": "Why?", "context": "Because." })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().expect("error").contains("connection refused"));
    }

    #[tokio::test]
    async fn ask_requires_question_and_context() {
        let harness = harness(summarizing_client());
        let (status, body) = send(
            &harness.router,
            json_request("/api/ask", json!({ "question": "Why?" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn translate_serves_phrase_tier_and_counts_it() {
        let harness = harness(ScriptedClient::failing());
        let (status, body) = send(
            &harness.router,
            json_request(
                "/api/translate",
                json!({ "text": "smooth payment process", "targetLang": "es" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["translatedText"], "proceso de pago sin problemas");

        let response = harness
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("metrics response");
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let metrics: Value = serde_json::from_slice(&bytes).expect("metrics json");
        assert_eq!(metrics["phraseTranslations"], 1);
    }

    #[tokio::test]
    async fn untranslatable_text_returns_original_with_error() {
        let harness = harness(ScriptedClient::failing());
        let (status, body) = send(
            &harness.router,
            json_request(
                "/api/translate",
                json!({ "text": "hello there", "targetLang": "es" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["translatedText"], "hello there");
    }

    #[tokio::test]
    async fn rejected_model_reply_is_not_reported_as_an_error() {
        let harness = harness(ScriptedClient::new(|_| Ok("hello there".into())));
        let (status, body) = send(
            &harness.router,
            json_request(
                "/api/translate",
                json!({ "text": "hello there", "targetLang": "es" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["translatedText"], "hello there");
        assert!(body.get("error").is_none());
        assert_eq!(harness.client.prompts().len(), 1);
    }

    #[tokio::test]
    async fn translate_requires_target_language() {
        let harness = harness(summarizing_client());
        let (status, body) = send(
            &harness.router,
            json_request("/api/translate", json!({ "text": "hello", "targetLanguage": "es" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["translatedText"], "hello");
        assert!(harness.client.prompts().is_empty());
    }
}
