use axum::{
    Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use triage_flow::{
    DISCLAIMER, InMemorySessionStore, PostgresSessionStore, SessionStore,
    StubImageObservationService, TextSubmission, TriageError, TriageOrchestrator, TriageResult,
};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    models::{
        AnswerRequest, CreateSessionRequest, DeleteResponse, DisclaimerResponse, ErrorBody,
        ImageTriageRequest, SessionResponse, SessionTextRequest, TextTriageRequest,
    },
};

pub const CORRELATION_HEADER: &str = "x-correlation-id";

pub const SERVICE_DISCLAIMER: &str = "This symptom checker provides general health information only. It is NOT a medical diagnosis. Always consult a qualified healthcare professional for proper diagnosis and treatment. In case of emergency, call emergency services immediately.";

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

type ApiError = (StatusCode, Json<ErrorBody>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: code.to_string(),
            message: message.into(),
        }),
    )
}

fn invalid_input(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
}

fn triage_error(e: TriageError) -> ApiError {
    let status = match &e {
        TriageError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        TriageError::SessionCompleted(_) | TriageError::ConcurrentModification(_) => {
            StatusCode::CONFLICT
        }
        TriageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        TriageError::ImageAnalysisFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TriageError::StorageError(_) | TriageError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = match &e {
        TriageError::ImageAnalysisFailed(_) => {
            warn!(error = %e, "image analysis failed");
            "Image analysis failed. Please retry the upload.".to_string()
        }
        TriageError::ConcurrentModification(_) => {
            warn!(error = %e, "concurrent session update");
            "The session was updated by another request. Please retry.".to_string()
        }
        TriageError::StorageError(_) | TriageError::Internal(_) => {
            error!(error = %e, "request failed");
            "An internal error occurred".to_string()
        }
        _ => {
            info!(code = e.code(), "request rejected");
            e.to_string()
        }
    };

    api_error(status, e.code(), message)
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: TriageOrchestrator,
    pub max_image_bytes: usize,
}

impl AppState {
    pub fn new(orchestrator: TriageOrchestrator, max_image_bytes: usize) -> Self {
        Self {
            orchestrator,
            max_image_bytes,
        }
    }
}

pub async fn create_app(config: &ServiceConfig) -> Router {
    let app_state = create_app_state(config).await;
    build_router(app_state)
}

async fn create_app_state(config: &ServiceConfig) -> AppState {
    let store = create_session_store(config).await;
    let orchestrator = TriageOrchestrator::with_config(
        store,
        Arc::new(StubImageObservationService::new()),
        config.triage_config(),
    );
    AppState::new(orchestrator, config.max_image_bytes)
}

async fn create_session_store(config: &ServiceConfig) -> Arc<dyn SessionStore> {
    match &config.database_url {
        Some(database_url) => {
            info!("Using PostgreSQL session store");
            match PostgresSessionStore::connect(database_url).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!(
                        "Failed to connect to PostgreSQL: {}. Falling back to in-memory store.",
                        e
                    );
                    Arc::new(InMemorySessionStore::new())
                }
            }
        }
        None => {
            info!("Using in-memory session store (set DATABASE_URL to use PostgreSQL)");
            Arc::new(InMemorySessionStore::new())
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    // Base64 inflates payloads by a third; leave headroom for the JSON envelope.
    let body_limit = app_state.max_image_bytes / 3 * 4 + 64 * 1024;

    let api = Router::new()
        .route("/session", post(create_session))
        .route("/session/{session_id}", get(get_session).delete(delete_session))
        .route("/session/{session_id}/answer", post(submit_answer))
        .route("/session/{session_id}/text", post(add_session_text))
        .route("/text", post(submit_text))
        .route("/image", post(submit_image))
        .route("/disclaimer", get(disclaimer));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/triage", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Tag every request with a correlation id, reusing the caller's when present.
async fn correlation_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header = HeaderValue::from_str(&correlation_id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn disclaimer() -> Json<DisclaimerResponse> {
    Json(DisclaimerResponse {
        disclaimer: SERVICE_DISCLAIMER.to_string(),
        output_disclaimer: DISCLAIMER.to_string(),
    })
}

fn validate_session_id(session_id: &str) -> Result<(), ApiError> {
    Uuid::parse_str(session_id)
        .map(|_| ())
        .map_err(|_| invalid_input(format!("Invalid session id: {session_id}")))
}

fn validate_text(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(invalid_input(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn decode_image(request: &ImageTriageRequest, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let content_type = request.content_type.trim().to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(invalid_input(format!(
            "Unsupported image type: {}. Allowed: {}",
            request.content_type,
            ALLOWED_IMAGE_TYPES.join(", ")
        )));
    }

    let raw = request.image_base64.trim();
    let payload = raw.split_once("base64,").map_or(raw, |(_, data)| data);
    let image = STANDARD
        .decode(payload)
        .map_err(|_| invalid_input("image_base64 is not valid base64"))?;

    if image.is_empty() {
        return Err(invalid_input("Image cannot be empty"));
    }
    if image.len() > max_bytes {
        return Err(invalid_input(format!(
            "Image is {} bytes; the limit is {} bytes",
            image.len(),
            max_bytes
        )));
    }
    Ok(image)
}

async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<SessionResponse> {
    let request: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| invalid_input(format!("Invalid request body: {e}")))?
    };

    let session = state
        .orchestrator
        .create_session(request.language)
        .await
        .map_err(triage_error)?;
    Ok(Json(session.into()))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    validate_session_id(&session_id)?;
    let session = state
        .orchestrator
        .get_session(&session_id)
        .await
        .map_err(triage_error)?;
    Ok(Json(session.into()))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<DeleteResponse> {
    validate_session_id(&session_id)?;
    let deleted = state
        .orchestrator
        .delete_session(&session_id)
        .await
        .map_err(triage_error)?;

    if !deleted {
        return Err(triage_error(TriageError::SessionNotFound(session_id)));
    }
    Ok(Json(DeleteResponse {
        session_id,
        deleted,
    }))
}

async fn submit_text(
    State(state): State<AppState>,
    Json(request): Json<TextTriageRequest>,
) -> ApiResult<TriageResult> {
    if let Some(session_id) = &request.session_id {
        validate_session_id(session_id)?;
    }
    validate_text(&request.symptoms, "Symptoms")?;
    info!(
        session_id = ?request.session_id,
        symptoms_len = request.symptoms.len(),
        "Processing text triage"
    );

    let submission = TextSubmission {
        symptoms: request.symptoms,
        severity: request.severity,
        duration: request.duration,
    };
    let result = state
        .orchestrator
        .submit_text(request.session_id.as_deref(), submission)
        .await
        .map_err(triage_error)?;
    Ok(Json(result))
}

async fn submit_image(
    State(state): State<AppState>,
    Json(request): Json<ImageTriageRequest>,
) -> ApiResult<TriageResult> {
    if let Some(session_id) = &request.session_id {
        validate_session_id(session_id)?;
    }
    let image = decode_image(&request, state.max_image_bytes)?;
    info!(
        session_id = ?request.session_id,
        content_type = %request.content_type,
        bytes = image.len(),
        "Processing image triage"
    );

    let result = state
        .orchestrator
        .submit_image(request.session_id.as_deref(), image)
        .await
        .map_err(triage_error)?;
    Ok(Json(result))
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<TriageResult> {
    validate_session_id(&session_id)?;
    validate_text(&request.answer, "Answer")?;

    let result = state
        .orchestrator
        .submit_answer(&session_id, &request.answer)
        .await
        .map_err(triage_error)?;
    Ok(Json(result))
}

async fn add_session_text(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SessionTextRequest>,
) -> ApiResult<TriageResult> {
    validate_session_id(&session_id)?;
    validate_text(&request.symptoms, "Symptoms")?;

    let result = state
        .orchestrator
        .add_session_text(&session_id, &request.symptoms)
        .await
        .map_err(triage_error)?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::Method;
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use triage_flow::{ImageObservationService, ObservationData};

    struct FailingImageService;

    #[async_trait]
    impl ImageObservationService for FailingImageService {
        async fn analyze(&self, _image: Vec<u8>) -> triage_flow::Result<ObservationData> {
            Err(TriageError::ImageAnalysisFailed("model offline".to_string()))
        }
    }

    fn app_with(vision: Arc<dyn ImageObservationService>, max_image_bytes: usize) -> Router {
        let orchestrator = TriageOrchestrator::new(Arc::new(InMemorySessionStore::new()), vision);
        build_router(AppState::new(orchestrator, max_image_bytes))
    }

    fn app() -> Router {
        app_with(Arc::new(StubImageObservationService::new()), 1024)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn image_body(content_type: &str, bytes: &[u8]) -> Value {
        json!({ "content_type": content_type, "image_base64": STANDARD.encode(bytes) })
    }

    #[tokio::test]
    async fn test_health_and_disclaimer() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, Method::GET, "/api/v1/triage/disclaimer", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["disclaimer"].as_str().unwrap().contains("NOT a medical diagnosis"));
        assert_eq!(body["output_disclaimer"], DISCLAIMER);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = app();
        let (status, created) = send(&app, Method::POST, "/api/v1/triage/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["status"], "collecting");
        assert_eq!(created["language"], "en");
        let id = created["session_id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/triage/session/{id}");

        let (status, fetched) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["messages"], json!([]));

        let (status, deleted) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["deleted"], true);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "SESSION_NOT_FOUND");

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_session_with_language() {
        let app = app();
        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/triage/session",
            Some(json!({ "language": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["language"], "hi");
    }

    #[tokio::test]
    async fn test_text_then_answer_completes() {
        let app = app();
        let (status, first) = send(
            &app,
            Method::POST,
            "/api/v1/triage/text",
            Some(json!({ "symptoms": "I have a sharp headache", "duration": "1 day", "severity": "medium" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["status"], "needs_more_info");
        assert_eq!(first["next_question"]["id"], "q_headache_1");
        assert!(first.get("final_output").is_none());

        let id = first["session_id"].as_str().unwrap();
        let (status, second) = send(
            &app,
            Method::POST,
            &format!("/api/v1/triage/session/{id}/answer"),
            Some(json!({ "answer": "It's throbbing" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["status"], "completed");
        assert_eq!(second["final_output"]["severity"], "low");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/triage/session/{id}/answer"),
            Some(json!({ "answer": "more" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "SESSION_COMPLETED");
    }

    #[tokio::test]
    async fn test_emergency_text_is_critical() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/triage/text",
            Some(json!({ "symptoms": "crushing chest pain" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["final_output"]["severity"], "critical");
    }

    #[tokio::test]
    async fn test_input_validation() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/triage/text",
            Some(json!({ "symptoms": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");

        let (status, body) = send(&app, Method::GET, "/api/v1/triage/session/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/triage/session/{}/answer", Uuid::new_v4()),
            Some(json!({ "answer": "yes" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_image_validation() {
        let app = app_with(Arc::new(StubImageObservationService::new()), 8);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/triage/image",
            Some(image_body("image/gif", &[1, 2])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/triage/image",
            Some(json!({ "content_type": "image/png", "image_base64": "%%%" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/triage/image",
            Some(image_body("image/png", &[0u8; 9])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_image_flows() {
        let app = app();
        let (status, wound) = send(
            &app,
            Method::POST,
            "/api/v1/triage/image",
            Some(image_body("image/jpeg", &[1, 2, 3])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wound["status"], "completed");

        let data_url = format!("data:image/png;base64,{}", STANDARD.encode([1u8, 2]));
        let (status, rash) = send(
            &app,
            Method::POST,
            "/api/v1/triage/image",
            Some(json!({ "content_type": "IMAGE/PNG", "image_base64": data_url })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rash["status"], "needs_more_info");
        assert_eq!(rash["next_question"]["id"], "q_continue_1");

        let id = rash["session_id"].as_str().unwrap();
        let (status, more) = send(
            &app,
            Method::POST,
            &format!("/api/v1/triage/session/{id}/text"),
            Some(json!({ "symptoms": "it is very itchy" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(more["next_question"]["id"], "q_continue_1");
    }

    #[tokio::test]
    async fn test_image_analysis_failure_is_unprocessable() {
        let app = app_with(Arc::new(FailingImageService), 1024);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/triage/image",
            Some(image_body("image/webp", &[1, 2])),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "IMAGE_ANALYSIS_FAILED");
        assert!(body["message"].as_str().unwrap().contains("retry"));
    }

    #[tokio::test]
    async fn test_correlation_id_is_echoed() {
        let app = app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(CORRELATION_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[CORRELATION_HEADER], "abc-123");

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let generated = response.headers()[CORRELATION_HEADER].to_str().unwrap();
        assert!(Uuid::parse_str(generated).is_ok());
    }
}
