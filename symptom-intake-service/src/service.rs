use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use intake_flow::{
    IntakeError, IntakeSession, PatientInfoUpdate, WizardRunner, WizardView, export_session,
    render_interactive,
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    models::{AnswerRequest, AnswerResponse, ReportResponse, SymptomsRequest},
    workflow::create_wizard_runner,
};

const CORRELATION_HEADER: &str = "x-correlation-id";

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn status_for(error: &IntakeError) -> StatusCode {
    match error {
        IntakeError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        IntakeError::StepIncomplete(_)
        | IntakeError::AtFirstStep
        | IntakeError::AnswerOutOfRange { .. }
        | IntakeError::InvalidAnswer(_) => StatusCode::BAD_REQUEST,
        IntakeError::Busy
        | IntakeError::NavigationLocked(_)
        | IntakeError::ReportUnavailable
        | IntakeError::StaleResult(_) => StatusCode::CONFLICT,
        IntakeError::QuestionGenerationFailed(_) | IntakeError::AnalysisFailed(_) => {
            StatusCode::BAD_GATEWAY
        }
        IntakeError::AnalysisTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        IntakeError::ExportFailed(_) | IntakeError::StorageError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Maps a wizard error to a JSON error body, attaching the session view when known.
fn intake_error(error: IntakeError, session: Option<&IntakeSession>) -> ApiError {
    let status = status_for(&error);
    if status.is_server_error() {
        error!(error = %error, "Request failed");
    } else {
        warn!(error = %error, "Request rejected");
    }

    let mut body = json!({
        "error": error.user_message(),
        "details": error.to_string(),
    });
    if let Some(session) = session {
        body["session"] = json!(WizardView::of(session));
    }
    (status, Json(body))
}

#[derive(Clone)]
pub struct AppState {
    pub runner: WizardRunner,
}

impl AppState {
    pub fn new(runner: WizardRunner) -> Self {
        Self { runner }
    }
}

pub fn create_app(config: &ServiceConfig) -> Router {
    build_router(AppState::new(create_wizard_runner(config)))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/intake", post(start_intake))
        .route("/intake/{session_id}", get(get_view).delete(discard_session))
        .route("/intake/{session_id}/patient", put(update_patient))
        .route("/intake/{session_id}/symptoms", put(set_symptoms))
        .route("/intake/{session_id}/answers/{index}", put(record_answer))
        .route("/intake/{session_id}/advance", post(advance))
        .route("/intake/{session_id}/retreat", post(retreat))
        .route("/intake/{session_id}/reset", post(reset))
        .route("/intake/{session_id}/report", get(get_report))
        .route("/intake/{session_id}/export", get(export))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Tags each request with a correlation id (reusing the caller's, if sent) and echoes it back.
async fn correlation_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header_value = HeaderValue::from_str(&correlation_id).ok();
    if let Some(value) = &header_value {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Symptom Intake Service",
        "version": "1.0.0",
        "description": "Guided symptom intake with AI follow-up questions and differential-diagnosis reports",
        "endpoints": {
            "POST /intake": "Start a new intake session",
            "GET /intake/{session_id}": "Current step view",
            "PUT /intake/{session_id}/patient": "Update patient information",
            "PUT /intake/{session_id}/symptoms": "Set the symptom description",
            "PUT /intake/{session_id}/answers/{index}": "Answer a follow-up question",
            "POST /intake/{session_id}/advance": "Go to the next step",
            "POST /intake/{session_id}/retreat": "Go to the previous step",
            "POST /intake/{session_id}/reset": "Start over with a new patient",
            "GET /intake/{session_id}/report": "Analysis report",
            "GET /intake/{session_id}/export": "Download the report as PDF",
            "DELETE /intake/{session_id}": "Discard the session",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn start_intake(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<WizardView>), ApiError> {
    let session = state
        .runner
        .start()
        .await
        .map_err(|e| intake_error(e, None))?;
    Ok((StatusCode::CREATED, Json(WizardView::of(&session))))
}

async fn get_view(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<WizardView> {
    let session = state
        .runner
        .session(&session_id)
        .await
        .map_err(|e| intake_error(e, None))?;
    Ok(Json(WizardView::of(&session)))
}

/// Runs a failing action's error through [`intake_error`] with the current session view.
async fn with_session(state: &AppState, session_id: &str, error: IntakeError) -> ApiError {
    let session = state.runner.session(session_id).await.ok();
    intake_error(error, session.as_ref())
}

async fn update_patient(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(update): Json<PatientInfoUpdate>,
) -> ApiResult<WizardView> {
    match state.runner.update_patient(&session_id, update).await {
        Ok(session) => Ok(Json(WizardView::of(&session))),
        Err(e) => Err(with_session(&state, &session_id, e).await),
    }
}

async fn set_symptoms(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SymptomsRequest>,
) -> ApiResult<WizardView> {
    match state.runner.set_symptoms(&session_id, request.symptoms).await {
        Ok(session) => Ok(Json(WizardView::of(&session))),
        Err(e) => Err(with_session(&state, &session_id, e).await),
    }
}

async fn record_answer(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, usize)>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<AnswerResponse> {
    match state
        .runner
        .record_answer(&session_id, index, request.into())
        .await
    {
        Ok((session, advanced)) => Ok(Json(AnswerResponse {
            advanced,
            view: WizardView::of(&session),
        })),
        Err(e) => Err(with_session(&state, &session_id, e).await),
    }
}

async fn advance(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<WizardView> {
    info!(session_id = %session_id, "Advance requested");
    match state.runner.advance(&session_id).await {
        Ok(session) => Ok(Json(WizardView::of(&session))),
        Err(e) => Err(with_session(&state, &session_id, e).await),
    }
}

async fn retreat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<WizardView> {
    match state.runner.retreat(&session_id).await {
        Ok(session) => Ok(Json(WizardView::of(&session))),
        Err(e) => Err(with_session(&state, &session_id, e).await),
    }
}

async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<WizardView> {
    match state.runner.reset(&session_id).await {
        Ok(session) => Ok(Json(WizardView::of(&session))),
        Err(e) => Err(with_session(&state, &session_id, e).await),
    }
}

async fn get_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ReportResponse> {
    let session = state
        .runner
        .session(&session_id)
        .await
        .map_err(|e| intake_error(e, None))?;
    if session.report().is_none() {
        return Err(intake_error(IntakeError::ReportUnavailable, Some(&session)));
    }

    Ok(Json(ReportResponse {
        session_id: session.id.clone(),
        conditions: render_interactive(&session.conditions()),
    }))
}

async fn export(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let session = state
        .runner
        .session(&session_id)
        .await
        .map_err(|e| intake_error(e, None))?;

    let document = tokio::task::spawn_blocking(move || export_session(&session))
        .await
        .map_err(|e| internal_error("Export task failed", &e.to_string()))?
        .map_err(|e| intake_error(e, None))?;

    info!(
        session_id = %session_id,
        pages = document.page_count,
        bytes = document.bytes.len(),
        "Exported analysis report"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.file_name),
            ),
        ],
        document.bytes,
    )
        .into_response())
}

async fn discard_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .runner
        .discard(&session_id)
        .await
        .map_err(|e| intake_error(e, None))?;
    Ok(StatusCode::NO_CONTENT)
}
