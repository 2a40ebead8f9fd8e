use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use intake_flow::{
    AnalysisRequest, CollaboratorError, Collaborators, InMemorySessionStorage, QuestionGenerator,
    ReportGenerator, StepLayout, WizardRunner,
};
use serde_json::{Value, json};
use symptom_intake_service::{AppState, build_router};
use tower::ServiceExt;

struct FakeQuestions;

#[async_trait]
impl QuestionGenerator for FakeQuestions {
    async fn generate_questions(&self, prompt: &str) -> Result<String, CollaboratorError> {
        if prompt.contains("unreachable") {
            return Err(CollaboratorError::Failed("connection refused".to_string()));
        }
        Ok("Do you have a fever? [YES/NO]\nHow many days?".to_string())
    }
}

struct FakeReport(Result<&'static str, CollaboratorError>);

#[async_trait]
impl ReportGenerator for FakeReport {
    async fn generate_report(&self, _request: &AnalysisRequest) -> Result<String, CollaboratorError> {
        self.0.clone().map(str::to_string)
    }
}

const REPORT: &str = "<report><condition><name>Influenza</name><likelihood>High</likelihood>\
<treatments><treatment>Rest</treatment></treatments></condition></report>";

fn app_with(report: Result<&'static str, CollaboratorError>) -> Router {
    let runner = WizardRunner::new(
        Arc::new(InMemorySessionStorage::new()),
        Collaborators::new(Arc::new(FakeQuestions), Arc::new(FakeReport(report))),
        StepLayout::symptoms_only(),
    );
    build_router(AppState::new(runner))
}

fn app() -> Router {
    app_with(Ok(REPORT))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = send_raw(app, method, uri, body).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> axum::response::Response {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn start(app: &Router) -> String {
    let (status, view) = send(app, "POST", "/intake", None).await;
    assert_eq!(status, StatusCode::CREATED);
    view["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_root() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let response = send_raw(&app, "GET", "/", None).await;
    assert!(response.headers().contains_key("x-correlation-id"));
}

#[tokio::test]
async fn full_intake_over_http() {
    let app = app();
    let id = start(&app).await;

    let (status, body) = send(&app, "POST", &format!("/intake/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["session"]["title"], "Symptoms");

    let (status, view) = send(
        &app,
        "PUT",
        &format!("/intake/{id}/symptoms"),
        Some(json!({ "symptoms": "fever and cough" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["navigation"]["can_advance"], true);

    let (status, view) = send(&app, "POST", &format!("/intake/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["content"]["kind"], "question");
    assert_eq!(view["content"]["text"], "Do you have a fever?");
    assert_eq!(view["content"]["yes_no"], true);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/intake/{id}/answers/0"),
        Some(json!({ "choice": "yes", "details": "3 days" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advanced"], true);
    assert_eq!(body["view"]["navigation"]["advance_label"], "Review");

    let (_, body) = send(
        &app,
        "PUT",
        &format!("/intake/{id}/answers/1"),
        Some(json!({ "choice": "5" })),
    )
    .await;
    assert_eq!(body["view"]["content"]["kind"], "review");
    assert_eq!(body["view"]["navigation"]["advance_label"], "Analyze");

    let (status, body) = send(&app, "GET", &format!("/intake/{id}/report"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["details"].as_str().unwrap().contains("No analysis report"));

    let (status, view) = send(&app, "POST", &format!("/intake/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["title"], "Analysis");
    assert_eq!(view["content"]["conditions"][0]["name"], "Influenza");
    assert_eq!(view["content"]["actions"], json!(["new_patient", "export"]));

    let (status, report) = send(&app, "GET", &format!("/intake/{id}/report"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["conditions"][0]["treatments"], json!(["Rest"]));

    let (status, _) = send(&app, "POST", &format!("/intake/{id}/retreat"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let response = send_raw(&app, "GET", &format!("/intake/{id}/export"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"symptom_analysis_report.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let (status, view) = send(&app, "POST", &format!("/intake/{id}/reset"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step_index"], 0);
    assert_eq!(view["content"]["symptoms"], "");

    let (status, _) = send(&app, "DELETE", &format!("/intake/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/intake/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upstream_failures_keep_the_step() {
    let app = app();
    let id = start(&app).await;
    send(
        &app,
        "PUT",
        &format!("/intake/{id}/symptoms"),
        Some(json!({ "symptoms": "unreachable" })),
    )
    .await;

    let (status, body) = send(&app, "POST", &format!("/intake/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["error"],
        "There was an error generating questions. Please try again."
    );
    assert_eq!(body["session"]["title"], "Symptoms");
    assert_eq!(
        body["session"]["error_message"],
        "There was an error generating questions. Please try again."
    );
}

#[tokio::test]
async fn analysis_timeout_maps_to_gateway_timeout() {
    let app = app_with(Err(CollaboratorError::TimedOut { attempts: 60 }));
    let id = start(&app).await;
    send(
        &app,
        "PUT",
        &format!("/intake/{id}/symptoms"),
        Some(json!({ "symptoms": "rash" })),
    )
    .await;
    send(&app, "POST", &format!("/intake/{id}/advance"), None).await;
    send(
        &app,
        "PUT",
        &format!("/intake/{id}/answers/0"),
        Some(json!({ "choice": "no" })),
    )
    .await;
    send(
        &app,
        "PUT",
        &format!("/intake/{id}/answers/1"),
        Some(json!({ "choice": "2" })),
    )
    .await;

    let (status, body) = send(&app, "POST", &format!("/intake/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "The analysis timed out. Please try again.");
    assert_eq!(body["session"]["title"], "Review");
}

#[tokio::test]
async fn invalid_answers_are_rejected() {
    let app = app();
    let id = start(&app).await;
    send(
        &app,
        "PUT",
        &format!("/intake/{id}/symptoms"),
        Some(json!({ "symptoms": "fever" })),
    )
    .await;
    send(&app, "POST", &format!("/intake/{id}/advance"), None).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/intake/{id}/answers/0"),
        Some(json!({ "choice": "perhaps" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/intake/{id}/answers/7"),
        Some(json!({ "choice": "yes" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/intake/unknown/advance", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
