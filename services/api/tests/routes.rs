//! Route tests driving the full session flow through the router.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use tower::util::ServiceExt;
use tutor_api::{router::create_router, state::AppState};
use tutor_core::{
    BackendError, LLMClient, PromptSet,
    curriculum::{CurriculumSynthesizer, StaticCurriculumSynthesizer},
};

/// Replays queued replies in order.
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<String, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, BackendError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::new("script exhausted")))
    }
}

fn quiz_reply() -> String {
    let items: Vec<Value> = (0..10)
        .map(|i| {
            json!({
                "text": format!("Question {}", i + 1),
                "choices": {"a": "one", "b": "two", "c": "three", "d": "four"},
                "answer": if i < 7 { "a" } else { "b" }
            })
        })
        .collect();
    format!("Here is your quiz:\n{}", Value::Array(items))
}

fn follow_ups_reply() -> String {
    json!([
        {"question": "Say hello", "correct_answer": "namaste", "explanation": "Greeting", "study_recommendation": "Greetings"},
        {"question": "Say thanks", "correct_answer": "dhanyavaad", "explanation": "Thanks", "study_recommendation": "Courtesy"},
        {"question": "Say yes", "correct_answer": "haan", "explanation": "Yes", "study_recommendation": "Answers"}
    ])
    .to_string()
}

fn app(replies: Vec<Result<String, BackendError>>) -> Router {
    let client: Arc<dyn LLMClient> = ScriptedClient::new(replies);
    let synthesizer: Arc<dyn CurriculumSynthesizer> = Arc::new(StaticCurriculumSynthesizer);
    let state = AppState::new(
        client,
        synthesizer,
        Arc::new(PromptSet::default()),
        "Hindi".to_string(),
    );
    create_router(Arc::new(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_session(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/sessions", Some(json!({"skill_level": "a"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn finish_quiz(app: &Router, id: &str) {
    for _ in 0..10 {
        let (status, _) = send(
            app,
            "POST",
            &format!("/sessions/{}/answers", id),
            Some(json!({"answer": "A"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_full_session_flow() {
    let app = app(vec![
        Ok(quiz_reply()),
        Ok("# Introduction to Hindi\nNamaste means hello.".to_string()),
        Ok(follow_ups_reply()),
        Ok(json!({"question": "What do you say when meeting someone?", "correct_answer": "namaste", "explanation": "Greeting"}).to_string()),
    ]);
    let id = create_session(&app).await;

    let (status, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["phase"], "quiz");
    assert_eq!(session["skill_level"], "Beginner");
    assert_eq!(session["questions_total"], 10);

    let (status, question) = send(&app, "GET", &format!("/sessions/{}/question", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(question["text"], "Question 1");
    assert!(question.get("answer").is_none());

    finish_quiz(&app, &id).await;
    let (status, _) = send(&app, "GET", &format!("/sessions/{}/question", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, result) = send(&app, "GET", &format!("/sessions/{}/results", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["score"], 7);
    assert_eq!(result["total"], 10);
    assert_eq!(result["percentage"], 70.0);

    let (status, curriculum) =
        send(&app, "POST", &format!("/sessions/{}/curriculum", id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(curriculum["curriculum"]["skill_level"], "Beginner");
    assert_eq!(curriculum["progress"]["state"], "lesson_presented");
    assert_eq!(curriculum["progress"]["topic"], "Introduction to Hindi");

    let (status, lesson) = send(&app, "POST", &format!("/sessions/{}/lesson", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(lesson["content"].as_str().unwrap().contains("Namaste"));
    assert_eq!(lesson["follow_up"], "Say hello");

    let (status, missed) = send(
        &app,
        "POST",
        &format!("/sessions/{}/follow-up", id),
        Some(json!({"answer": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(missed["feedback"]["is_correct"], false);
    assert_eq!(missed["feedback"]["correct_answer"], "namaste");
    assert_eq!(
        missed["remediation_question"],
        "What do you say when meeting someone?"
    );
    assert_eq!(missed["progress"]["state"], "remediation");

    let (status, remediated) = send(
        &app,
        "POST",
        &format!("/sessions/{}/remediation", id),
        Some(json!({"answer": " Namaste "})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(remediated["feedback"]["is_correct"], true);
    assert_eq!(remediated["progress"]["pending_question"], "Say thanks");

    for answer in ["dhanyavaad", "haan"] {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/sessions/{}/follow-up", id),
            Some(json!({"answer": answer})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feedback"]["is_correct"], true);
        assert!(body["remediation_question"].is_null());
    }

    let (status, progress) = send(
        &app,
        "POST",
        &format!("/sessions/{}/advance", id),
        Some(json!({"command": "n"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["state"], "lesson_presented");
    assert_eq!(progress["topic"], "Core Vocabulary");
    assert_eq!(progress["completed_topics"], json!(["Introduction to Hindi"]));

    let (status, progress) = send(&app, "POST", &format!("/sessions/{}/quit", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["state"], "quit");
    assert_eq!(progress["completed_topics"], json!(["Introduction to Hindi"]));

    let (_, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["phase"], "quit");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = app(vec![]);
    let (status, body) = send(
        &app,
        "GET",
        "/sessions/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_deleted_session_is_gone() {
    let app = app(vec![Ok(quiz_reply())]);
    let id = create_session(&app).await;

    let (status, _) = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_skill_level_is_rejected() {
    let app = app(vec![]);
    let (status, _) = send(&app, "POST", "/sessions", Some(json!({"skill_level": "expert"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quiz_generation_failure_is_bad_gateway() {
    let app = app(vec![Err(BackendError::new("rate limited"))]);
    let (status, body) = send(&app, "POST", "/sessions", Some(json!({"skill_level": "b"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn test_short_quiz_is_bad_gateway() {
    let app = app(vec![Ok(json!([{"text": "Only one"}]).to_string())]);
    let (status, _) = send(&app, "POST", "/sessions", Some(json!({"skill_level": "c"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_out_of_order_requests_conflict() {
    let app = app(vec![Ok(quiz_reply())]);
    let id = create_session(&app).await;

    let (status, _) = send(&app, "GET", &format!("/sessions/{}/results", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, "POST", &format!("/sessions/{}/curriculum", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, "POST", &format!("/sessions/{}/lesson", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    finish_quiz(&app, &id).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/sessions/{}/answers", id),
        Some(json!({"answer": "a"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", &format!("/sessions/{}/curriculum", id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, "POST", &format!("/sessions/{}/curriculum", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/sessions/{}/advance", id),
        Some(json!({"command": "next"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(
        &app,
        "POST",
        &format!("/sessions/{}/advance", id),
        Some(json!({"command": "skip"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_quiz_answer_is_bad_request() {
    let app = app(vec![Ok(quiz_reply())]);
    let id = create_session(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/answers", id),
        Some(json!({"answer": "e"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("a, b, c, d"));

    let (_, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["questions_answered"], 0);
}

#[tokio::test]
async fn test_lesson_failure_keeps_session_retryable() {
    let app = app(vec![
        Ok(quiz_reply()),
        Err(BackendError::new("timeout")),
        Ok("# Introduction to Hindi\nNamaste.".to_string()),
        Ok(follow_ups_reply()),
    ]);
    let id = create_session(&app).await;
    finish_quiz(&app, &id).await;
    send(&app, "POST", &format!("/sessions/{}/curriculum", id), None).await;

    let (status, _) = send(&app, "POST", &format!("/sessions/{}/lesson", id), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let (_, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["progress"]["state"], "lesson_presented");

    let (status, lesson) = send(&app, "POST", &format!("/sessions/{}/lesson", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lesson["progress"]["state"], "follow_up_pending");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app(vec![]);
    let (status, doc) = send(&app, "GET", "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/sessions/{id}/follow-up").is_some());
}
