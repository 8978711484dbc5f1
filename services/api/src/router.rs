//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application: the
//! quiz, curriculum and lesson-loop endpoints, plus the raw OpenAPI document.

use crate::{
    handlers,
    models::{
        AnswerPayload, AnswerResponse, CreateSessionPayload, CurriculumResponse, ErrorResponse,
        FeedbackView, FollowUpResponse, LessonView, NavigationPayload, ProgressView, QuestionView,
        RemediationResponse, ResultView, SessionPhase, SessionView,
    },
    state::AppState,
};

use axum::{
    Json, Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::get_session,
        handlers::delete_session,
        handlers::get_question,
        handlers::submit_answer,
        handlers::get_results,
        handlers::create_curriculum,
        handlers::present_lesson,
        handlers::answer_follow_up,
        handlers::answer_remediation,
        handlers::advance,
        handlers::quit,
    ),
    components(
        schemas(
            SessionView, SessionPhase, QuestionView, ResultView, ProgressView,
            CreateSessionPayload, AnswerPayload, AnswerResponse, NavigationPayload,
            CurriculumResponse, LessonView, FeedbackView, FollowUpResponse,
            RemediationResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Tutor API", description = "Placement quiz, curriculum and lesson loop for adaptive language tutoring")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/question", get(handlers::get_question))
        .route("/sessions/{id}/answers", post(handlers::submit_answer))
        .route("/sessions/{id}/results", get(handlers::get_results))
        .route("/sessions/{id}/curriculum", post(handlers::create_curriculum))
        .route("/sessions/{id}/lesson", post(handlers::present_lesson))
        .route("/sessions/{id}/follow-up", post(handlers::answer_follow_up))
        .route("/sessions/{id}/remediation", post(handlers::answer_remediation))
        .route("/sessions/{id}/advance", post(handlers::advance))
        .route("/sessions/{id}/quit", post(handlers::quit))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(api_router)
}
