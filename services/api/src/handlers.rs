//! Axum Handlers for the REST API
//!
//! Each handler loads the session record, rebuilds whatever engine object
//! the step needs, runs the step, and writes the updated record back. A
//! failed step is never saved, so the learner can repeat the request.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tutor_core::{
    FollowUpOutcome, LessonSequencer, NavigationCommand, OptionLabel, ProgressionSnapshot,
    QuizSession, SkillLevel, TutorError,
};
use uuid::Uuid;

use crate::{
    models::{
        AnswerPayload, AnswerResponse, CreateSessionPayload, CurriculumResponse, ErrorResponse,
        FeedbackView, FollowUpResponse, LessonView, NavigationPayload, ProgressView, QuestionView,
        RemediationResponse, ResultView, SessionView,
    },
    state::AppState,
    store::SessionRecord,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Unprocessable(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::BadGateway(message) => {
                error!("Generation failed: {}", message);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("generation failed, try again: {}", message),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<TutorError> for ApiError {
    fn from(err: TutorError) -> Self {
        match err {
            TutorError::NoContent(message) => Self::Unprocessable(message),
            TutorError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            err => Self::BadGateway(err.to_string()),
        }
    }
}

async fn load_session(state: &AppState, id: Uuid) -> Result<SessionRecord, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session with id '{}' not found", id)))
}

fn lessons_of(record: &SessionRecord) -> Result<ProgressionSnapshot, ApiError> {
    record
        .lessons
        .clone()
        .ok_or_else(|| ApiError::Conflict("lessons have not started; request a curriculum first".to_string()))
}

fn resume(state: &AppState, snapshot: ProgressionSnapshot) -> LessonSequencer {
    LessonSequencer::resume(
        state.llm_client.clone(),
        state.prompts.clone(),
        state.language.as_str(),
        snapshot,
    )
}

/// Stores the sequencer's snapshot on the record and returns its progress view.
async fn save_lessons(
    state: &AppState,
    mut record: SessionRecord,
    sequencer: &LessonSequencer,
) -> ProgressView {
    let snapshot = sequencer.snapshot();
    let progress = ProgressView::from(&snapshot);
    record.lessons = Some(snapshot);
    state.sessions.save(record).await;
    progress
}

/// Start a session: generate the placement quiz for the chosen level.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session created with a fresh quiz", body = SessionView),
        (status = 400, description = "Unknown skill level", body = ErrorResponse),
        (status = 502, description = "Quiz generation failed", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let skill_level: SkillLevel = payload
        .skill_level
        .parse()
        .map_err(|e: tutor_core::assessment::UnknownSkillLevel| ApiError::BadRequest(e.to_string()))?;

    let questions = state.assessment.generate_quiz(skill_level).await?;
    let record = SessionRecord::new(QuizSession::new(skill_level, questions));
    let view = SessionView::from(&record);
    let id = state.sessions.insert(record).await;
    info!(session_id = %id, %skill_level, "Session created");

    Ok((StatusCode::CREATED, Json(view)))
}

/// Get a session summary.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let record = load_session(&state, id).await?;
    Ok(Json(SessionView::from(&record)))
}

/// End a session and discard everything stored for it.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.sessions.remove(id).await {
        return Err(ApiError::NotFound(format!("Session with id '{}' not found", id)));
    }
    info!(session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Get the current quiz question, without its answer.
#[utoipa::path(
    get,
    path = "/sessions/{id}/question",
    responses(
        (status = 200, description = "The next unanswered question", body = QuestionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The quiz is finished", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionView>, ApiError> {
    let record = load_session(&state, id).await?;
    let quiz = &record.quiz;
    let question = quiz
        .current()
        .ok_or_else(|| ApiError::Conflict("the quiz is finished".to_string()))?;
    Ok(Json(QuestionView::new(
        quiz.position(),
        quiz.questions.len(),
        question,
    )))
}

/// Answer the current quiz question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    request_body = AnswerPayload,
    responses(
        (status = 200, description = "Whether the answer was correct", body = AnswerResponse),
        (status = 400, description = "Answer is not one of a, b, c, d", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The quiz is finished", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let answer = OptionLabel::parse_input(&payload.answer).ok_or_else(|| {
        ApiError::BadRequest(format!("'{}' is not one of a, b, c, d", payload.answer))
    })?;

    let mut record = load_session(&state, id).await?;
    let feedback = record.quiz.submit(answer)?;
    let quiz_finished = record.quiz.is_finished();
    if quiz_finished {
        record.result = Some(record.quiz.result());
    }
    state.sessions.save(record).await;

    Ok(Json(AnswerResponse {
        is_correct: feedback.correct,
        correct_answer: feedback.correct_answer.to_string(),
        quiz_finished,
    }))
}

/// Get the quiz score.
#[utoipa::path(
    get,
    path = "/sessions/{id}/results",
    responses(
        (status = 200, description = "Score, total and percentage", body = ResultView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The quiz is not finished", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResultView>, ApiError> {
    let record = load_session(&state, id).await?;
    let result = record.result.ok_or_else(|| {
        ApiError::Conflict(format!(
            "the quiz is not finished ({} of {} answered)",
            record.quiz.position(),
            record.quiz.questions.len()
        ))
    })?;
    Ok(Json(ResultView::from(result)))
}

/// Synthesize the curriculum from the quiz score and start the lessons.
#[utoipa::path(
    post,
    path = "/sessions/{id}/curriculum",
    responses(
        (status = 201, description = "Curriculum created; the first topic is ready", body = CurriculumResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Quiz unfinished or curriculum already created", body = ErrorResponse),
        (status = 422, description = "The curriculum has no topics", body = ErrorResponse),
        (status = 502, description = "Curriculum generation failed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn create_curriculum(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = load_session(&state, id).await?;
    if record.lessons.is_some() {
        return Err(ApiError::Conflict(
            "a curriculum already exists for this session".to_string(),
        ));
    }
    let result = record
        .result
        .ok_or_else(|| ApiError::Conflict("finish the quiz before requesting a curriculum".to_string()))?;

    let curriculum = state
        .curriculum_service
        .synthesize(record.quiz.skill_level, result.percentage, state.language.as_str())
        .await?;

    let mut sequencer = LessonSequencer::new(
        state.llm_client.clone(),
        state.prompts.clone(),
        state.language.as_str(),
        curriculum,
    )
    .with_progression(record.quiz.clone().into_progression());
    sequencer.start()?;

    let response = CurriculumResponse {
        curriculum: sequencer.curriculum().clone(),
        progress: ProgressView::from(&sequencer.snapshot()),
    };
    save_lessons(&state, record, &sequencer).await;
    info!(session_id = %id, topics = sequencer.curriculum().key_topics.len(), "Curriculum stored");

    Ok((StatusCode::CREATED, Json(response)))
}

/// Generate the lesson for the current topic and its follow-up questions.
#[utoipa::path(
    post,
    path = "/sessions/{id}/lesson",
    responses(
        (status = 200, description = "Lesson text and the first follow-up question", body = LessonView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No lesson is due", body = ErrorResponse),
        (status = 422, description = "No follow-up questions were generated", body = ErrorResponse),
        (status = 502, description = "Lesson generation failed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn present_lesson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LessonView>, ApiError> {
    let record = load_session(&state, id).await?;
    let mut sequencer = resume(&state, lessons_of(&record)?);

    let lesson = sequencer.present_lesson().await?;
    let progress = save_lessons(&state, record, &sequencer).await;
    Ok(Json(LessonView::new(lesson, progress)))
}

/// Answer the pending follow-up question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/follow-up",
    request_body = AnswerPayload,
    responses(
        (status = 200, description = "Feedback, plus a focused question after a miss", body = FollowUpResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No follow-up question is pending", body = ErrorResponse),
        (status = 502, description = "Focused question generation failed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn answer_follow_up(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<FollowUpResponse>, ApiError> {
    let record = load_session(&state, id).await?;
    let mut sequencer = resume(&state, lessons_of(&record)?);

    let (feedback, remediation_question) = match sequencer.answer_follow_up(&payload.answer).await? {
        FollowUpOutcome::Correct { question } => (FeedbackView::new(&question, true), None),
        FollowUpOutcome::Incorrect { question, focused } => {
            (FeedbackView::new(&question, false), Some(focused.question))
        }
    };
    let progress = save_lessons(&state, record, &sequencer).await;

    Ok(Json(FollowUpResponse {
        feedback,
        remediation_question,
        progress,
    }))
}

/// Answer the focused remediation question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/remediation",
    request_body = AnswerPayload,
    responses(
        (status = 200, description = "Feedback; the follow-up set resumes", body = RemediationResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No remediation question is pending", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn answer_remediation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<RemediationResponse>, ApiError> {
    let record = load_session(&state, id).await?;
    let mut sequencer = resume(&state, lessons_of(&record)?);

    let outcome = sequencer.answer_remediation(&payload.answer)?;
    let progress = save_lessons(&state, record, &sequencer).await;

    Ok(Json(RemediationResponse {
        feedback: FeedbackView::new(&outcome.focused, outcome.correct),
        progress,
    }))
}

/// Move on after a finished topic: next, repeat or quit.
#[utoipa::path(
    post,
    path = "/sessions/{id}/advance",
    request_body = NavigationPayload,
    responses(
        (status = 200, description = "The new lesson-loop state", body = ProgressView),
        (status = 400, description = "Unknown command", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The current topic is not finished", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn advance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NavigationPayload>,
) -> Result<Json<ProgressView>, ApiError> {
    let command = NavigationCommand::parse(&payload.command).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "'{}' is not one of next, repeat, quit",
            payload.command
        ))
    })?;

    let record = load_session(&state, id).await?;
    let mut sequencer = resume(&state, lessons_of(&record)?);
    sequencer.advance(command)?;

    Ok(Json(save_lessons(&state, record, &sequencer).await))
}

/// Leave the lesson loop. Completed topics are kept.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quit",
    responses(
        (status = 200, description = "The lesson loop has ended", body = ProgressView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Lessons have not started", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn quit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressView>, ApiError> {
    let record = load_session(&state, id).await?;
    let mut sequencer = resume(&state, lessons_of(&record)?);
    if sequencer.is_finished() {
        warn!(session_id = %id, state = %sequencer.state(), "Quit requested after the lessons ended");
    }
    sequencer.quit();

    Ok(Json(save_lessons(&state, record, &sequencer).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tutor_core::BackendError;

    async fn status_and_message(err: ApiError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json["message"].as_str().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn test_tutor_errors_map_to_status_codes() {
        let cases = [
            (
                TutorError::from(BackendError::new("quota")),
                StatusCode::BAD_GATEWAY,
            ),
            (
                TutorError::validation("quiz", "too short"),
                StatusCode::BAD_GATEWAY,
            ),
            (
                TutorError::no_content("no topics"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                TutorError::invalid_transition("idle", "advance"),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, expected) in cases {
            let (status, _) = status_and_message(ApiError::from(err)).await;
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn test_generation_failure_message_asks_to_retry() {
        let err = ApiError::from(TutorError::from(BackendError::new("timeout")));
        let (_, message) = status_and_message(err).await;
        assert!(message.starts_with("generation failed, try again"));
        assert!(message.contains("timeout"));
    }
}
