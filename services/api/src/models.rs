//! API Models
//!
//! Request payloads and response views for the tutoring API. Views are built
//! from the engine's types and never expose answers the learner has not
//! been asked yet. `utoipa` derives feed the OpenAPI document.

use crate::store::SessionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tutor_core::{
    Curriculum, FollowUpQuestion, Lesson, LessonState, ProgressionSnapshot, Question, QuizResult,
};
use utoipa::ToSchema;
use uuid::Uuid;

/// Where a session is in the overall flow.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Quiz,
    QuizComplete,
    Lessons,
    Completed,
    Quit,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionPayload {
    /// `beginner`, `intermediate`, `advanced`, or the menu keys `a`, `b`, `c`.
    #[schema(example = "beginner")]
    pub skill_level: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AnswerPayload {
    #[schema(example = "b")]
    pub answer: String,
}

#[derive(Deserialize, ToSchema)]
pub struct NavigationPayload {
    /// `next`, `repeat` or `quit` (or `n`, `r`, `q`).
    #[schema(example = "next")]
    pub command: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ResultView {
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
}

impl From<QuizResult> for ResultView {
    fn from(result: QuizResult) -> Self {
        Self {
            score: result.score,
            total: result.total,
            percentage: result.percentage,
        }
    }
}

/// Lesson-loop progress, derived from a stored snapshot.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ProgressView {
    #[schema(example = "follow_up_pending")]
    pub state: String,
    pub topic: Option<String>,
    /// The question awaiting an answer: a follow-up, or the focused
    /// remediation question.
    pub pending_question: Option<String>,
    /// The lesson the pending question belongs to, for re-display.
    pub lesson: Option<String>,
    pub completed_topics: Vec<String>,
    pub current_topic_index: usize,
}

impl From<&ProgressionSnapshot> for ProgressView {
    fn from(snapshot: &ProgressionSnapshot) -> Self {
        let pending_question = match &snapshot.state {
            LessonState::FollowUpPending {
                questions, index, ..
            } => questions.get(*index).map(|q| q.question.clone()),
            LessonState::Remediation { focused, .. } => Some(focused.question.clone()),
            _ => None,
        };
        Self {
            state: snapshot.state.name().to_string(),
            topic: snapshot.state.topic().map(str::to_string),
            pending_question,
            lesson: snapshot.state.lesson().map(str::to_string),
            completed_topics: snapshot.progression.completed_topics.clone(),
            current_topic_index: snapshot.progression.current_topic_index,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    #[schema(example = "Beginner")]
    pub skill_level: String,
    pub phase: SessionPhase,
    pub questions_answered: usize,
    pub questions_total: usize,
    pub result: Option<ResultView>,
    pub progress: Option<ProgressView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SessionRecord> for SessionView {
    fn from(record: &SessionRecord) -> Self {
        let phase = match &record.lessons {
            Some(snapshot) => match snapshot.state {
                LessonState::Completed => SessionPhase::Completed,
                LessonState::Quit => SessionPhase::Quit,
                _ => SessionPhase::Lessons,
            },
            None if record.quiz.is_finished() => SessionPhase::QuizComplete,
            None => SessionPhase::Quiz,
        };
        Self {
            id: record.id,
            skill_level: record.quiz.skill_level.to_string(),
            phase,
            questions_answered: record.quiz.position(),
            questions_total: record.quiz.questions.len(),
            result: record.result.map(ResultView::from),
            progress: record.lessons.as_ref().map(ProgressView::from),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// A quiz question with its answer withheld.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub choices: BTreeMap<String, String>,
}

impl QuestionView {
    pub fn new(index: usize, total: usize, question: &Question) -> Self {
        Self {
            index,
            total,
            text: question.text.clone(),
            choices: question
                .choices
                .iter()
                .map(|(label, text)| (label.as_str().to_string(), text.clone()))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct AnswerResponse {
    pub is_correct: bool,
    #[schema(example = "c")]
    pub correct_answer: String,
    pub quiz_finished: bool,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct CurriculumResponse {
    /// The curriculum as synthesized: `skill_level`, `key_topics` and every
    /// other section the model returned.
    #[schema(value_type = Object)]
    pub curriculum: Curriculum,
    pub progress: ProgressView,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct LessonView {
    pub topic: String,
    pub content: String,
    pub follow_up: Option<String>,
    pub progress: ProgressView,
}

impl LessonView {
    pub fn new(lesson: Lesson, progress: ProgressView) -> Self {
        Self {
            topic: lesson.topic,
            content: lesson.content,
            follow_up: progress.pending_question.clone(),
            progress,
        }
    }
}

/// Feedback for an answered follow-up or remediation question.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct FeedbackView {
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: String,
    pub study_recommendation: String,
}

impl FeedbackView {
    pub fn new(question: &FollowUpQuestion, is_correct: bool) -> Self {
        Self {
            is_correct,
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
            study_recommendation: question.study_recommendation.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct FollowUpResponse {
    pub feedback: FeedbackView,
    /// Set when the miss opened a remediation round.
    pub remediation_question: Option<String>,
    pub progress: ProgressView,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct RemediationResponse {
    pub feedback: FeedbackView,
    pub progress: ProgressView,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
