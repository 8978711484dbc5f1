//! Adaptive language tutoring engine.
//!
//! The flow runs one way: skill level -> placement quiz -> score ->
//! curriculum -> per-topic lessons with follow-up questions and remediation.
//! Every stage talks to the text-generation backend through [`LLMClient`]
//! and validates what comes back before acting on it.

pub mod assessment;
pub mod config;
pub mod curriculum;
pub mod error;
pub mod extractor;
pub mod lesson;
pub mod llm_client;
pub mod progression;
pub mod prompts;
pub mod topic;

pub use assessment::{
    AnswerFeedback, AssessmentEngine, OptionLabel, Question, QuizResult, QuizSession, SkillLevel,
};
pub use config::{ConfigError, EngineConfig, Provider};
pub use curriculum::{Curriculum, CurriculumSynthesizer, LLMCurriculumSynthesizer};
pub use error::{BackendError, ExtractionError, Result, TutorError};
pub use lesson::{
    FollowUpOutcome, FollowUpQuestion, Lesson, LessonSequencer, LessonState, NavigationCommand,
    ProgressionSnapshot, RemediationOutcome,
};
pub use llm_client::{LLMClient, OpenAICompatibleClient};
pub use progression::ProgressionState;
pub use prompts::PromptSet;
pub use topic::Topic;
