//! Placement quiz: generation, answer checking and scoring.

use crate::{
    error::{Result, TutorError},
    extractor::extract_array,
    llm_client::LLMClient,
    progression::ProgressionState,
    prompts::{PromptKind, PromptSet},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};
use tracing::{info, warn};

/// Number of questions in a placement quiz.
pub const QUIZ_LENGTH: usize = 10;

const QUIZ_TEMPERATURE: f32 = 0.0;

/// The learner's self-reported level, fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillLevel::Beginner => write!(f, "Beginner"),
            SkillLevel::Intermediate => write!(f, "Intermediate"),
            SkillLevel::Advanced => write!(f, "Advanced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown skill level '{0}' (expected a/b/c or Beginner/Intermediate/Advanced)")]
pub struct UnknownSkillLevel(pub String);

impl FromStr for SkillLevel {
    type Err = UnknownSkillLevel;

    /// Accepts the menu letters (`a`, `b`, `c`) or the level names.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" | "beginner" => Ok(SkillLevel::Beginner),
            "b" | "intermediate" => Ok(SkillLevel::Intermediate),
            "c" | "advanced" => Ok(SkillLevel::Advanced),
            _ => Err(UnknownSkillLevel(s.to_string())),
        }
    }
}

/// One of the four answer slots of a quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLabel::A => "a",
            OptionLabel::B => "b",
            OptionLabel::C => "c",
            OptionLabel::D => "d",
        }
    }

    /// Parses learner input: surrounding whitespace and case are ignored.
    pub fn parse_input(input: &str) -> Option<Self> {
        input.trim().to_lowercase().parse().ok()
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not one of a, b, c, d")]
pub struct InvalidOption(pub String);

impl FromStr for OptionLabel {
    type Err = InvalidOption;

    /// Exact match on the lowercase label.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "a" => Ok(OptionLabel::A),
            "b" => Ok(OptionLabel::B),
            "c" => Ok(OptionLabel::C),
            "d" => Ok(OptionLabel::D),
            _ => Err(InvalidOption(s.to_string())),
        }
    }
}

impl TryFrom<String> for OptionLabel {
    type Error = InvalidOption;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptionLabel> for String {
    fn from(label: OptionLabel) -> Self {
        label.as_str().to_string()
    }
}

/// A validated four-option quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub choices: BTreeMap<OptionLabel, String>,
    pub answer: OptionLabel,
}

impl Question {
    /// Validates one element of the model's quiz array.
    fn from_value(index: usize, value: &Value) -> Result<Self> {
        let what = format!("quiz question {}", index + 1);
        let obj = value
            .as_object()
            .ok_or_else(|| TutorError::validation(&what, "not a JSON object"))?;

        let text = obj
            .get("text")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TutorError::validation(&what, "missing question text"))?
            .to_string();

        let raw_choices = obj
            .get("choices")
            .and_then(Value::as_object)
            .ok_or_else(|| TutorError::validation(&what, "choices is not an object"))?;
        let mut choices = BTreeMap::new();
        for (label, choice) in raw_choices {
            let label = OptionLabel::parse_input(label).ok_or_else(|| {
                TutorError::validation(&what, format!("unexpected choice label '{}'", label))
            })?;
            let choice = choice.as_str().ok_or_else(|| {
                TutorError::validation(&what, format!("choice '{}' is not text", label))
            })?;
            choices.insert(label, choice.to_string());
        }
        if choices.len() != OptionLabel::ALL.len() {
            return Err(TutorError::validation(
                &what,
                format!("expected choices a-d, found {}", choices.len()),
            ));
        }

        let answer = obj
            .get("answer")
            .and_then(Value::as_str)
            .and_then(OptionLabel::parse_input)
            .ok_or_else(|| TutorError::validation(&what, "answer is not one of a, b, c, d"))?;

        Ok(Self {
            text,
            choices,
            answer,
        })
    }
}

/// Feedback for a single quiz answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_answer: OptionLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: u32,
    pub total: u32,
    /// Percentage correct, rounded to two decimals; 0 for an empty quiz.
    pub percentage: f64,
}

/// Compares `chosen` to the question's answer label.
pub fn record_answer(question: &Question, chosen: OptionLabel) -> AnswerFeedback {
    AnswerFeedback {
        correct: chosen == question.answer,
        correct_answer: question.answer,
    }
}

/// Scores responses against questions pairwise.
///
/// Extra items on either side are not paired, but `total` is always the
/// number of questions so unanswered questions count against the score.
pub fn score(responses: &[OptionLabel], questions: &[Question]) -> QuizResult {
    let correct = responses
        .iter()
        .zip(questions)
        .filter(|(response, question)| **response == question.answer)
        .count() as u32;
    let total = questions.len() as u32;
    let percentage = if total == 0 {
        0.0
    } else {
        (f64::from(correct) / f64::from(total) * 100.0 * 100.0).round() / 100.0
    };
    info!(score = correct, total, percentage, "Quiz scored");
    QuizResult {
        score: correct,
        total,
        percentage,
    }
}

/// Generates placement quizzes.
pub struct AssessmentEngine {
    client: Arc<dyn LLMClient>,
    prompts: Arc<PromptSet>,
    language: String,
}

impl AssessmentEngine {
    pub fn new(client: Arc<dyn LLMClient>, prompts: Arc<PromptSet>, language: impl Into<String>) -> Self {
        Self {
            client,
            prompts,
            language: language.into(),
        }
    }

    /// Requests a [`QUIZ_LENGTH`]-question quiz at `skill_level`.
    ///
    /// Fewer questions, or any malformed question, fails the whole quiz.
    /// There is no retry.
    pub async fn generate_quiz(&self, skill_level: SkillLevel) -> Result<Vec<Question>> {
        info!(%skill_level, language = %self.language, "Generating quiz");
        let level = skill_level.to_string();
        let prompt = self.prompts.render(
            PromptKind::Quiz,
            &[("language", &self.language), ("skill_level", &level)],
        );
        let raw = self.client.generate(&prompt, QUIZ_TEMPERATURE).await?;
        let items = extract_array(&raw)?;

        if items.len() < QUIZ_LENGTH {
            return Err(TutorError::validation(
                "quiz",
                format!("expected {} questions, got {}", QUIZ_LENGTH, items.len()),
            ));
        }
        if items.len() > QUIZ_LENGTH {
            warn!(received = items.len(), "Quiz has extra questions; keeping the first {}", QUIZ_LENGTH);
        }

        let questions = items
            .iter()
            .take(QUIZ_LENGTH)
            .enumerate()
            .map(|(index, value)| Question::from_value(index, value))
            .collect::<Result<Vec<_>>>()?;
        info!(count = questions.len(), "Quiz generated");
        Ok(questions)
    }
}

/// A quiz being taken, one question at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    pub skill_level: SkillLevel,
    pub questions: Vec<Question>,
    pub progression: ProgressionState,
}

impl QuizSession {
    pub fn new(skill_level: SkillLevel, questions: Vec<Question>) -> Self {
        Self {
            skill_level,
            questions,
            progression: ProgressionState::new(),
        }
    }

    /// Zero-based index of the next unanswered question.
    pub fn position(&self) -> usize {
        self.progression.user_responses.len()
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.position())
    }

    pub fn is_finished(&self) -> bool {
        self.position() >= self.questions.len()
    }

    /// Records `answer` for the current question.
    pub fn submit(&mut self, answer: OptionLabel) -> Result<AnswerFeedback> {
        let question = self
            .current()
            .ok_or_else(|| TutorError::invalid_transition("quiz finished", "answer a question"))?;
        let feedback = record_answer(question, answer);
        self.progression.record_response(answer);
        Ok(feedback)
    }

    pub fn result(&self) -> QuizResult {
        score(&self.progression.user_responses, &self.questions)
    }

    pub fn into_progression(self) -> ProgressionState {
        self.progression
    }
}
