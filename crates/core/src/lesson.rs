//! The per-topic lesson loop.
//!
//! The sequencer walks the curriculum's topics in order. For each topic it
//! generates a lesson, poses follow-up questions generated from that
//! lesson, and answers a miss with exactly one focused remediation
//! question. Once every follow-up is resolved the topic is recorded as
//! completed and the learner chooses to go to the next topic, repeat this
//! one, or quit.
//!
//! ```text
//! Idle -> LessonPresented(t) -> FollowUpPending(t, i) -> Remediation(t, i)
//!                                      |                       |
//!                                      +-------> Advancing(t) <+
//! Advancing --next--> LessonPresented(t + 1) | Completed
//! Advancing --repeat--> LessonPresented(t)
//! any --quit--> Quit
//! ```
//!
//! Every entry point checks the current state and returns
//! [`TutorError::InvalidTransition`] when called out of turn. A failed
//! generation leaves the state untouched, so the caller may simply try the
//! same entry point again.

use crate::{
    assessment::SkillLevel,
    curriculum::Curriculum,
    error::{Result, TutorError},
    extractor::{extract_array, extract_object},
    llm_client::LLMClient,
    progression::ProgressionState,
    prompts::{PromptKind, PromptSet},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, mem, sync::Arc};
use tracing::{info, warn};

/// Number of follow-up questions requested per lesson.
pub const FOLLOW_UP_COUNT: usize = 3;

const LESSON_TEMPERATURE: f32 = 0.2;

/// A comprehension check generated from a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub question: String,
    pub correct_answer: String,
    pub explanation: String,
    #[serde(default)]
    pub study_recommendation: String,
}

impl FollowUpQuestion {
    /// Case-insensitive exact match, ignoring surrounding whitespace.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim().to_lowercase() == self.correct_answer.trim().to_lowercase()
    }
}

/// Lesson text for one topic, as generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub topic: String,
    pub content: String,
}

/// What the learner wants after finishing a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationCommand {
    Next,
    Repeat,
    Quit,
}

impl NavigationCommand {
    /// Parses `n`/`next`, `r`/`repeat` or `q`/`quit`. Anything else is `None`
    /// and the learner should be asked again.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "n" | "next" => Some(Self::Next),
            "r" | "repeat" => Some(Self::Repeat),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LessonState {
    Idle,
    /// The lesson for `topic` is due to be generated and shown.
    LessonPresented { topic: String },
    FollowUpPending {
        topic: String,
        lesson: String,
        questions: Vec<FollowUpQuestion>,
        index: usize,
    },
    /// Question `index` was missed; `focused` is the single clarifying question.
    Remediation {
        topic: String,
        lesson: String,
        questions: Vec<FollowUpQuestion>,
        index: usize,
        focused: FollowUpQuestion,
    },
    Advancing { topic: String },
    Completed,
    Quit,
}

impl LessonState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LessonState::Completed | LessonState::Quit)
    }

    /// Stable snake_case name, matching the serialized `state` tag.
    pub fn name(&self) -> &'static str {
        match self {
            LessonState::Idle => "idle",
            LessonState::LessonPresented { .. } => "lesson_presented",
            LessonState::FollowUpPending { .. } => "follow_up_pending",
            LessonState::Remediation { .. } => "remediation",
            LessonState::Advancing { .. } => "advancing",
            LessonState::Completed => "completed",
            LessonState::Quit => "quit",
        }
    }

    /// Text of the lesson currently being checked with follow-ups.
    pub fn lesson(&self) -> Option<&str> {
        match self {
            LessonState::FollowUpPending { lesson, .. } | LessonState::Remediation { lesson, .. } => {
                Some(lesson)
            }
            _ => None,
        }
    }

    /// The topic this state is about, if any.
    pub fn topic(&self) -> Option<&str> {
        match self {
            LessonState::LessonPresented { topic }
            | LessonState::FollowUpPending { topic, .. }
            | LessonState::Remediation { topic, .. }
            | LessonState::Advancing { topic } => Some(topic),
            LessonState::Idle | LessonState::Completed | LessonState::Quit => None,
        }
    }
}

impl fmt::Display for LessonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonState::Idle => write!(f, "idle"),
            LessonState::LessonPresented { topic } => write!(f, "presenting lesson '{}'", topic),
            LessonState::FollowUpPending { topic, index, .. } => {
                write!(f, "awaiting follow-up {} for '{}'", index + 1, topic)
            }
            LessonState::Remediation { topic, index, .. } => {
                write!(f, "remediating follow-up {} for '{}'", index + 1, topic)
            }
            LessonState::Advancing { topic } => write!(f, "finished '{}'", topic),
            LessonState::Completed => write!(f, "completed"),
            LessonState::Quit => write!(f, "quit"),
        }
    }
}

/// Result of answering a follow-up question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FollowUpOutcome {
    Correct { question: FollowUpQuestion },
    /// The miss has opened a remediation round around `focused`.
    Incorrect {
        question: FollowUpQuestion,
        focused: FollowUpQuestion,
    },
}

/// Result of answering the focused remediation question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationOutcome {
    pub correct: bool,
    pub focused: FollowUpQuestion,
}

/// Everything needed to rebuild a sequencer between interaction turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub curriculum: Curriculum,
    pub progression: ProgressionState,
    pub state: LessonState,
}

pub struct LessonSequencer {
    client: Arc<dyn LLMClient>,
    prompts: Arc<PromptSet>,
    language: String,
    curriculum: Curriculum,
    progression: ProgressionState,
    state: LessonState,
}

impl LessonSequencer {
    pub fn new(
        client: Arc<dyn LLMClient>,
        prompts: Arc<PromptSet>,
        language: impl Into<String>,
        curriculum: Curriculum,
    ) -> Self {
        Self {
            client,
            prompts,
            language: language.into(),
            curriculum,
            progression: ProgressionState::new(),
            state: LessonState::Idle,
        }
    }

    /// Carries over progression from the quiz stage.
    pub fn with_progression(mut self, progression: ProgressionState) -> Self {
        self.progression = progression;
        self
    }

    pub fn resume(
        client: Arc<dyn LLMClient>,
        prompts: Arc<PromptSet>,
        language: impl Into<String>,
        snapshot: ProgressionSnapshot,
    ) -> Self {
        Self {
            client,
            prompts,
            language: language.into(),
            curriculum: snapshot.curriculum,
            progression: snapshot.progression,
            state: snapshot.state,
        }
    }

    pub fn snapshot(&self) -> ProgressionSnapshot {
        ProgressionSnapshot {
            curriculum: self.curriculum.clone(),
            progression: self.progression.clone(),
            state: self.state.clone(),
        }
    }

    pub fn state(&self) -> &LessonState {
        &self.state
    }

    pub fn progression(&self) -> &ProgressionState {
        &self.progression
    }

    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    pub fn skill_level(&self) -> SkillLevel {
        self.curriculum.skill_level
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    fn topic_at(&self, index: usize) -> Option<String> {
        self.curriculum
            .key_topics
            .get(index)
            .map(|t| t.topic_name.clone())
    }

    /// Enters the loop at the current topic (the first one for a fresh run).
    pub fn start(&mut self) -> Result<&LessonState> {
        if self.state != LessonState::Idle {
            return Err(TutorError::invalid_transition(&self.state, "start lessons"));
        }
        if self.curriculum.key_topics.is_empty() {
            warn!("Curriculum has no topics; nothing to teach");
            return Err(TutorError::no_content("the curriculum has no key topics"));
        }
        self.state = match self.topic_at(self.progression.current_topic_index) {
            Some(topic) => LessonState::LessonPresented { topic },
            None => LessonState::Completed,
        };
        info!(state = %self.state, "Lesson sequence started");
        Ok(&self.state)
    }

    /// Generates the lesson for the pending topic and the follow-up set
    /// conditioned on it. Both are regenerated on every call.
    pub async fn present_lesson(&mut self) -> Result<Lesson> {
        let topic = match &self.state {
            LessonState::LessonPresented { topic } => topic.clone(),
            other => return Err(TutorError::invalid_transition(other, "present a lesson")),
        };

        let content = self.generate_lesson(&topic).await?;
        let questions = self.generate_follow_ups(&topic, &content).await?;

        self.state = LessonState::FollowUpPending {
            topic: topic.clone(),
            lesson: content.clone(),
            questions,
            index: 0,
        };
        Ok(Lesson { topic, content })
    }

    /// The follow-up question awaiting an answer.
    pub fn present_follow_up(&self) -> Result<&FollowUpQuestion> {
        match &self.state {
            LessonState::FollowUpPending {
                questions, index, ..
            } => questions.get(*index).ok_or_else(|| {
                TutorError::invalid_transition(&self.state, "present a follow-up question")
            }),
            other => Err(TutorError::invalid_transition(
                other,
                "present a follow-up question",
            )),
        }
    }

    /// Checks the learner's answer to the pending follow-up question.
    ///
    /// A correct answer moves on to the next follow-up (or finishes the
    /// topic). A miss generates one focused question and enters remediation.
    pub async fn answer_follow_up(&mut self, answer: &str) -> Result<FollowUpOutcome> {
        let question = self.present_follow_up()?.clone();

        if question.is_correct(answer) {
            info!(topic = ?self.state.topic(), "Follow-up answered correctly");
            self.next_follow_up();
            return Ok(FollowUpOutcome::Correct { question });
        }

        info!(topic = ?self.state.topic(), "Follow-up missed; generating a focused question");
        let focused = self.generate_focused_question(&question).await?;
        self.state = match mem::replace(&mut self.state, LessonState::Idle) {
            LessonState::FollowUpPending {
                topic,
                lesson,
                questions,
                index,
            } => LessonState::Remediation {
                topic,
                lesson,
                questions,
                index,
                focused: focused.clone(),
            },
            other => other,
        };
        Ok(FollowUpOutcome::Incorrect { question, focused })
    }

    /// The focused question of the current remediation round.
    pub fn present_remediation(&self) -> Result<&FollowUpQuestion> {
        match &self.state {
            LessonState::Remediation { focused, .. } => Ok(focused),
            other => Err(TutorError::invalid_transition(
                other,
                "present a remediation question",
            )),
        }
    }

    /// Checks the answer to the focused question and returns to the
    /// follow-up set. There is never a second remediation round.
    pub fn answer_remediation(&mut self, answer: &str) -> Result<RemediationOutcome> {
        let focused = self.present_remediation()?.clone();
        let correct = focused.is_correct(answer);
        info!(topic = ?self.state.topic(), correct, "Remediation answered");
        self.next_follow_up();
        Ok(RemediationOutcome { correct, focused })
    }

    /// Applies the learner's choice after a finished topic.
    pub fn advance(&mut self, command: NavigationCommand) -> Result<&LessonState> {
        if command == NavigationCommand::Quit {
            return Ok(self.quit());
        }
        let topic = match &self.state {
            LessonState::Advancing { topic } => topic.clone(),
            other => return Err(TutorError::invalid_transition(other, "advance")),
        };

        match command {
            NavigationCommand::Next => {
                self.progression.current_topic_index += 1;
                self.state = match self.topic_at(self.progression.current_topic_index) {
                    Some(next) => LessonState::LessonPresented { topic: next },
                    None => {
                        info!(
                            completed = self.progression.completed_topics.len(),
                            "All lessons completed"
                        );
                        LessonState::Completed
                    }
                };
            }
            NavigationCommand::Repeat => {
                info!(%topic, "Repeating lesson");
                self.state = LessonState::LessonPresented { topic };
            }
            NavigationCommand::Quit => {
                self.state = LessonState::Quit;
            }
        }
        Ok(&self.state)
    }

    /// Ends the run immediately. Completed topics are kept as they are.
    pub fn quit(&mut self) -> &LessonState {
        info!(
            from = %self.state,
            completed = self.progression.completed_topics.len(),
            "Learner quit the lesson sequence"
        );
        self.state = LessonState::Quit;
        &self.state
    }

    /// Moves past the current follow-up question, finishing the topic after
    /// the last one.
    fn next_follow_up(&mut self) {
        self.state = match mem::replace(&mut self.state, LessonState::Idle) {
            LessonState::FollowUpPending {
                topic,
                lesson,
                questions,
                index,
            }
            | LessonState::Remediation {
                topic,
                lesson,
                questions,
                index,
                ..
            } => {
                if index + 1 < questions.len() {
                    LessonState::FollowUpPending {
                        topic,
                        lesson,
                        questions,
                        index: index + 1,
                    }
                } else {
                    if self.progression.mark_completed(&topic) {
                        info!(%topic, "Topic completed");
                    }
                    LessonState::Advancing { topic }
                }
            }
            other => other,
        };
    }

    async fn generate_lesson(&self, topic: &str) -> Result<String> {
        info!(%topic, "Generating lesson");
        let subtopics = self.curriculum.subtopics(topic).join(", ");
        let level = self.skill_level().to_string();
        let prompt = self.prompts.render(
            PromptKind::Lesson,
            &[
                ("topic", topic),
                ("language", &self.language),
                ("subtopics", &subtopics),
                ("skill_level", &level),
            ],
        );
        let content = self.client.generate(&prompt, LESSON_TEMPERATURE).await?;
        if content.trim().is_empty() {
            return Err(TutorError::validation(
                format!("lesson for '{}'", topic),
                "empty response",
            ));
        }
        info!(%topic, "Lesson generated");
        Ok(content)
    }

    async fn generate_follow_ups(&self, topic: &str, lesson: &str) -> Result<Vec<FollowUpQuestion>> {
        let prompt = self.prompts.render(
            PromptKind::FollowUps,
            &[("topic", topic), ("lesson", lesson)],
        );
        let raw = self.client.generate(&prompt, LESSON_TEMPERATURE).await?;
        let items = extract_array(&raw)?;

        if items.is_empty() {
            return Err(TutorError::no_content(format!(
                "no follow-up questions were generated for '{}'",
                topic
            )));
        }
        if items.len() != FOLLOW_UP_COUNT {
            warn!(%topic, received = items.len(), "Unexpected number of follow-up questions");
        }

        items
            .into_iter()
            .take(FOLLOW_UP_COUNT)
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value::<FollowUpQuestion>(value).map_err(|e| {
                    TutorError::validation(format!("follow-up question {}", index + 1), e.to_string())
                })
            })
            .collect()
    }

    async fn generate_focused_question(&self, missed: &FollowUpQuestion) -> Result<FollowUpQuestion> {
        let prompt = self.prompts.render(
            PromptKind::FocusedQuestion,
            &[("question", &missed.question)],
        );
        let raw = self.client.generate(&prompt, LESSON_TEMPERATURE).await?;
        let payload = extract_object(&raw)?;
        serde_json::from_value(Value::Object(payload))
            .map_err(|e| TutorError::validation("focused question", e.to_string()))
    }
}
