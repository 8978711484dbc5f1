//! Curriculum Synthesis Service
//!
//! This module turns a placement result into a structured curriculum: learning
//! objectives, ordered key topics with subtopics, resources, exercises and
//! assessment methods. The topic list is what drives the lesson sequencer;
//! everything else is carried through opaquely for display.

use crate::{
    assessment::SkillLevel,
    error::{Result, TutorError},
    extractor::extract_object,
    llm_client::LLMClient,
    prompts::{PromptKind, PromptSet},
    topic::Topic,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CURRICULUM_TEMPERATURE: f32 = 0.2;

/// A personalized curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    /// Always the caller's level, never the model's guess.
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub key_topics: Vec<Topic>,
    /// Objectives, resources, exercises and assessment methods, as returned.
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

impl Curriculum {
    /// Builds a curriculum from the model's JSON object.
    ///
    /// A missing topic list is not an error here; the sequencer reports it
    /// as "no content" when it is asked to start.
    pub fn from_payload(skill_level: SkillLevel, mut payload: Map<String, Value>) -> Result<Self> {
        payload.remove("skill_level");

        let key_topics = match take_key_topics(&mut payload) {
            Some(value) => serde_json::from_value::<Vec<Topic>>(value)
                .map_err(|e| TutorError::validation("curriculum key_topics", e.to_string()))?,
            None => {
                warn!("Curriculum has no key_topics field");
                Vec::new()
            }
        };

        Ok(Self {
            skill_level,
            key_topics,
            sections: payload,
        })
    }

    pub fn topic_names(&self) -> Vec<String> {
        self.key_topics
            .iter()
            .map(|t| t.topic_name.clone())
            .collect()
    }

    /// Subtopics of the topic named exactly `topic_name`.
    ///
    /// An unknown name yields an empty list rather than an error.
    pub fn subtopics(&self, topic_name: &str) -> Vec<String> {
        match self.key_topics.iter().find(|t| t.topic_name == topic_name) {
            Some(topic) => topic.subtopics.clone(),
            None => {
                warn!(topic = %topic_name, "No subtopics found for topic");
                Vec::new()
            }
        }
    }
}

/// Removes the topic list, preferring the exact key and falling back to a
/// loose match such as "Key Topics".
fn take_key_topics(payload: &mut Map<String, Value>) -> Option<Value> {
    if let Some(value) = payload.remove("key_topics") {
        return Some(value);
    }
    let loose_key = payload
        .keys()
        .find(|k| k.trim().to_lowercase().replace([' ', '-'], "_") == "key_topics")
        .cloned()?;
    payload.remove(&loose_key)
}

/// Defines the contract for any service that can synthesize a curriculum.
///
/// This abstraction allows the system to swap between different generation
/// approaches (LLM-backed, static) behind the same interface.
#[async_trait]
pub trait CurriculumSynthesizer: Send + Sync {
    /// Builds a curriculum for a learner at `skill_level` who scored
    /// `percentage` on the placement quiz, taught in `language`.
    async fn synthesize(
        &self,
        skill_level: SkillLevel,
        percentage: f64,
        language: &str,
    ) -> Result<Curriculum>;
}

/// An implementation of `CurriculumSynthesizer` backed by the generation capability.
pub struct LLMCurriculumSynthesizer {
    client: Arc<dyn LLMClient>,
    prompts: Arc<PromptSet>,
}

impl LLMCurriculumSynthesizer {
    pub fn new(client: Arc<dyn LLMClient>, prompts: Arc<PromptSet>) -> Self {
        Self { client, prompts }
    }
}

#[async_trait]
impl CurriculumSynthesizer for LLMCurriculumSynthesizer {
    async fn synthesize(
        &self,
        skill_level: SkillLevel,
        percentage: f64,
        language: &str,
    ) -> Result<Curriculum> {
        info!(%skill_level, percentage, %language, "Generating curriculum");
        let level = skill_level.to_string();
        let percentage = percentage.to_string();
        let prompt = self.prompts.render(
            PromptKind::Curriculum,
            &[
                ("skill_level", &level),
                ("language", language),
                ("percentage", &percentage),
            ],
        );

        let raw = self.client.generate(&prompt, CURRICULUM_TEMPERATURE).await?;
        let payload = extract_object(&raw)?;
        let curriculum = Curriculum::from_payload(skill_level, payload)?;

        info!(topics = ?curriculum.topic_names(), "Curriculum generated");
        debug!(sections = ?curriculum.sections.keys().collect::<Vec<_>>(), "Curriculum sections");
        Ok(curriculum)
    }
}

/// A static `CurriculumSynthesizer` for development and integration testing.
///
/// This implementation provides predictable, deterministic output, which is
/// useful for exercising the delivery surfaces without API costs.
pub struct StaticCurriculumSynthesizer;

#[async_trait]
impl CurriculumSynthesizer for StaticCurriculumSynthesizer {
    /// Produces a standard three-topic curriculum for any input.
    async fn synthesize(
        &self,
        skill_level: SkillLevel,
        percentage: f64,
        language: &str,
    ) -> Result<Curriculum> {
        let mut sections = Map::new();
        sections.insert(
            "learning_objectives".to_string(),
            json!([format!(
                "Build on a placement score of {}% in {}",
                percentage, language
            )]),
        );
        Ok(Curriculum {
            skill_level,
            key_topics: vec![
                Topic::new(
                    format!("Introduction to {}", language),
                    vec!["Script".to_string(), "Pronunciation".to_string()],
                ),
                Topic::new(
                    "Core Vocabulary",
                    vec!["Greetings".to_string(), "Numbers".to_string()],
                ),
                Topic::new("Everyday Conversation", vec!["Introductions".to_string()]),
            ],
            sections,
        })
    }
}
