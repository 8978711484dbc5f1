//! A scripted stand-in for the generation backend.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use tutor_core::{
    BackendError, Curriculum, LLMClient, LessonSequencer, PromptSet, SkillLevel, Topic,
};

/// Replies with queued responses in order and records every prompt it saw.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, text: impl Into<String>) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(BackendError::new(message)));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::new("script exhausted")))
    }
}

/// Three follow-ups whose answers are "one", "two" and "three".
pub fn follow_ups_reply() -> String {
    let items: Vec<_> = ["one", "two", "three"]
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            json!({
                "question": format!("Follow-up {}", i + 1),
                "correct_answer": answer,
                "explanation": format!("Because {}", answer),
                "study_recommendation": "Review the lesson"
            })
        })
        .collect();
    format!("Here are the questions:\n{}", serde_json::Value::Array(items))
}

pub fn focused_reply(answer: &str) -> String {
    json!({
        "question": "Focused question",
        "correct_answer": answer,
        "explanation": "A narrower look at the idea"
    })
    .to_string()
}

/// Queues a lesson and its follow-up set.
pub fn script_lesson(client: &ScriptedClient, topic: &str) {
    client
        .reply(format!("# {}\nLesson body.", topic))
        .reply(follow_ups_reply());
}

pub fn curriculum(topics: &[&str]) -> Curriculum {
    Curriculum {
        skill_level: SkillLevel::Intermediate,
        key_topics: topics
            .iter()
            .map(|t| Topic::new(*t, vec![format!("{} basics", t)]))
            .collect(),
        sections: serde_json::Map::new(),
    }
}

pub fn sequencer(client: Arc<ScriptedClient>, topics: &[&str]) -> LessonSequencer {
    LessonSequencer::new(client, Arc::new(PromptSet::default()), "Hindi", curriculum(topics))
}
