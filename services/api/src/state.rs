//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the session store and service clients.

use crate::store::SessionStore;
use std::sync::Arc;
use tutor_core::{AssessmentEngine, CurriculumSynthesizer, LLMClient, PromptSet};

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub assessment: Arc<AssessmentEngine>,
    pub curriculum_service: Arc<dyn CurriculumSynthesizer>,
    pub llm_client: Arc<dyn LLMClient>,
    pub prompts: Arc<PromptSet>,
    pub language: Arc<String>,
}

impl AppState {
    pub fn new(
        llm_client: Arc<dyn LLMClient>,
        curriculum_service: Arc<dyn CurriculumSynthesizer>,
        prompts: Arc<PromptSet>,
        language: String,
    ) -> Self {
        let assessment = Arc::new(AssessmentEngine::new(
            llm_client.clone(),
            prompts.clone(),
            language.clone(),
        ));
        Self {
            sessions: SessionStore::new(),
            assessment,
            curriculum_service,
            llm_client,
            prompts,
            language: Arc::new(language),
        }
    }
}
