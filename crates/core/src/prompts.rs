//! Prompt templates for every generation request the engine makes.
//!
//! Templates are markdown files with `{name}` placeholders. The built-in
//! set is compiled in from `prompts/`; a directory of `*.md` files can
//! override any of them by file stem.

use anyhow::Context;
use std::{collections::HashMap, fs, path::Path};
use tracing::{info, warn};

/// The generation requests the engine knows how to phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Quiz,
    Curriculum,
    Lesson,
    FollowUps,
    FocusedQuestion,
}

impl PromptKind {
    pub const ALL: [PromptKind; 5] = [
        PromptKind::Quiz,
        PromptKind::Curriculum,
        PromptKind::Lesson,
        PromptKind::FollowUps,
        PromptKind::FocusedQuestion,
    ];

    /// File stem of the template on disk.
    pub fn key(&self) -> &'static str {
        match self {
            PromptKind::Quiz => "generate_quiz",
            PromptKind::Curriculum => "generate_curriculum",
            PromptKind::Lesson => "generate_lesson",
            PromptKind::FollowUps => "generate_follow_ups",
            PromptKind::FocusedQuestion => "generate_focused_question",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            PromptKind::Quiz => include_str!("../prompts/generate_quiz.md"),
            PromptKind::Curriculum => include_str!("../prompts/generate_curriculum.md"),
            PromptKind::Lesson => include_str!("../prompts/generate_lesson.md"),
            PromptKind::FollowUps => include_str!("../prompts/generate_follow_ups.md"),
            PromptKind::FocusedQuestion => include_str!("../prompts/generate_focused_question.md"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptSet {
    templates: HashMap<PromptKind, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        let templates = PromptKind::ALL
            .iter()
            .map(|kind| (*kind, kind.builtin().to_string()))
            .collect();
        Self { templates }
    }
}

impl PromptSet {
    /// Loads overrides from every `*.md` file in `prompts_path` on top of the
    /// built-in templates. Unknown file stems are ignored.
    pub fn from_dir(prompts_path: &Path) -> anyhow::Result<Self> {
        let mut set = Self::default();
        let entries = fs::read_dir(prompts_path)
            .with_context(|| format!("Could not read prompts directory {:?}", prompts_path))?;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?;
            match PromptKind::ALL.iter().find(|kind| kind.key() == stem) {
                Some(kind) => {
                    let content = fs::read_to_string(&path)?;
                    set.templates.insert(*kind, content);
                    info!(prompt = stem, "Loaded prompt override");
                }
                None => warn!(file = ?path, "Ignoring unknown prompt template"),
            }
        }
        Ok(set)
    }

    /// Fills `kind`'s template, replacing each `{name}` with its value.
    pub fn render(&self, kind: PromptKind, vars: &[(&str, &str)]) -> String {
        let template = self
            .templates
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.builtin());
        vars.iter().fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        })
    }
}
