use crate::assessment::OptionLabel;
use serde::{Deserialize, Serialize};

/// Where one learner is in the flow.
///
/// The assessment stage appends to `user_responses`; the lesson sequencer
/// owns `current_topic_index` and `completed_topics`. Nothing else mutates
/// it, and it is never shared between learners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub current_topic_index: usize,
    pub completed_topics: Vec<String>,
    pub user_responses: Vec<OptionLabel>,
}

impl ProgressionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_response(&mut self, answer: OptionLabel) {
        self.user_responses.push(answer);
    }

    /// Marks `topic` as completed. Returns `false` if it already was, so a
    /// repeated lesson never shows up twice.
    pub fn mark_completed(&mut self, topic: &str) -> bool {
        if self.completed_topics.iter().any(|t| t == topic) {
            return false;
        }
        self.completed_topics.push(topic.to_string());
        true
    }

    pub fn is_completed(&self, topic: &str) -> bool {
        self.completed_topics.iter().any(|t| t == topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut state = ProgressionState::new();
        assert!(state.mark_completed("Greetings"));
        assert!(!state.mark_completed("Greetings"));
        assert!(state.mark_completed("Numbers"));
        assert_eq!(state.completed_topics, vec!["Greetings", "Numbers"]);
        assert!(state.is_completed("Numbers"));
        assert!(!state.is_completed("numbers"));
    }

    #[test]
    fn test_state_survives_json_round_trip() {
        let mut state = ProgressionState::new();
        state.record_response(OptionLabel::B);
        state.record_response(OptionLabel::D);
        state.current_topic_index = 1;
        state.mark_completed("Script basics");

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"user_responses\":[\"b\",\"d\"]"));
        let restored: ProgressionState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
