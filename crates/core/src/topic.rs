use serde::{Deserialize, Serialize};

/// A named unit of curriculum content.
///
/// Models are inconsistent about how they write topics, so a bare string
/// is accepted as a topic with no subtopics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTopic")]
pub struct Topic {
    pub topic_name: String,
    pub subtopics: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTopic {
    Named(String),
    Full {
        #[serde(alias = "name")]
        topic_name: String,
        #[serde(default)]
        subtopics: Vec<String>,
    },
}

impl From<RawTopic> for Topic {
    fn from(raw: RawTopic) -> Self {
        match raw {
            RawTopic::Named(topic_name) => Topic::new(topic_name, Vec::new()),
            RawTopic::Full {
                topic_name,
                subtopics,
            } => Topic::new(topic_name, subtopics),
        }
    }
}

impl Topic {
    pub fn new(topic_name: impl Into<String>, subtopics: Vec<String>) -> Self {
        Self {
            topic_name: topic_name.into(),
            subtopics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_from_object() {
        let topic: Topic = serde_json::from_str(
            r#"{"topic_name": "Greetings", "subtopics": ["Namaste", "Formal address"]}"#,
        )
        .unwrap();
        assert_eq!(topic.topic_name, "Greetings");
        assert_eq!(topic.subtopics, vec!["Namaste", "Formal address"]);
    }

    #[test]
    fn test_topic_from_bare_string() {
        let topic: Topic = serde_json::from_str(r#""Numbers""#).unwrap();
        assert_eq!(topic, Topic::new("Numbers", vec![]));
    }

    #[test]
    fn test_topic_name_alias_and_missing_subtopics() {
        let topic: Topic = serde_json::from_str(r#"{"name": "Verbs"}"#).unwrap();
        assert_eq!(topic, Topic::new("Verbs", vec![]));
    }

    #[test]
    fn test_topic_rejects_non_string_subtopics() {
        let result: Result<Topic, _> =
            serde_json::from_str(r#"{"topic_name": "Verbs", "subtopics": [{"x": 1}]}"#);
        assert!(result.is_err());
    }
}
