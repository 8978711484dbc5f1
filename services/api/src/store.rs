//! Session Storage
//!
//! Each learner's progress lives in a `SessionRecord` keyed by session id.
//! Records hold only serializable engine state (the quiz, its result and a
//! `ProgressionSnapshot`); live engine objects are rebuilt per request and
//! the updated record is written back when the request finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::info;
use tutor_core::{ProgressionSnapshot, QuizResult, QuizSession};
use uuid::Uuid;

/// Everything the web surface remembers about one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub quiz: QuizSession,
    pub result: Option<QuizResult>,
    pub lessons: Option<ProgressionSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(quiz: QuizSession) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            quiz,
            result: None,
            lessons: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An in-memory session store. Records are isolated per learner; nothing
/// is shared between sessions.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionRecord>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: SessionRecord) -> Uuid {
        let id = record.id;
        self.sessions.write().await.insert(id, record);
        id
    }

    /// Returns a copy of the record; changes must be written back with `save`.
    pub async fn get(&self, id: Uuid) -> Option<SessionRecord> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn save(&self, mut record: SessionRecord) {
        record.updated_at = Utc::now();
        self.sessions.write().await.insert(record.id, record);
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every record not updated within `ttl`. Returns how many went.
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::TimeDelta::from_std(ttl) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.updated_at > cutoff);
        before - sessions.len()
    }

    /// Sweeps expired sessions every `every` until the runtime shuts down.
    pub fn spawn_expiry(&self, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = store.purge_expired(ttl).await;
                if removed > 0 {
                    info!(removed, "Expired idle sessions");
                }
            }
        })
    }
}
