use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::SessionStore;
use crate::models::chat::{ ChatMessage, Session, SessionKey, DEFAULT_SYSTEM_PROMPT };

pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionKey, Session>>,
    system_prompt: String,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_system_prompt(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn with_system_prompt(system_prompt: &str) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            system_prompt: system_prompt.to_string(),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.lock().await.get(key).cloned()
    }

    async fn put(&self, key: &SessionKey, messages: Vec<ChatMessage>, language: Option<String>) {
        let session = Session {
            messages,
            language,
            updated_at: Utc::now(),
        };
        self.sessions.lock().await.insert(key.clone(), session);
    }

    async fn append(
        &self,
        key: &SessionKey,
        messages: Vec<ChatMessage>,
        language: Option<String>
    ) -> Session {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(key.clone())
            .or_insert_with(|| Session::with_system_prompt(&self.system_prompt));
        session.messages.extend(messages);
        if language.is_some() {
            session.language = language;
        }
        session.updated_at = Utc::now();
        debug!("Session {} now holds {} messages", key, session.messages.len());
        session.clone()
    }

    async fn load_or_init(&self, key: &SessionKey) -> Session {
        match self.get(key).await {
            Some(session) => session,
            None => Session::with_system_prompt(&self.system_prompt),
        }
    }
}
