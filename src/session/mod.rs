mod memory;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;

pub use memory::InMemorySessionStore;

use crate::models::chat::{ ChatMessage, Session, SessionKey };

/// Volatile per-(user, conversation) chat history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &SessionKey) -> Option<Session>;

    /// Replaces the stored session wholesale and stamps the current time.
    async fn put(&self, key: &SessionKey, messages: Vec<ChatMessage>, language: Option<String>);

    /// Appends `messages` to the session, creating it (seeded with the system
    /// message) when absent. `language` replaces the stored value when set.
    /// Returns the session as stored.
    async fn append(
        &self,
        key: &SessionKey,
        messages: Vec<ChatMessage>,
        language: Option<String>
    ) -> Session;

    /// History to send upstream for the next turn: the stored messages, or a
    /// fresh seeded session when the key is unknown.
    async fn load_or_init(&self, key: &SessionKey) -> Session;
}

pub fn initialize_session_store(system_prompt: &str) -> Arc<dyn SessionStore> {
    info!("Conversation sessions are kept in process memory only");
    Arc::new(InMemorySessionStore::with_system_prompt(system_prompt))
}
