//! `ConversationMemory`: bounded, role-typed chat history (spec.md §4.3).
//!
//! Grounded in Send+Sync async-trait shape on `memory/traits.rs`'s `Memory`
//! trait, but with the contract spec.md actually specifies
//! (`history(session_id, max_messages, include_system)`) rather than the
//! teacher's key/recall-by-relevance semantics, which do not fit a
//! role-typed chronological transcript.

use diesel::prelude::*;

use crate::db::{models, schema, DbPool};
use crate::llm::types::ChatMessage;

pub struct ConversationMemory {
    pool: DbPool,
}

impl ConversationMemory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetches the most recent `max_messages` messages for `session_id`,
    /// in chronological order, typed by role. On any storage error returns
    /// an empty history: memory loss degrades but never blocks a request
    /// (spec.md §4.3).
    pub fn history(&self, session_id: &str, max_messages: i64, include_system: bool) -> Vec<ChatMessage> {
        let Ok(mut conn) = self.pool.get() else {
            tracing::warn!(session_id, "failed to acquire db connection for history load");
            return Vec::new();
        };

        let mut query = schema::messages::table
            .filter(schema::messages::session_id.eq(session_id))
            .into_boxed();
        if !include_system {
            query = query.filter(schema::messages::role.ne("system"));
        }

        let result = query
            .order(schema::messages::created_at.desc())
            .limit(max_messages)
            .select(models::Message::as_select())
            .load::<models::Message>(&mut conn);

        let Ok(mut rows) = result else {
            tracing::warn!(session_id, "failed to load message history");
            return Vec::new();
        };

        rows.reverse(); // most-recent-first -> chronological

        rows.into_iter()
            .map(|m| match m.role.as_str() {
                "assistant" => ChatMessage::assistant(m.text),
                "system" => ChatMessage::system(m.text),
                _ => ChatMessage::user(m.text),
            })
            .collect()
    }
}
