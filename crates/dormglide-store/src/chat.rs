//! Conversations and messages kept on this device.
//!
//! Conversations are unique per (sorted participant pair, product). Messages
//! are append-only; read order is enforced here rather than trusted from
//! insertion order.

use chrono::{DateTime, Utc};
use dormglide_shared::constants::{KEY_CHAT_CONVERSATIONS, KEY_CHAT_MESSAGES};
use dormglide_shared::{sort_messages, sorted_pair, Conversation, Message};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::ids::generate_local_id;

impl Database {
    fn conversations(&self) -> Result<Vec<Conversation>> {
        self.read_json_or_default(KEY_CHAT_CONVERSATIONS)
    }

    fn messages(&self) -> Result<Vec<Message>> {
        self.read_json_or_default(KEY_CHAT_MESSAGES)
    }

    /// Return the conversation between `a` and `b` about `product_id`,
    /// creating it if needed. Argument order does not matter.
    pub fn get_or_create_conversation(
        &self,
        product_id: Option<&str>,
        a: &str,
        b: &str,
    ) -> Result<Conversation> {
        let pair = sorted_pair(a, b);
        let mut conversations = self.conversations()?;

        if let Some(existing) = conversations.iter().find(|c| c.matches(&pair, product_id)) {
            return Ok(existing.clone());
        }

        let conversation = Conversation {
            id: generate_local_id(),
            product_id: product_id.map(str::to_string),
            participant_a: pair.0,
            participant_b: pair.1,
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
        };
        conversations.push(conversation.clone());
        self.write_json(KEY_CHAT_CONVERSATIONS, &conversations)?;

        tracing::debug!(conversation_id = %conversation.id, "created local conversation");
        Ok(conversation)
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations()?.into_iter().find(|c| c.id == id))
    }

    /// Conversations `user_id` takes part in, most recent activity first.
    pub fn conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let mut list: Vec<_> = self
            .conversations()?
            .into_iter()
            .filter(|c| c.involves(user_id))
            .collect();
        list.sort_by_key(|c| std::cmp::Reverse(c.activity_at()));
        Ok(list)
    }

    /// Messages of one conversation, createdAt ascending.
    pub fn messages_for_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let mut list: Vec<_> = self
            .messages()?
            .into_iter()
            .filter(|m| m.conversation_id == conversation_id)
            .collect();
        sort_messages(&mut list);
        Ok(list)
    }

    /// Append a message and bump the conversation's last-message fields.
    pub fn append_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        product_id: Option<&str>,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Message> {
        let mut conversations = self.conversations()?;
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or(StoreError::NotFound)?;

        let message = Message {
            id: generate_local_id(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            body: body.to_string(),
            product_id: product_id.map(str::to_string),
            created_at,
        };

        let mut messages = self.messages()?;
        messages.push(message.clone());
        self.write_json(KEY_CHAT_MESSAGES, &messages)?;

        conversation.last_message = Some(body.to_string());
        conversation.last_message_at = Some(created_at);
        self.write_json(KEY_CHAT_CONVERSATIONS, &conversations)?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn conversation_is_unique_per_pair_and_product() {
        let db = Database::open_in_memory().unwrap();
        let first = db.get_or_create_conversation(Some("p1"), "alice", "bob").unwrap();
        let second = db.get_or_create_conversation(Some("p1"), "bob", "alice").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.participant_a, "alice");

        let other_product = db.get_or_create_conversation(Some("p2"), "alice", "bob").unwrap();
        assert_ne!(first.id, other_product.id);

        let no_product = db.get_or_create_conversation(None, "bob", "alice").unwrap();
        assert_ne!(first.id, no_product.id);
        assert_eq!(
            db.get_or_create_conversation(None, "alice", "bob").unwrap().id,
            no_product.id
        );
    }

    #[test]
    fn messages_come_back_in_chronological_order() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.get_or_create_conversation(None, "u1", "u2").unwrap();
        for secs in [30, 10, 20] {
            db.append_message(&conv.id, "u1", "u2", None, &format!("m{secs}"), ts(secs))
                .unwrap();
        }
        let bodies: Vec<_> = db
            .messages_for_conversation(&conv.id)
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, ["m10", "m20", "m30"]);
    }

    #[test]
    fn append_updates_conversation_metadata() {
        let db = Database::open_in_memory().unwrap();
        let conv = db.get_or_create_conversation(None, "u1", "u2").unwrap();
        db.append_message(&conv.id, "u1", "u2", None, "hello", ts(5)).unwrap();
        let stored = db.get_conversation(&conv.id).unwrap().unwrap();
        assert_eq!(stored.last_message.as_deref(), Some("hello"));
        assert_eq!(stored.last_message_at, Some(ts(5)));
    }

    #[test]
    fn append_to_unknown_conversation_fails() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .append_message("missing", "u1", "u2", None, "hi", ts(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn conversations_for_user_sorted_by_activity() {
        let db = Database::open_in_memory().unwrap();
        let quiet = db.get_or_create_conversation(None, "u1", "u2").unwrap();
        let busy = db.get_or_create_conversation(None, "u1", "u3").unwrap();
        db.get_or_create_conversation(None, "u4", "u5").unwrap();

        db.append_message(&quiet.id, "u1", "u2", None, "old", ts(1)).unwrap();
        db.append_message(&busy.id, "u3", "u1", None, "new", Utc::now()).unwrap();

        let list = db.conversations_for_user("u1").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, busy.id);
    }
}
