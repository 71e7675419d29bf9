use anyhow::Result;
use chrono::Utc;
use postboard_types::models::sort_by_timestamp;
use postboard_types::{Message, MessageId, Snapshot, User, UserId};

use crate::Database;

impl Database {
    // -- Users --

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_data(|data| data.users.clone())
    }

    /// Returns `None` when another user already has this name (case-insensitive).
    pub fn create_user(&self, name: &str) -> Result<Option<User>> {
        self.with_data_mut(|data| {
            let lowered = name.to_lowercase();
            if data.users.iter().any(|u| u.name.to_lowercase() == lowered) {
                return None;
            }

            let user = User {
                id: UserId::generate(),
                name: name.to_string(),
            };
            data.users.push(user.clone());
            Some(user)
        })
    }

    // -- Messages --

    /// All messages, oldest first.
    pub fn list_messages(&self) -> Result<Vec<Message>> {
        self.with_data(|data| {
            let mut messages = data.messages.clone();
            sort_by_timestamp(&mut messages);
            messages
        })
    }

    /// Returns `None` when `sender_id` does not name a known user.
    pub fn insert_message(&self, text: &str, sender_id: &UserId) -> Result<Option<Message>> {
        self.with_data_mut(|data| {
            let sender = data.users.iter().find(|u| &u.id == sender_id)?;

            let message = Message {
                id: MessageId::generate(),
                text: text.to_string(),
                sender_id: sender.id.clone(),
                sender_name: sender.name.clone(),
                timestamp: Utc::now(),
                edited: false,
                edited_at: None,
            };
            data.messages.push(message.clone());
            Some(message)
        })
    }

    pub fn update_message(&self, id: &MessageId, text: &str) -> Result<Option<Message>> {
        self.with_data_mut(|data| {
            let message = data.messages.iter_mut().find(|m| &m.id == id)?;
            message.text = text.to_string();
            message.edited = true;
            message.edited_at = Some(Utc::now());
            Some(message.clone())
        })
    }

    /// Returns false when no message has this id.
    pub fn delete_message(&self, id: &MessageId) -> Result<bool> {
        self.with_data_mut(|data| {
            let before = data.messages.len();
            data.messages.retain(|m| &m.id != id);
            data.messages.len() != before
        })
    }

    // -- Snapshot --

    pub fn snapshot(&self) -> Result<Snapshot> {
        self.with_data(|data| data.clone())
    }

    /// Replace the entire data set.
    pub fn replace_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.with_data_mut(|data| *data = snapshot)
    }
}
