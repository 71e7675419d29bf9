use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque user identifier, assigned by the server at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Opaque message identifier, assigned by the server at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// A message posted to the board.
///
/// `sender_name` is copied from the sender when the message is created and is
/// never looked up again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender_id: UserId,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub edited: bool,
    /// Present only once `edited` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn is_sent_by(&self, user_id: &UserId) -> bool {
        &self.sender_id == user_id
    }
}

/// The full data set held by the server of record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotFormatError {
    #[error("No file uploaded.")]
    Empty,

    #[error("Invalid JSON file: {0}")]
    InvalidJson(String),

    #[error("Invalid data format. Must contain users and messages arrays.")]
    MissingCollections,

    #[error("Invalid data format: {0}")]
    InvalidRecords(String),
}

impl Snapshot {
    /// Parse an uploaded export. Both the `users` and `messages` arrays must be present.
    pub fn parse(raw: &[u8]) -> Result<Self, SnapshotFormatError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(SnapshotFormatError::Empty);
        }

        let value: serde_json::Value = serde_json::from_slice(raw)
            .map_err(|e| SnapshotFormatError::InvalidJson(e.to_string()))?;

        let has_array = |key: &str| value.get(key).is_some_and(serde_json::Value::is_array);
        if !has_array("users") || !has_array("messages") {
            return Err(SnapshotFormatError::MissingCollections);
        }

        serde_json::from_value(value).map_err(|e| SnapshotFormatError::InvalidRecords(e.to_string()))
    }
}

/// Stable sort by creation instant; ties keep their insertion order.
pub fn sort_by_timestamp(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(id: &str, secs: i64) -> Message {
        Message {
            id: MessageId::from(id),
            text: format!("text {id}"),
            sender_id: UserId::from("u1"),
            sender_name: "me".into(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            edited: false,
            edited_at: None,
        }
    }

    #[test]
    fn sort_is_ascending_and_stable() {
        let mut messages = vec![
            message("c", 30),
            message("a", 10),
            message("b1", 20),
            message("b2", 20),
        ];
        sort_by_timestamp(&mut messages);

        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b1", "b2", "c"]);
    }

    #[test]
    fn message_wire_format_is_camel_case() {
        let json = serde_json::to_value(message("m1", 0)).unwrap();
        assert_eq!(json["senderId"], "u1");
        assert_eq!(json["senderName"], "me");
        assert_eq!(json["edited"], false);
        assert!(json.get("editedAt").is_none());
    }

    #[test]
    fn missing_edited_flag_defaults_to_false() {
        let json = r#"{
            "id": "m1",
            "text": "hi",
            "senderId": "u1",
            "senderName": "me",
            "timestamp": "2024-05-01T12:00:00.000Z"
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(!message.edited);
        assert!(message.edited_at.is_none());
    }

    #[test]
    fn parse_requires_both_collections() {
        assert_eq!(Snapshot::parse(b"  \n"), Err(SnapshotFormatError::Empty));
        assert!(matches!(
            Snapshot::parse(b"{not json"),
            Err(SnapshotFormatError::InvalidJson(_))
        ));
        assert_eq!(
            Snapshot::parse(br#"{"users": []}"#),
            Err(SnapshotFormatError::MissingCollections)
        );
        assert_eq!(
            Snapshot::parse(br#"{"users": [], "messages": {}}"#),
            Err(SnapshotFormatError::MissingCollections)
        );
        assert!(matches!(
            Snapshot::parse(br#"{"users": [{"id": "u1"}], "messages": []}"#),
            Err(SnapshotFormatError::InvalidRecords(_))
        ));

        let parsed = Snapshot::parse(br#"{"users": [{"id": "u1", "name": "me"}], "messages": []}"#)
            .unwrap();
        assert_eq!(parsed.users[0].name, "me");
    }
}
