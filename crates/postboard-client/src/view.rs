//! Pure derivations over store state: the search-filtered board, default
//! sender selection, and clock-time rendering.

use chrono::{DateTime, TimeZone, Utc};

use postboard_types::{Message, User, UserId};

/// Name preferred as the default sender when no previous selection survives.
pub const DEFAULT_SENDER_NAME: &str = "me";

/// Messages whose text or sender name contains `query`, ignoring case.
/// An empty query keeps everything.
pub fn filter_messages(messages: &[Message], query: &str) -> Vec<Message> {
    if query.is_empty() {
        return messages.to_vec();
    }

    let needle = query.to_lowercase();
    messages
        .iter()
        .filter(|m| {
            m.text.to_lowercase().contains(&needle) || m.sender_name.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Pick the sender after a (re)load: the previous selection if it still
/// exists, else the user named "me", else the first user, else nobody.
pub fn select_current_user(users: &[User], previous: Option<&UserId>) -> Option<UserId> {
    previous
        .and_then(|id| users.iter().find(|u| &u.id == id))
        .or_else(|| users.iter().find(|u| u.name == DEFAULT_SENDER_NAME))
        .or_else(|| users.first())
        .map(|u| u.id.clone())
}

/// Short clock time such as `3:04 PM`, in the given zone.
pub fn format_time<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.with_timezone(tz).format("%-I:%M %p").to_string()
}

/// [`format_time`] in the machine's local zone.
pub fn format_local_time(instant: &DateTime<Utc>) -> String {
    format_time(instant, &chrono::Local)
}
