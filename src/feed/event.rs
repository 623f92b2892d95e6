use crate::mirror::sync::NormalizedMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_SENDER: &str = "Unknown Sender";
pub const NON_TEXT_PLACEHOLDER: &str = "Received a non-text message (e.g., media, sticker)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl Sender {
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        let mut name = format!("{first} {last}").trim().to_string();
        if let Some(username) = self.username.as_deref().map(str::trim)
            && !username.is_empty()
        {
            if name.is_empty() {
                name = format!("@{username}");
            } else {
                name.push_str(&format!(" (@{username})"));
            }
        }
        if name.is_empty() {
            UNKNOWN_SENDER.to_string()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewMessage,
    MessageEdited,
}

/// One line of the inbound event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event: EventKind,
    pub id: i64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub sender: Option<Sender>,
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundEvent {
    pub fn normalize(&self) -> NormalizedMessage {
        let (sender_id, sender_display) = match &self.sender {
            Some(sender) => (sender.id, sender.display_name()),
            None => (0, UNKNOWN_SENDER.to_string()),
        };
        let text = match self.text.as_deref() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => NON_TEXT_PLACEHOLDER.to_string(),
        };
        NormalizedMessage {
            message_id: self.id,
            sender_id,
            sender_display,
            text,
            timestamp: self.date,
            edited_message_id: match self.event {
                EventKind::NewMessage => None,
                EventKind::MessageEdited => Some(self.id),
            },
        }
    }
}

/// Parses one feed line; blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<InboundEvent>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(first: Option<&str>, last: Option<&str>, username: Option<&str>) -> Sender {
        Sender {
            id: 42,
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            username: username.map(str::to_string),
        }
    }

    #[test]
    fn display_name_joins_and_trims() {
        assert_eq!(sender(Some("Ada"), Some("Lovelace"), None).display_name(), "Ada Lovelace");
        assert_eq!(sender(Some("Ada"), None, None).display_name(), "Ada");
        assert_eq!(
            sender(Some("Ada"), Some("Lovelace"), Some("ada")).display_name(),
            "Ada Lovelace (@ada)"
        );
        assert_eq!(sender(None, None, Some("ghost")).display_name(), "@ghost");
        assert_eq!(sender(None, Some(" "), None).display_name(), UNKNOWN_SENDER);
    }

    #[test]
    fn new_message_normalizes() {
        let line = r#"{"event":"new_message","id":17,"date":"2026-10-18T09:15:00Z","sender":{"id":42,"first_name":"Ada","last_name":"Lovelace","username":null},"text":"hello"}"#;
        let msg = parse_line(line).expect("parse").expect("event").normalize();
        assert_eq!(msg.message_id, 17);
        assert_eq!(msg.sender_id, 42);
        assert_eq!(msg.sender_display, "Ada Lovelace");
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.edited_message_id, None);
        assert_eq!(msg.timestamp.to_rfc3339(), "2026-10-18T09:15:00+00:00");
    }

    #[test]
    fn edit_without_sender_or_text_uses_fallbacks() {
        let line = r#"{"event":"message_edited","id":3,"date":"2026-10-18T09:15:00+02:00"}"#;
        let msg = parse_line(line).expect("parse").expect("event").normalize();
        assert_eq!(msg.edited_message_id, Some(3));
        assert_eq!(msg.sender_display, UNKNOWN_SENDER);
        assert_eq!(msg.text, NON_TEXT_PLACEHOLDER);
        assert_eq!(msg.timestamp.to_rfc3339(), "2026-10-18T07:15:00+00:00");
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert!(parse_line("   ").expect("blank").is_none());
        assert!(parse_line("{\"event\":\"deleted\",\"id\":1}").is_err());
        assert!(parse_line("not json").is_err());
    }
}
