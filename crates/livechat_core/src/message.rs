use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub label: String,
    /// Custom badge artwork. Built-in badges (owner, moderator, verified) have none.
    pub icon: Option<Thumbnail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    Owner,
    Moderator,
    Verified,
    Member,
}

/// One run of a chat message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text {
        text: String,
    },
    Emoji {
        url: String,
        alt: String,
        is_custom: bool,
        emoji_id: String,
    },
}

impl Segment {
    /// Plain-text rendering. Standard emoji render as their own character,
    /// custom emoji as their shortcut.
    pub fn as_text(&self) -> &str {
        match self {
            Segment::Text { text } => text,
            Segment::Emoji {
                alt,
                is_custom,
                emoji_id,
                ..
            } => {
                if *is_custom || emoji_id.is_empty() {
                    alt
                } else {
                    emoji_id
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub author: String,
    pub author_channel_id: String,
    pub author_photos: Vec<Thumbnail>,
    pub badges: Vec<Badge>,
    pub author_roles: Vec<AuthorRole>,
    pub timestamp: DateTime<Utc>,
    pub segments: Vec<Segment>,
    /// Formatted amount for paid messages, e.g. "$5.00".
    pub purchase_amount: Option<String>,
}

impl ChatMessage {
    /// Messages without text, author or id are never surfaced.
    pub fn is_well_formed(&self) -> bool {
        !self.text.is_empty() && !self.author.is_empty() && !self.id.is_empty()
    }

    pub fn has_role(&self, role: AuthorRole) -> bool {
        self.author_roles.contains(&role)
    }

    pub fn is_paid(&self) -> bool {
        self.purchase_amount.is_some()
    }
}

/// Converts a microsecond epoch value to a timestamp at millisecond precision.
pub fn timestamp_from_usec(usec: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(usec.div_euclid(1000))
}
