use chat_logging::chat_debug;
use livechat_core::{
    timestamp_from_usec, AuthorRole, Badge, ChatMessage, Segment, Thumbnail,
};
use serde_json::Value;

use crate::{FailureKind, FetchError};

/// Why a single chat item was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunParseError {
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("unrecognized message run {0}")]
    UnknownRun(String),
    #[error("emoji {0} has no image")]
    EmojiWithoutImage(String),
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(String),
}

/// Parses the embedded `ytInitialData` JSON of a live chat page.
///
/// Individual items that cannot be parsed, or that lack text, author or id,
/// are dropped; only a document without a chat renderer is an error.
pub fn parse_chat_snapshot(json: &str) -> Result<Vec<ChatMessage>, FetchError> {
    let root: Value = serde_json::from_str(json)
        .map_err(|err| FetchError::new(FailureKind::MalformedJson, err.to_string()))?;

    let renderer = root
        .pointer("/contents/liveChatRenderer")
        .ok_or_else(|| {
            FetchError::new(
                FailureKind::UnexpectedShape,
                "contents.liveChatRenderer is missing",
            )
        })?;

    let Some(actions) = renderer.get("actions").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let messages = actions
        .iter()
        .filter_map(|action| action.pointer("/addChatItemAction/item"))
        .filter_map(chat_item_renderer)
        .filter_map(|(renderer, paid)| match parse_message(renderer, paid) {
            Ok(message) if message.is_well_formed() => Some(message),
            Ok(message) => {
                chat_debug!("Dropping incomplete chat item id={:?}", message.id);
                None
            }
            Err(err) => {
                chat_debug!("Dropping unparsable chat item: {}", err);
                None
            }
        })
        .collect();
    Ok(messages)
}

fn chat_item_renderer(item: &Value) -> Option<(&Value, bool)> {
    if let Some(renderer) = item.get("liveChatTextMessageRenderer") {
        return Some((renderer, false));
    }
    item.get("liveChatPaidMessageRenderer")
        .map(|renderer| (renderer, true))
}

fn parse_message(renderer: &Value, paid: bool) -> Result<ChatMessage, RunParseError> {
    let id = str_at(renderer, "/id").ok_or(RunParseError::MissingField("id"))?;
    let author = str_at(renderer, "/authorName/simpleText").unwrap_or_default();
    let author_channel_id = str_at(renderer, "/authorExternalChannelId").unwrap_or_default();

    let segments = match renderer.pointer("/message/runs").and_then(Value::as_array) {
        Some(runs) => runs.iter().map(parse_run).collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    let text = segments.iter().map(Segment::as_text).collect::<String>();

    let author_photos = renderer
        .pointer("/authorPhoto/thumbnails")
        .map(parse_thumbnails)
        .unwrap_or_default();

    let (badges, author_roles) = parse_badges(renderer.get("authorBadges"));

    let timestamp = parse_timestamp(renderer.get("timestampUsec"))?;

    let purchase_amount = if paid {
        str_at(renderer, "/purchaseAmountText/simpleText")
    } else {
        None
    };

    Ok(ChatMessage {
        id,
        text,
        author,
        author_channel_id,
        author_photos,
        badges,
        author_roles,
        timestamp,
        segments,
        purchase_amount,
    })
}

fn parse_run(run: &Value) -> Result<Segment, RunParseError> {
    if let Some(text) = run.get("text").and_then(Value::as_str) {
        return Ok(Segment::Text {
            text: text.to_string(),
        });
    }

    let Some(emoji) = run.get("emoji") else {
        return Err(RunParseError::UnknownRun(run.to_string()));
    };

    let emoji_id = str_at(emoji, "/emojiId").unwrap_or_default();
    let url = emoji
        .pointer("/image/thumbnails")
        .map(parse_thumbnails)
        .and_then(|thumbnails| thumbnails.into_iter().next())
        .map(|thumbnail| thumbnail.url)
        .ok_or_else(|| RunParseError::EmojiWithoutImage(emoji_id.clone()))?;
    let alt = str_at(emoji, "/shortcuts/0")
        .or_else(|| str_at(emoji, "/image/accessibility/accessibilityData/label"))
        .unwrap_or_else(|| emoji_id.clone());
    let is_custom = emoji
        .get("isCustomEmoji")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(Segment::Emoji {
        url,
        alt,
        is_custom,
        emoji_id,
    })
}

fn parse_thumbnails(value: &Value) -> Vec<Thumbnail> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let url = item.get("url").and_then(Value::as_str)?;
                    Some(Thumbnail {
                        url: url.to_string(),
                        width: dimension(item.get("width")),
                        height: dimension(item.get("height")),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn dimension(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

fn parse_badges(value: Option<&Value>) -> (Vec<Badge>, Vec<AuthorRole>) {
    let mut badges = Vec::new();
    let mut roles = Vec::new();

    let renderers = value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|badge| badge.get("liveChatAuthorBadgeRenderer"));

    for renderer in renderers {
        let icon = renderer
            .pointer("/customThumbnail/thumbnails")
            .map(parse_thumbnails)
            .and_then(|thumbnails| thumbnails.into_iter().next());

        let role = match renderer.pointer("/icon/iconType").and_then(Value::as_str) {
            Some("OWNER") => Some(AuthorRole::Owner),
            Some("MODERATOR") => Some(AuthorRole::Moderator),
            Some("VERIFIED") => Some(AuthorRole::Verified),
            _ if icon.is_some() => Some(AuthorRole::Member),
            _ => None,
        };
        if let Some(role) = role.filter(|role| !roles.contains(role)) {
            roles.push(role);
        }

        badges.push(Badge {
            label: str_at(renderer, "/tooltip").unwrap_or_default(),
            icon,
        });
    }

    (badges, roles)
}

fn parse_timestamp(
    value: Option<&Value>,
) -> Result<chrono::DateTime<chrono::Utc>, RunParseError> {
    let value = value.ok_or(RunParseError::MissingField("timestampUsec"))?;
    let usec = match value {
        Value::String(raw) => raw.parse::<i64>().ok(),
        other => other.as_i64(),
    };
    usec.and_then(timestamp_from_usec)
        .ok_or_else(|| RunParseError::InvalidTimestamp(value.to_string()))
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}
