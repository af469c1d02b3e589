use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn category(&self) -> FailureCategory {
        self.kind.category()
    }
}

/// Whether a failure happened while talking to the site or while reading
/// what it sent back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Transport,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    MissingInitialData,
    MalformedJson,
    UnexpectedShape,
}

impl FailureKind {
    pub fn category(&self) -> FailureCategory {
        match self {
            FailureKind::InvalidUrl
            | FailureKind::HttpStatus(_)
            | FailureKind::Timeout
            | FailureKind::Network
            | FailureKind::TooLarge { .. } => FailureCategory::Transport,
            FailureKind::Decode
            | FailureKind::MissingInitialData
            | FailureKind::MalformedJson
            | FailureKind::UnexpectedShape => FailureCategory::Parse,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "undecodable body"),
            FailureKind::MissingInitialData => write!(f, "initial data not found"),
            FailureKind::MalformedJson => write!(f, "malformed json"),
            FailureKind::UnexpectedShape => write!(f, "unexpected json shape"),
        }
    }
}

/// Result of looking up a channel's current live video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveLookup {
    Found(String),
    NotFound,
}

impl LiveLookup {
    pub fn video_id(&self) -> Option<&str> {
        match self {
            LiveLookup::Found(id) => Some(id),
            LiveLookup::NotFound => None,
        }
    }
}

/// Failure raised by an observer while handling a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ObserverError(String);

impl ObserverError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Non-fatal problems reported by a running listener.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListenerError {
    #[error("snapshot fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("observer failed on message {message_id}: {reason}")]
    Observer { message_id: String, reason: String },
}
