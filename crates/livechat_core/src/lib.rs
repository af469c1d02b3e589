//! Livechat core: message types and the pure dedup/pacing state of a listener.
mod config;
mod message;
mod pacing;
mod seen;
mod state;

pub use config::{FetchOptions, ListenerConfig};
pub use message::{
    timestamp_from_usec, AuthorRole, Badge, ChatMessage, Segment, Thumbnail,
};
pub use pacing::Pacer;
pub use seen::SeenIds;
pub use state::PollState;
