//! Livechat engine: page fetching, chat parsing, live-video lookup and the
//! polling listener.
mod decode;
mod extract;
mod fetch;
mod listener;
mod parse;
mod registry;
mod resolve;
mod source;
mod types;

pub use decode::decode_body;
pub use extract::extract_initial_data;
pub use fetch::PageFetcher;
pub use listener::ChatListener;
pub use parse::{parse_chat_snapshot, RunParseError};
pub use registry::{ChatObserver, ErrorHandler, ObserverRegistry};
pub use resolve::{find_live_video_id, live_page_url, LiveResolver, ReqwestLiveResolver};
pub use source::{ReqwestSnapshotFetcher, SnapshotSource};
pub use types::{
    FailureCategory, FailureKind, FetchError, ListenerError, LiveLookup, ObserverError,
};
