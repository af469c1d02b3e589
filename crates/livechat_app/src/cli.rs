use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use livechat_core::ListenerConfig;
use log::LevelFilter;

/// Follow a live stream's chat by scraping the popout chat page.
#[derive(Debug, Parser)]
#[command(name = "livechat", version)]
pub struct Args {
    /// Channel handle (`@name`), channel id or channel URL to look up.
    #[arg(long, conflicts_with = "video_id", required_unless_present = "video_id")]
    pub handle: Option<String>,

    /// Video id of a stream that is already known to be live.
    #[arg(long)]
    pub video_id: Option<String>,

    /// RON file with listener settings; flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub interval_ms: Option<u64>,

    #[arg(long)]
    pub max_interval_ms: Option<u64>,

    /// Back off while the chat is quiet.
    #[arg(long)]
    pub dynamic: bool,

    #[arg(long)]
    pub max_stored_ids: Option<usize>,

    /// Print one JSON object per message instead of a text line.
    #[arg(long)]
    pub json: bool,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Handle(String),
    Video(String),
}

impl Args {
    pub fn target(&self) -> Target {
        match (&self.video_id, &self.handle) {
            (Some(video_id), _) => Target::Video(video_id.clone()),
            (None, Some(handle)) => Target::Handle(handle.clone()),
            // clap enforces one of the two
            (None, None) => Target::Handle(String::new()),
        }
    }

    /// Applies command line overrides on top of file or default settings.
    pub fn apply(&self, mut config: ListenerConfig) -> ListenerConfig {
        if let Some(ms) = self.interval_ms {
            config.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.max_interval_ms {
            config.max_interval = Duration::from_millis(ms);
        }
        if self.dynamic {
            config.dynamic_polling = true;
        }
        if let Some(max) = self.max_stored_ids {
            config.max_stored_ids = max;
        }
        config.validated()
    }
}
