use chat_logging::chat_trace;
use livechat_core::{ChatMessage, FetchOptions};

use crate::extract::extract_initial_data;
use crate::fetch::{site_url, PageFetcher};
use crate::parse::parse_chat_snapshot;
use crate::FetchError;

/// Anything that can produce the currently visible chat messages of a video.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_messages(
        &self,
        resource_id: &str,
        options: &FetchOptions,
    ) -> Result<Vec<ChatMessage>, FetchError>;
}

/// Scrapes the popout live chat page and parses its embedded `ytInitialData`.
///
/// Build one per listener and keep it: its HTTP client pools connections
/// across polls.
#[derive(Debug, Clone)]
pub struct ReqwestSnapshotFetcher {
    pages: PageFetcher,
}

impl ReqwestSnapshotFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        Ok(Self {
            pages: PageFetcher::new(options)?,
        })
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ReqwestSnapshotFetcher {
    async fn fetch_messages(
        &self,
        resource_id: &str,
        options: &FetchOptions,
    ) -> Result<Vec<ChatMessage>, FetchError> {
        let mut url = site_url(options, "live_chat")?;
        url.query_pairs_mut()
            .append_pair("is_popout", "1")
            .append_pair("v", resource_id)
            .append_pair("hl", &options.language);

        let html = self.pages.get(url, options).await?;
        let json = extract_initial_data(&html)?;
        let messages = parse_chat_snapshot(json)?;
        chat_trace!(
            "Fetched {} chat messages for {} ({} bytes of html)",
            messages.len(),
            resource_id,
            html.len()
        );
        Ok(messages)
    }
}
