use chat_logging::{chat_debug, chat_warn};
use livechat_core::FetchOptions;
use scraper::{Html, Selector};
use url::Url;

use crate::fetch::{site_url, PageFetcher};
use crate::{FailureKind, FetchError, LiveLookup};

/// Finds the video a channel is currently streaming.
#[async_trait::async_trait]
pub trait LiveResolver: Send + Sync {
    async fn resolve_live(&self, handle: &str) -> LiveLookup;
}

/// Fetches the channel's `/live` page and reads the video id out of it.
#[derive(Debug, Clone)]
pub struct ReqwestLiveResolver {
    options: FetchOptions,
    pages: PageFetcher,
}

impl ReqwestLiveResolver {
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let pages = PageFetcher::new(&options)?;
        Ok(Self { options, pages })
    }
}

#[async_trait::async_trait]
impl LiveResolver for ReqwestLiveResolver {
    async fn resolve_live(&self, handle: &str) -> LiveLookup {
        let url = match live_page_url(&self.options, handle) {
            Ok(url) => url,
            Err(err) => {
                chat_warn!("Cannot build live page url for {:?}: {}", handle, err);
                return LiveLookup::NotFound;
            }
        };

        let html = match self.pages.get(url, &self.options).await {
            Ok(html) => html,
            Err(err) => {
                chat_warn!("Live page fetch for {:?} failed: {}", handle, err);
                return LiveLookup::NotFound;
            }
        };

        let lookup = find_live_video_id(&html);
        chat_debug!("Live lookup for {:?} -> {:?}", handle, lookup);
        lookup
    }
}

/// Maps a handle (`@name`, `name`, a `UC…` channel id or a channel URL) to
/// the channel's `/live` page.
pub fn live_page_url(options: &FetchOptions, handle: &str) -> Result<Url, FetchError> {
    let handle = handle.trim();
    if handle.starts_with("http://") || handle.starts_with("https://") {
        let mut url = Url::parse(handle)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !url.path().trim_end_matches('/').ends_with("/live") {
            let path = format!("{}/live", url.path().trim_end_matches('/'));
            url.set_path(&path);
        }
        return Ok(url);
    }

    let name = handle.trim_start_matches('@');
    if name.is_empty() || name.contains(['/', '?', '#']) {
        return Err(FetchError::new(
            FailureKind::InvalidUrl,
            format!("not a channel handle: {handle:?}"),
        ));
    }
    if is_channel_id(name) {
        site_url(options, &format!("channel/{name}/live"))
    } else {
        site_url(options, &format!("@{name}/live"))
    }
}

/// Runs each extraction strategy against the page and keeps the first hit.
pub fn find_live_video_id(html: &str) -> LiveLookup {
    if html.contains("\"isReplay\":true") {
        return LiveLookup::NotFound;
    }

    let document = Html::parse_document(html);
    attribute_video_id(&document, "link[rel=\"canonical\"]", "href")
        .or_else(|| attribute_video_id(&document, "meta[property=\"og:url\"]", "content"))
        .or_else(|| embedded_live_video_id(html))
        .map_or(LiveLookup::NotFound, LiveLookup::Found)
}

fn attribute_video_id(document: &Html, selector: &str, attribute: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attribute))
        .find_map(watch_url_video_id)
}

fn watch_url_video_id(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    if url.path() != "/watch" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| is_video_id(id))
}

fn embedded_live_video_id(html: &str) -> Option<String> {
    const MARKER: &str = "\"videoDetails\":{\"videoId\":\"";
    if !html.contains("\"isLive\":true") {
        return None;
    }
    let start = html.find(MARKER)? + MARKER.len();
    let id = html[start..].split('"').next()?;
    is_video_id(id).then(|| id.to_string())
}

fn is_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_channel_id(name: &str) -> bool {
    name.len() == 24
        && name.starts_with("UC")
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
