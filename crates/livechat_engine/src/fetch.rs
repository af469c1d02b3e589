use futures_util::StreamExt;
use livechat_core::FetchOptions;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use url::Url;

use crate::decode::decode_body;
use crate::{FailureKind, FetchError};

/// GET of an HTML page, shared by the chat fetcher and the resolver.
///
/// Holds one pooled client, so repeated polls reuse connections. The connect
/// timeout is fixed when the fetcher is built; everything else is read from
/// the options passed to each request.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client })
    }

    /// Downloads `url` and returns the decoded body.
    pub async fn get(&self, url: Url, options: &FetchOptions) -> Result<String, FetchError> {
        let mut request = self
            .client
            .get(url.clone())
            .timeout(options.request_timeout)
            .header(USER_AGENT, options.user_agent.as_str())
            .header(ACCEPT_LANGUAGE, options.language.as_str());
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("{status} for {url}"),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > options.max_bytes {
                return Err(too_large(options.max_bytes, content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > options.max_bytes {
                return Err(too_large(options.max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        decode_body(&bytes, content_type.as_deref())
    }
}

/// Joins `path` onto the configured base URL, keeping any base path prefix.
pub(crate) fn site_url(options: &FetchOptions, path: &str) -> Result<Url, FetchError> {
    let raw = format!(
        "{}/{}",
        options.base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&raw).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::site_url;
    use crate::FailureKind;
    use livechat_core::FetchOptions;

    #[test]
    fn site_url_keeps_base_prefix() {
        let options = FetchOptions {
            base_url: "http://127.0.0.1:9000/mirror/".into(),
            ..FetchOptions::default()
        };
        let url = site_url(&options, "/live_chat").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/mirror/live_chat");
    }

    #[test]
    fn site_url_rejects_garbage_base() {
        let options = FetchOptions {
            base_url: "not a url".into(),
            ..FetchOptions::default()
        };
        let err = site_url(&options, "live_chat").unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }
}
