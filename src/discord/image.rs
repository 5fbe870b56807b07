//! Image inputs for guild icons and splashes.
//!
//! Discord only accepts image data inline as a base64 data URI, so remote
//! URLs are downloaded and re-encoded before they are sent.

use crate::discord::error::{DiscordError, DiscordResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

static DATA_URI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:image/(png|jpeg|jpg|gif|webp);base64,[A-Za-z0-9+/]+=*$")
        .expect("Invalid data URI regex")
});

#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Resolve an image URL into a `data:` URI.
    async fn load(&self, url: &str) -> DiscordResult<String>;
}

pub struct RemoteImageLoader {
    client: Client,
}

impl RemoteImageLoader {
    pub fn new(timeout: Duration) -> DiscordResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl ImageLoader for RemoteImageLoader {
    async fn load(&self, url: &str) -> DiscordResult<String> {
        debug!("Fetching image from {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscordError::Image {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"));
        let mime = header_mime.unwrap_or_else(|| mime_from_url(url).to_string());

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(DiscordError::Image {
                url: url.to_string(),
                reason: "empty response body".to_string(),
            });
        }

        Ok(to_data_uri(&mime, &bytes))
    }
}

pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

pub fn is_data_uri(value: &str) -> bool {
    DATA_URI_REGEX.is_match(value)
}

/// Guess the MIME type from the URL path, defaulting to PNG.
pub fn mime_from_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn loader() -> RemoteImageLoader {
        RemoteImageLoader::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_to_data_uri() {
        let uri = to_data_uri("image/png", b"\x89PNG");
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
        assert!(is_data_uri(&uri));
    }

    #[test]
    fn test_is_data_uri_rejects_other_inputs() {
        assert!(!is_data_uri("https://example.com/icon.png"));
        assert!(!is_data_uri("data:text/plain;base64,aGVsbG8="));
        assert!(!is_data_uri("data:image/png;base64,"));
    }

    #[test]
    fn test_mime_from_url() {
        assert_eq!(mime_from_url("https://cdn.example.com/a.JPG?size=128"), "image/jpeg");
        assert_eq!(mime_from_url("https://cdn.example.com/a.gif"), "image/gif");
        assert_eq!(mime_from_url("https://cdn.example.com/icon"), "image/png");
    }

    #[tokio::test]
    async fn test_load_uses_content_type() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/icon"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/gif; charset=binary")
                    .set_body_bytes(b"GIF89a".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let uri = loader()
            .load(&format!("{}/icon", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(uri, to_data_uri("image/gif", b"GIF89a"));
        assert!(is_data_uri(&uri));
    }

    #[tokio::test]
    async fn test_load_falls_back_to_extension() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/splash.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/octet-stream")
                    .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
            )
            .mount(&mock_server)
            .await;

        let uri = loader()
            .load(&format!("{}/splash.jpg", mock_server.uri()))
            .await
            .unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"), "{uri}");
    }

    #[tokio::test]
    async fn test_load_rejects_empty_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty.png"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let err = loader()
            .load(&format!("{}/empty.png", mock_server.uri()))
            .await
            .unwrap_err();
        match err {
            DiscordError::Image { reason, .. } => assert_eq!(reason, "empty response body"),
            other => panic!("Expected Image error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_rejects_http_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = format!("{}/missing.png", mock_server.uri());
        let err = loader().load(&url).await.unwrap_err();
        match err {
            DiscordError::Image { url: failed, reason } => {
                assert_eq!(failed, url);
                assert!(reason.contains("404"), "{reason}");
            }
            other => panic!("Expected Image error, got {other:?}"),
        }
    }
}
