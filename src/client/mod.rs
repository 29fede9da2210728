//! Confluence REST client.
//!
//! A blocking [`Source`] over the Confluence REST API (v1). Failed requests
//! are retried with exponential backoff according to [`RetryConfig`]; a 404
//! is reported as not-found, everything else that fails for good as a
//! transport error.

mod api;

use crate::config::{AuthConfig, ExportConfig, RetryConfig};
use crate::error::{Error, FetchError, Result};
use crate::model::{Attachment, Document, Space};
use crate::source::{FetchResult, Source};
use api::{AttachmentJson, ContentJson, IdOnly, Paged, SpaceJson};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

const PAGE_SIZE: usize = 50;
const TIMEOUT: Duration = Duration::from_secs(60);
const CONTENT_EXPAND: &str = "body.view,body.export_view,metadata.labels,ancestors,space";

/// REST client for one Confluence instance.
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    http: Client,
    base_url: String,
    auth: AuthConfig,
    retry: RetryConfig,
}

impl ConfluenceClient {
    /// Create a client. The connection must carry a URL and credentials.
    pub fn new(auth: AuthConfig) -> Result<Self> {
        if !auth.is_configured() {
            return Err(Error::Config(
                "Confluence URL and credentials (username + API token, or PAT) are required"
                    .to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(TIMEOUT)
            .user_agent(concat!("confluence-markdown/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: auth.url.trim().trim_end_matches('/').to_string(),
            auth,
            retry: RetryConfig::default(),
        })
    }

    /// Create a client from the connection and retry settings of a configuration.
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        Ok(Self::new(config.auth.clone())?.with_retry(config.retry.clone()))
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Verify URL and credentials with a minimal request.
    pub fn check_connection(&self) -> Result<()> {
        self.get_json::<Paged<serde_json::Value>>("/rest/api/space?limit=1", "space", "*")
            .map(|_| ())
            .map_err(|e| Error::Transport(format!("Confluence connection failed: {}", e)))
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn send(&self, path: &str, kind: &'static str, id: &str) -> FetchResult<Response> {
        let url = self.url(path);
        let mut attempt = 0;
        loop {
            let mut request = self.http.get(&url);
            request = if self.auth.uses_pat() {
                request.bearer_auth(&self.auth.pat)
            } else {
                request.basic_auth(&self.auth.username, Some(&self.auth.api_token))
            };

            let failure = match request.send() {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    return Err(FetchError::not_found(kind, id));
                }
                Ok(response) => {
                    let status = response.status();
                    if !self.retry.should_retry(status.as_u16()) {
                        return Err(FetchError::Transport(format!("GET {}: HTTP {}", url, status)));
                    }
                    format!("HTTP {}", status)
                }
                Err(e) if self.retry.enabled && (e.is_timeout() || e.is_connect()) => e.to_string(),
                Err(e) => return Err(FetchError::Transport(format!("GET {}: {}", url, e))),
            };

            if attempt >= self.retry.max_retries {
                return Err(FetchError::Transport(format!(
                    "GET {}: {} after {} retries",
                    url, failure, attempt
                )));
            }
            let delay = self.retry.delay(attempt);
            log::warn!("GET {} failed ({}), retrying in {:?}", url, failure, delay);
            std::thread::sleep(delay);
            attempt += 1;
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, kind: &'static str, id: &str) -> FetchResult<T> {
        log::trace!("GET {}", path);
        self.send(path, kind, id)?
            .json()
            .map_err(|e| FetchError::Transport(format!("invalid response for {} `{}`: {}", kind, id, e)))
    }

    /// Collect every result of a paginated listing.
    fn paged<T: DeserializeOwned>(&self, path: &str, kind: &'static str, id: &str) -> FetchResult<Vec<T>> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut results = Vec::new();
        let mut start = 0;
        loop {
            let page: Paged<T> = self.get_json(
                &format!("{}{}start={}&limit={}", path, separator, start, PAGE_SIZE),
                kind,
                id,
            )?;
            let size = page.results.len();
            results.extend(page.results);
            if size < PAGE_SIZE || page.links.next.is_none() {
                break;
            }
            start += size;
        }
        Ok(results)
    }

    /// Pages at the root of a space, for spaces without a homepage.
    fn root_pages(&self, key: &str) -> FetchResult<Vec<String>> {
        let pages: Vec<IdOnly> =
            self.paged(&format!("/rest/api/space/{}/content/page?depth=root", key), "space", key)?;
        Ok(pages.into_iter().map(|p| p.id).collect())
    }

    fn space_from_json(&self, json: SpaceJson) -> FetchResult<Space> {
        if json.has_homepage() {
            return Ok(json.into());
        }
        let members = self.root_pages(json.key())?;
        let mut space = Space::from(json);
        for id in members {
            space = space.with_member(id);
        }
        Ok(space)
    }
}

impl Source for ConfluenceClient {
    fn name(&self) -> &str {
        &self.base_url
    }

    fn fetch_document(&self, id: &str) -> FetchResult<Document> {
        let content: ContentJson = self.get_json(
            &format!("/rest/api/content/{}?expand={}", id, CONTENT_EXPAND),
            "page",
            id,
        )?;
        Ok(content.into_document(&self.base_url))
    }

    fn fetch_children(&self, id: &str) -> FetchResult<Vec<String>> {
        let children: Vec<IdOnly> =
            self.paged(&format!("/rest/api/content/{}/child/page", id), "page", id)?;
        Ok(children.into_iter().map(|c| c.id).collect())
    }

    fn fetch_space(&self, key: &str) -> FetchResult<Space> {
        let json: SpaceJson = self.get_json(
            &format!("/rest/api/space/{}?expand=homepage,description.plain", key),
            "space",
            key,
        )?;
        self.space_from_json(json)
    }

    fn fetch_all_spaces(&self) -> FetchResult<Vec<Space>> {
        let spaces: Vec<SpaceJson> = self.paged(
            "/rest/api/space?type=global&status=current&expand=homepage,description.plain",
            "space",
            "*",
        )?;
        spaces.into_iter().map(|s| self.space_from_json(s)).collect()
    }

    fn fetch_attachment_meta(&self, document_id: &str) -> FetchResult<Vec<Attachment>> {
        let attachments: Vec<AttachmentJson> = self.paged(
            &format!(
                "/rest/api/content/{}/child/attachment?expand=version,container",
                document_id
            ),
            "page",
            document_id,
        )?;
        Ok(attachments
            .into_iter()
            .map(|a| a.into_attachment(document_id))
            .collect())
    }

    fn fetch_attachment_bytes(&self, attachment: &Attachment) -> FetchResult<Vec<u8>> {
        let link = attachment.download_link.clone().unwrap_or_else(|| {
            format!(
                "/download/attachments/{}/{}",
                attachment.owner_id, attachment.title
            )
        });
        let bytes = self
            .send(&link, "attachment", &attachment.id)?
            .bytes()
            .map_err(|e| FetchError::Transport(format!("attachment `{}`: {}", attachment.id, e)))?;
        Ok(bytes.to_vec())
    }

    fn base_url(&self) -> Option<&str> {
        Some(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig {
            url: "https://wiki.example.com/wiki/".into(),
            username: "me".into(),
            api_token: "token".into(),
            pat: String::new(),
        }
    }

    #[test]
    fn test_requires_credentials() {
        let err = ConfluenceClient::new(AuthConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_base_url_normalized() {
        let client = ConfluenceClient::new(auth()).unwrap();
        assert_eq!(client.base_url(), Some("https://wiki.example.com/wiki"));
        assert_eq!(
            client.url("/rest/api/content/1"),
            "https://wiki.example.com/wiki/rest/api/content/1"
        );
        assert_eq!(client.url("https://other/x"), "https://other/x");
    }

    #[test]
    fn test_from_config_keeps_retry() {
        let mut config = ExportConfig::default().with_auth(auth());
        config.retry.max_retries = 1;
        let client = ConfluenceClient::from_config(&config).unwrap();
        assert_eq!(client.retry.max_retries, 1);
    }
}
