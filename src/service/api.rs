//! Remote snippet-store client.
//!
//! The HTTP contract lives behind a trait so the service can be driven
//! against a fake store in tests, the same way the rest of the crate
//! fakes its platform seams.

use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::variables::StaticVariable;
use crate::error::SnipflowResult;

/// One snippet as returned by the remote store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnippet {
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub shortcut: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShortcutEntry {
    shortcut: String,
}

/// Outcome of one remote call, with auth expiry made explicit so the
/// service can tear the session down.
#[derive(Debug)]
pub enum ApiOutcome<T> {
    Ok(T),
    NotFound,
    Unauthorized,
}

/// The remote HTTP contract consumed by the background service.
#[async_trait]
pub trait SnippetApi: Send + Sync {
    async fn fetch_snippet(
        &self,
        base_url: &str,
        token: &str,
        key: &str,
    ) -> SnipflowResult<ApiOutcome<RemoteSnippet>>;

    async fn fetch_shortcuts(
        &self,
        base_url: &str,
        token: &str,
    ) -> SnipflowResult<ApiOutcome<Vec<String>>>;

    async fn fetch_variables(
        &self,
        base_url: &str,
        token: &str,
    ) -> SnipflowResult<ApiOutcome<Vec<StaticVariable>>>;
}

/// reqwest-backed implementation of the store contract.
#[derive(Default)]
pub struct HttpSnippetApi {
    client: reqwest::Client,
}

impl HttpSnippetApi {
    pub fn new() -> Self {
        Self::default()
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[async_trait]
impl SnippetApi for HttpSnippetApi {
    async fn fetch_snippet(
        &self,
        base_url: &str,
        token: &str,
        key: &str,
    ) -> SnipflowResult<ApiOutcome<RemoteSnippet>> {
        let url = endpoint(
            base_url,
            &format!("/snippets/shortcut/{}", urlencoding::encode(key)),
        );
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED => Ok(ApiOutcome::Unauthorized),
            status if status.is_success() => Ok(ApiOutcome::Ok(response.json().await?)),
            _ => Ok(ApiOutcome::NotFound),
        }
    }

    async fn fetch_shortcuts(
        &self,
        base_url: &str,
        token: &str,
    ) -> SnipflowResult<ApiOutcome<Vec<String>>> {
        let url = endpoint(base_url, "/snippets/shortcuts");
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED => Ok(ApiOutcome::Unauthorized),
            status if status.is_success() => {
                let entries: Vec<ShortcutEntry> = response.json().await?;
                Ok(ApiOutcome::Ok(
                    entries.into_iter().map(|entry| entry.shortcut).collect(),
                ))
            }
            _ => Ok(ApiOutcome::NotFound),
        }
    }

    async fn fetch_variables(
        &self,
        base_url: &str,
        token: &str,
    ) -> SnipflowResult<ApiOutcome<Vec<StaticVariable>>> {
        let url = endpoint(base_url, "/variables");
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED => Ok(ApiOutcome::Unauthorized),
            status if status.is_success() => Ok(ApiOutcome::Ok(response.json().await?)),
            _ => Ok(ApiOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        assert_eq!(
            endpoint("https://api.example.com/", "/variables"),
            "https://api.example.com/variables"
        );
    }

    #[test]
    fn test_snippet_payload_shape() {
        let snippet: RemoteSnippet = serde_json::from_str(
            r#"{"name":"Sig","content":"Best","htmlContent":"<b>Best</b>","shortcut":"/sig"}"#,
        )
        .unwrap();
        assert_eq!(snippet.html_content.as_deref(), Some("<b>Best</b>"));
        assert_eq!(snippet.shortcut.as_deref(), Some("/sig"));
    }

    #[test]
    fn test_snippet_payload_tolerates_missing_content() {
        let snippet: RemoteSnippet = serde_json::from_str(r#"{"name":"Sig"}"#).unwrap();
        assert!(snippet.content.is_none());
    }
}
