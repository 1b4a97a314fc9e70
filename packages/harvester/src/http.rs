//! HTTP client for the comment-listing API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::{HarvesterConfig, COMMENTS_ENDPOINT};
use crate::credentials::Credentials;
use crate::error::{HarvesterError, Result};
use crate::types::{CommentPage, CommentRecord, FetchCursor, ThreadRef};

/// Source of comment pages, enabling mocking in tests.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Fetch the page at `cursor`. Never retried by the caller.
    async fn fetch_page(
        &self,
        thread: &ThreadRef,
        cursor: &FetchCursor,
        credentials: &Credentials,
    ) -> Result<CommentPage>;
}

/// Create a configured HTTP client.
///
/// No default user agent is set: every request carries the session's own.
pub fn create_client(timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Client for Weibo's `buildComments` endpoint.
pub struct WeiboClient {
    http: Client,
    endpoint: Url,
    page_size: u32,
}

impl WeiboClient {
    pub fn new(config: &HarvesterConfig) -> Result<Self> {
        let raw = format!(
            "{}{COMMENTS_ENDPOINT}",
            config.api_base_url.trim_end_matches('/')
        );
        let endpoint = Url::parse(&raw).map_err(|source| HarvesterError::InvalidApiUrl {
            url: raw.clone(),
            source,
        })?;

        Ok(Self {
            http: create_client(config.timeout_secs)?,
            endpoint,
            page_size: config.page_size,
        })
    }

    /// Full request URL for one page.
    pub fn page_url(&self, thread: &ThreadRef, cursor: &FetchCursor) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("id", &thread.thread_id)
            .append_pair("is_reload", "1")
            .append_pair("is_show_bulletin", "2")
            .append_pair("is_mix", "0")
            .append_pair("count", &self.page_size.to_string())
            .append_pair("uid", &thread.owner_id)
            .append_pair("fetch_level", "0")
            .append_pair("max_id", cursor.request_token());
        url
    }
}

#[async_trait]
impl CommentSource for WeiboClient {
    async fn fetch_page(
        &self,
        thread: &ThreadRef,
        cursor: &FetchCursor,
        credentials: &Credentials,
    ) -> Result<CommentPage> {
        let url = self.page_url(thread, cursor);
        tracing::debug!(page = cursor.page + 1, max_id = cursor.request_token(), "requesting comment page");

        let response = self
            .http
            .get(url.clone())
            .header(USER_AGENT, &credentials.user_agent)
            .header(COOKIE, &credentials.cookie)
            .header(REFERER, &credentials.referer)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvesterError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        parse_page(&body)
    }
}

/// Comment ids arrive as JSON numbers or strings depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleId {
    Number(u64),
    Text(String),
}

impl FlexibleId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Deserialize)]
struct ListingResponse {
    data: Option<Vec<RawComment>>,
    #[serde(default)]
    max_id: Option<FlexibleId>,
}

#[derive(Deserialize)]
struct RawComment {
    id: FlexibleId,
    text_raw: String,
    created_at: String,
    user: RawUser,
    #[serde(default)]
    like_counts: u64,
}

#[derive(Deserialize)]
struct RawUser {
    screen_name: String,
}

impl From<RawComment> for CommentRecord {
    fn from(raw: RawComment) -> Self {
        Self {
            comment_id: raw.id.into_string(),
            content: raw.text_raw,
            created_at: raw.created_at,
            user_name: raw.user.screen_name,
            like_count: raw.like_counts,
        }
    }
}

/// Parse a listing response body.
///
/// A `max_id` that is absent, `null`, `0` or empty means there is no next
/// page. A body without a `data` array is malformed.
pub fn parse_page(body: &str) -> Result<CommentPage> {
    let response: ListingResponse = serde_json::from_str(body)
        .map_err(|e| HarvesterError::MalformedResponse(e.to_string()))?;

    let data = response.data.ok_or_else(|| {
        HarvesterError::MalformedResponse("response has no 'data' array".to_string())
    })?;

    let next_token = response
        .max_id
        .map(FlexibleId::into_string)
        .filter(|token| !token.is_empty() && token != "0");

    Ok(CommentPage {
        comments: data.into_iter().map(CommentRecord::from).collect(),
        next_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_client() {
        assert!(create_client(5).is_ok());
    }

    #[test]
    fn test_parse_page() {
        let body = r#"{
            "ok": 1,
            "data": [
                {"id": 5012345678901234, "text_raw": "支持！", "created_at": "Sat Oct 18 08:00:00 +0800 2025",
                 "user": {"id": 1, "screen_name": "alice"}, "like_counts": 12},
                {"id": "5012345678901235", "text_raw": "meh", "created_at": "Sat Oct 18 08:01:00 +0800 2025",
                 "user": {"screen_name": "bob"}}
            ],
            "max_id": 139281729341234
        }"#;

        let page = parse_page(body).unwrap();
        assert_eq!(page.next_token.as_deref(), Some("139281729341234"));
        assert_eq!(
            page.comments,
            vec![
                CommentRecord {
                    comment_id: "5012345678901234".into(),
                    content: "支持！".into(),
                    created_at: "Sat Oct 18 08:00:00 +0800 2025".into(),
                    user_name: "alice".into(),
                    like_count: 12,
                },
                CommentRecord {
                    comment_id: "5012345678901235".into(),
                    content: "meh".into(),
                    created_at: "Sat Oct 18 08:01:00 +0800 2025".into(),
                    user_name: "bob".into(),
                    like_count: 0,
                },
            ]
        );
    }

    #[test]
    fn test_parse_page_end_of_stream_tokens() {
        for body in [
            r#"{"data": [], "max_id": 0}"#,
            r#"{"data": [], "max_id": null}"#,
            r#"{"data": [], "max_id": ""}"#,
            r#"{"data": []}"#,
        ] {
            let page = parse_page(body).unwrap();
            assert!(page.next_token.is_none(), "body: {body}");
            assert!(page.comments.is_empty());
        }
    }

    #[test]
    fn test_parse_page_malformed() {
        assert!(matches!(
            parse_page(r#"{"ok": 0, "msg": "login required"}"#),
            Err(HarvesterError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_page("<html>captcha</html>"),
            Err(HarvesterError::MalformedResponse(_))
        ));
        // A comment missing its author is a malformed page, not a skipped row
        assert!(matches!(
            parse_page(r#"{"data": [{"id": 1, "text_raw": "x", "created_at": "t"}]}"#),
            Err(HarvesterError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_page_url() {
        let config = HarvesterConfig::builder()
            .api_base_url("https://weibo.com/")
            .page_size(20)
            .build();
        let client = WeiboClient::new(&config).unwrap();
        let thread = ThreadRef {
            thread_id: "4987".into(),
            owner_id: "1234".into(),
        };

        let url = client.page_url(&thread, &FetchCursor::start());
        assert_eq!(
            url.as_str(),
            "https://weibo.com/ajax/statuses/buildComments?id=4987&is_reload=1&is_show_bulletin=2&is_mix=0&count=20&uid=1234&fetch_level=0&max_id=0"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = HarvesterConfig::builder().api_base_url("not a url").build();
        assert!(matches!(
            WeiboClient::new(&config),
            Err(HarvesterError::InvalidApiUrl { .. })
        ));
    }
}
