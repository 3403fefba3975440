//! Reddit client implementing [`ForumClient`] over the public OAuth API.
//!
//! Authentication uses the script-app password grant; the access token is
//! cached and refreshed shortly before it expires. Comment creation goes
//! through `/api/comment` with `api_type=json`, whose structured error codes
//! are what the error categorization in [`super::error`] keys on.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::config::require_env;
use crate::types::{CommentFullname, MessageId};

use super::client::{ForumClient, InboxMessage};
use super::error::ForumError;

/// Token endpoint (unauthenticated host).
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Base URL for authenticated API calls.
const API_BASE: &str = "https://oauth.reddit.com";

/// Refresh the token this long before the advertised expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Credentials for a Reddit script application.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl RedditCredentials {
    /// Reads credentials from `REDDIT_*` environment variables.
    pub fn from_env(user_agent: String) -> Result<Self, crate::config::MissingVar> {
        Ok(RedditCredentials {
            client_id: require_env("REDDIT_CLIENT_ID")?,
            client_secret: require_env("REDDIT_CLIENT_SECRET")?,
            username: require_env("REDDIT_USERNAME")?,
            password: require_env("REDDIT_PASSWORD")?,
            user_agent,
        })
    }
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// A Reddit API client for a single bot account.
pub struct RedditClient {
    http: reqwest::Client,
    credentials: RedditCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Self {
        RedditClient {
            http: reqwest::Client::new(),
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Returns a valid access token, requesting a fresh one if the cached
    /// token is missing or about to expire.
    async fn bearer(&self) -> Result<String, ForumError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.access_token.clone());
        }

        debug!("requesting a fresh access token");
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(ForumError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForumError::from_status(
                status.as_u16(),
                format!("token request failed: {body}"),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(ForumError::from_transport)?;
        let expires_at = Instant::now()
            + Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });
        Ok(access_token)
    }

    /// Issues an authenticated form POST and returns the response body on
    /// HTTP success.
    async fn api_post(&self, path: &str, form: &[(&str, &str)]) -> Result<String, ForumError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .post(format!("{API_BASE}{path}"))
            .bearer_auth(bearer)
            .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
            .form(form)
            .send()
            .await
            .map_err(ForumError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ForumError::from_transport)?;
        if !status.is_success() {
            return Err(ForumError::from_status(status.as_u16(), body));
        }
        Ok(body)
    }

    /// Posts a comment in reply to any thing (submission, comment or
    /// message) and returns the created comment's fullname.
    async fn post_comment(&self, parent: &str, body: &str) -> Result<CommentFullname, ForumError> {
        let raw = self
            .api_post(
                "/api/comment",
                &[("api_type", "json"), ("thing_id", parent), ("text", body)],
            )
            .await?;
        let fullname = parse_comment_response(&raw)?;
        trace!(parent, comment = %fullname, "posted comment");
        Ok(fullname)
    }
}

impl ForumClient for RedditClient {
    async fn reply_to_submission(
        &self,
        post_url: &str,
        body: &str,
    ) -> Result<CommentFullname, ForumError> {
        let parent = link_fullname_from_url(post_url).ok_or_else(|| {
            ForumError::permanent(format!("unrecognized submission URL: {post_url}"))
        })?;
        self.post_comment(&parent, body).await
    }

    async fn reply_to_comment(
        &self,
        parent: &CommentFullname,
        body: &str,
    ) -> Result<CommentFullname, ForumError> {
        self.post_comment(parent.as_str(), body).await
    }

    async fn unread_messages(&self) -> Result<Vec<InboxMessage>, ForumError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .get(format!("{API_BASE}/message/unread"))
            .query(&[("limit", "100")])
            .bearer_auth(bearer)
            .header(reqwest::header::USER_AGENT, &self.credentials.user_agent)
            .send()
            .await
            .map_err(ForumError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForumError::from_status(status.as_u16(), body));
        }

        let listing: Listing = response.json().await.map_err(ForumError::from_transport)?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|thing| InboxMessage {
                id: MessageId::new(thing.data.name),
                subject: thing.data.subject.unwrap_or_default(),
                body: thing.data.body.unwrap_or_default(),
                author: thing.data.author,
            })
            .collect())
    }

    async fn reply_to_message(&self, message: &MessageId, body: &str) -> Result<(), ForumError> {
        self.post_comment(message.as_str(), body).await.map(|_| ())
    }

    async fn mark_read(&self, message: &MessageId) -> Result<(), ForumError> {
        self.api_post("/api/read_message", &[("id", message.as_str())])
            .await
            .map(|_| ())
    }
}

/// Derives a submission fullname (`t3_<id>`) from its permalink URL.
///
/// Recognizes the canonical `/comments/<id>/...` path shape.
fn link_fullname_from_url(url: &str) -> Option<String> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "comments" {
            let id = segments.next()?;
            return Some(format!("t3_{id}"));
        }
    }
    None
}

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    json: CommentJson,
}

#[derive(Debug, Deserialize)]
struct CommentJson {
    /// Structured API errors as `[code, message, field]` triples.
    #[serde(default)]
    errors: Vec<(String, String, Option<String>)>,
    data: Option<CommentData>,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    things: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: ThingData,
}

#[derive(Debug, Deserialize)]
struct ThingData {
    name: String,
    subject: Option<String>,
    body: Option<String>,
    author: Option<String>,
}

/// Extracts the created comment's fullname from an `/api/comment` response,
/// surfacing structured API errors by kind.
fn parse_comment_response(raw: &str) -> Result<CommentFullname, ForumError> {
    let response: CommentResponse = serde_json::from_str(raw).map_err(|e| {
        ForumError::permanent(format!("malformed comment response: {e}"))
    })?;

    if let Some((code, message, _)) = response.json.errors.first() {
        return Err(ForumError::from_api_code(code, message));
    }

    response
        .json
        .data
        .and_then(|data| data.things.into_iter().next())
        .map(|thing| CommentFullname::new(thing.data.name))
        .ok_or_else(|| ForumError::permanent("comment response contained no created thing"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::error::ForumErrorKind;

    #[test]
    fn link_fullname_from_canonical_urls() {
        let cases = [
            (
                "https://www.reddit.com/r/TranscribersOfReddit/comments/abc123/some_title/",
                Some("t3_abc123"),
            ),
            (
                "https://reddit.com/r/pics/comments/xyz9/title",
                Some("t3_xyz9"),
            ),
            (
                "https://www.reddit.com/r/pics/comments/xyz9/title/?utm_source=share",
                Some("t3_xyz9"),
            ),
            ("https://www.reddit.com/r/pics/", None),
        ];
        for (url, expected) in cases {
            assert_eq!(
                link_fullname_from_url(url).as_deref(),
                expected,
                "url: {url}"
            );
        }
    }

    #[test]
    fn parses_a_created_comment() {
        let raw = r#"{"json": {"errors": [], "data": {"things": [
            {"data": {"name": "t1_h0k2"}}
        ]}}}"#;
        assert_eq!(
            parse_comment_response(raw).unwrap(),
            CommentFullname::new("t1_h0k2")
        );
    }

    #[test]
    fn surfaces_too_old_as_aged_out() {
        let raw = r#"{"json": {"errors": [
            ["TOO_OLD", "that's a bit too old to comment on", "parent"]
        ], "data": null}}"#;
        let err = parse_comment_response(raw).unwrap_err();
        assert!(err.is_aged_out());
    }

    #[test]
    fn surfaces_ratelimit_with_parsed_wait() {
        let raw = r#"{"json": {"errors": [
            ["RATELIMIT", "you are doing that too much. try again in 2 minutes.", "ratelimit"]
        ], "data": null}}"#;
        let err = parse_comment_response(raw).unwrap_err();
        assert_eq!(
            err.kind,
            ForumErrorKind::RateLimited {
                retry_after: std::time::Duration::from_secs(120)
            }
        );
    }

    #[test]
    fn missing_created_thing_is_permanent() {
        let raw = r#"{"json": {"errors": [], "data": {"things": []}}}"#;
        let err = parse_comment_response(raw).unwrap_err();
        assert_eq!(err.kind, ForumErrorKind::Permanent);
    }
}
