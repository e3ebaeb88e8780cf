//! Reddit implementation of [`DiscussionPlatform`] over the OAuth API.
//!
//! Authentication uses an installed-app refresh token: the token endpoint on
//! `auth_url` issues short-lived bearer tokens, which are renewed shortly
//! before they expire. All reads and writes go to `api_url`.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::RedditConfig;
use crate::error::{BotError, Result};
use crate::platform::{Comment, DiscussionPlatform, Submission};

const SERVICE: &str = "reddit";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Renew the bearer token this long before it expires.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);
/// Largest page the listing endpoint serves.
pub const MAX_LISTING: u32 = 100;
/// Wait used when a 429 carries no usable `Retry-After`.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);
/// Author name the API reports for deleted content.
const DELETED_AUTHOR: &str = "[deleted]";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
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
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct LinkData {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    json: ApiJson,
}

#[derive(Debug, Deserialize)]
struct ApiJson {
    #[serde(default)]
    errors: Vec<Vec<Value>>,
    #[serde(default)]
    ratelimit: Option<f64>,
}

fn present_author(author: Option<String>) -> Option<String> {
    author.filter(|a| !a.is_empty() && a != DELETED_AUTHOR)
}

// ---------------------------------------------------------------------------
// Rate-limit parsing
// ---------------------------------------------------------------------------

/// Parse a `Retry-After` header: delay seconds or an HTTP date.
pub fn parse_retry_after(header: &str) -> Option<Duration> {
    let header = header.trim();
    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = chrono::DateTime::parse_from_rfc2822(header).ok()?;
    let diff = date.signed_duration_since(chrono::Utc::now());
    Some(Duration::from_secs(diff.num_seconds().max(0) as u64))
}

static WAIT_RE: OnceLock<Regex> = OnceLock::new();

fn wait_re() -> &'static Regex {
    WAIT_RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(second|minute|hour)s?").expect("valid wait regex")
    })
}

/// Parse the wait out of messages like "try again in 9 minutes.".
pub fn parse_ratelimit_message(message: &str) -> Option<Duration> {
    let caps = wait_re().captures(message)?;
    let amount: u64 = caps[1].parse().ok()?;
    let unit = match caps[2].to_ascii_lowercase().as_str() {
        "second" => 1,
        "minute" => 60,
        _ => 3600,
    };
    Some(Duration::from_secs(amount.checked_mul(unit)?))
}

/// Inspect a `POST /api/*` envelope: rate limit, other API errors, or success.
fn check_api_errors(envelope: &ApiEnvelope) -> Result<()> {
    for error in &envelope.json.errors {
        let code = error.first().and_then(Value::as_str).unwrap_or_default();
        let message = error.get(1).and_then(Value::as_str).unwrap_or_default();
        if code == "RATELIMIT" {
            let retry_after = envelope
                .json
                .ratelimit
                .map(|secs| Duration::from_secs(secs.max(0.0).ceil() as u64))
                .or_else(|| parse_ratelimit_message(message))
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
            return Err(BotError::RateLimited { retry_after });
        }
    }
    if let Some(error) = envelope.json.errors.first() {
        let rendered: Vec<String> = error
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect();
        return Err(BotError::Platform(format!(
            "api error: {}",
            rendered.join(": ")
        )));
    }
    Ok(())
}

fn truncate_for_error(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

// ---------------------------------------------------------------------------
// RedditClient
// ---------------------------------------------------------------------------

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct RedditClient {
    http: Client,
    auth_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token: Option<AccessToken>,
}

impl RedditClient {
    pub fn new(config: &RedditConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| BotError::Config(format!("invalid reddit.user_agent: {e}")))?,
        );
        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotError::Config(format!("failed to build reddit client: {e}")))?;
        Ok(Self {
            http,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            token: None,
        })
    }

    /// Exchange the refresh token for a bearer token.
    pub fn authenticate(&mut self) -> Result<()> {
        info!("authenticating with reddit");
        let auth = |message: String| BotError::Auth {
            service: SERVICE,
            message,
        };
        let response = self
            .http
            .post(format!("{}/api/v1/access_token", self.auth_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .map_err(|e| auth(format!("token request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 200)
            )));
        }
        let token: TokenResponse = response
            .json()
            .map_err(|e| auth(format!("unreadable token response: {e}")))?;
        let Some(value) = token.access_token.filter(|t| !t.is_empty()) else {
            return Err(auth(
                token
                    .error
                    .unwrap_or_else(|| "no access_token in response".to_string()),
            ));
        };
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        self.token = Some(AccessToken {
            value,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_MARGIN),
        });
        info!("reddit authentication succeeded");
        Ok(())
    }

    fn bearer(&mut self) -> Result<String> {
        let fresh = self
            .token
            .as_ref()
            .is_some_and(|t| Instant::now() < t.expires_at);
        if !fresh {
            debug!("reddit token missing or expired, refreshing");
            self.authenticate()?;
        }
        self.token
            .as_ref()
            .map(|t| t.value.clone())
            .ok_or_else(|| BotError::Auth {
                service: SERVICE,
                message: "no access token".to_string(),
            })
    }

    fn send(
        &mut self,
        operation: &str,
        build: impl FnOnce(&Client) -> RequestBuilder,
    ) -> Result<Response> {
        let bearer = self.bearer()?;
        let response = build(&self.http)
            .bearer_auth(bearer)
            .send()
            .map_err(|e| BotError::Platform(format!("{operation} request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
            return Err(BotError::RateLimited { retry_after });
        }
        if status == StatusCode::UNAUTHORIZED {
            // Force a refresh on the next call.
            self.token = None;
        }
        let body = response.text().unwrap_or_default();
        Err(BotError::Platform(format!(
            "{operation} failed with status {}: {}",
            status.as_u16(),
            truncate_for_error(&body, 400)
        )))
    }
}

impl DiscussionPlatform for RedditClient {
    fn new_submissions(&mut self, space: &str, limit: u32) -> Result<Vec<Submission>> {
        let url = format!("{}/r/{}/new", self.api_url, space);
        let limit = limit.clamp(1, MAX_LISTING).to_string();
        let listing: Listing = self
            .send("list submissions", |http| {
                http.get(&url).query(&[("limit", limit.as_str()), ("raw_json", "1")])
            })?
            .json()
            .map_err(|e| BotError::Platform(format!("unreadable submission listing: {e}")))?;

        let mut submissions = Vec::new();
        for thing in listing.data.children {
            if thing.kind != "t3" {
                continue;
            }
            let link: LinkData = serde_json::from_value(thing.data)?;
            submissions.push(Submission {
                id: link.id,
                author: present_author(link.author),
                url: link.url,
            });
        }
        Ok(submissions)
    }

    fn comments(&mut self, submission: &Submission) -> Result<Vec<Comment>> {
        let url = format!("{}/comments/{}", self.api_url, submission.id);
        let listings: Vec<Listing> = self
            .send("list comments", |http| {
                http.get(&url).query(&[("depth", "1"), ("raw_json", "1")])
            })?
            .json()
            .map_err(|e| BotError::Platform(format!("unreadable comment listing: {e}")))?;

        // [0] is the submission itself, [1] its comment forest.
        let Some(forest) = listings.into_iter().nth(1) else {
            return Ok(Vec::new());
        };
        let mut comments = Vec::new();
        for thing in forest.data.children {
            if thing.kind != "t1" {
                continue;
            }
            let data: CommentData = serde_json::from_value(thing.data)?;
            comments.push(Comment {
                id: data.id,
                author: present_author(data.author),
                body: data.body,
            });
        }
        Ok(comments)
    }

    fn reply(&mut self, comment: &Comment, text: &str) -> Result<()> {
        let url = format!("{}/api/comment", self.api_url);
        let thing_id = format!("t1_{}", comment.id);
        let envelope: ApiEnvelope = self
            .send("submit reply", |http| {
                http.post(&url).form(&[
                    ("api_type", "json"),
                    ("thing_id", thing_id.as_str()),
                    ("text", text),
                ])
            })?
            .json()
            .map_err(|e| BotError::Platform(format!("unreadable reply response: {e}")))?;
        check_api_errors(&envelope)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn client_for(server: &ServerGuard) -> RedditClient {
        let config = RedditConfig {
            client_id: "app".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            auth_url: server.url(),
            api_url: server.url(),
            ..RedditConfig::default()
        };
        RedditClient::new(&config).unwrap()
    }

    fn mock_token(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/api/v1/access_token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "refresh".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok","token_type":"bearer","expires_in":3600}"#)
            .create()
    }

    #[test]
    fn authenticate_stores_token() {
        let mut server = Server::new();
        let token = mock_token(&mut server);
        let mut client = client_for(&server);
        client.authenticate().unwrap();
        token.assert();
        assert_eq!(client.bearer().unwrap(), "tok");
    }

    #[test]
    fn rejected_refresh_token_is_auth_error() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/v1/access_token")
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create();
        let err = client_for(&server).authenticate().unwrap_err();
        match err {
            BotError::Auth { service, message } => {
                assert_eq!(service, "reddit");
                assert_eq!(message, "invalid_grant");
            }
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn lists_submissions_and_keeps_links_only() {
        let mut server = Server::new();
        mock_token(&mut server);
        let listing = server
            .mock("GET", "/r/pics+funny/new")
            .match_query(Matcher::UrlEncoded("limit".into(), "100".into()))
            .match_header("authorization", "Bearer tok")
            .with_body(
                r#"{"kind":"Listing","data":{"children":[
                    {"kind":"t3","data":{"id":"s1","author":"op","url":"http://i.imgur.com/abc.jpg"}},
                    {"kind":"t3","data":{"id":"s2","author":"[deleted]","url":"http://imgur.com/xyz"}},
                    {"kind":"t5","data":{"id":"ignored"}}
                ]}}"#,
            )
            .create();

        let mut client = client_for(&server);
        let subs = client.new_submissions("pics+funny", 500).unwrap();
        listing.assert();
        assert_eq!(
            subs,
            vec![
                Submission {
                    id: "s1".into(),
                    author: Some("op".into()),
                    url: "http://i.imgur.com/abc.jpg".into()
                },
                Submission {
                    id: "s2".into(),
                    author: None,
                    url: "http://imgur.com/xyz".into()
                },
            ]
        );
    }

    #[test]
    fn comments_skip_more_stubs_and_mark_deleted_authors() {
        let mut server = Server::new();
        mock_token(&mut server);
        server
            .mock("GET", "/comments/s1")
            .match_query(Matcher::Any)
            .with_body(
                r#"[
                  {"kind":"Listing","data":{"children":[{"kind":"t3","data":{"id":"s1","url":"u"}}]}},
                  {"kind":"Listing","data":{"children":[
                    {"kind":"t1","data":{"id":"c1","author":"alice","body":"needs more jpeg"}},
                    {"kind":"t1","data":{"id":"c2","author":"[deleted]","body":"[removed]"}},
                    {"kind":"more","data":{"count":3,"children":["c9"]}}
                  ]}}
                ]"#,
            )
            .create();

        let mut client = client_for(&server);
        let sub = Submission {
            id: "s1".into(),
            author: None,
            url: "u".into(),
        };
        let comments = client.comments(&sub).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author.as_deref(), Some("alice"));
        assert_eq!(comments[1].author, None);
    }

    #[test]
    fn reply_posts_to_parent_comment() {
        let mut server = Server::new();
        mock_token(&mut server);
        let post = server
            .mock("POST", "/api/comment")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("thing_id".into(), "t1_c1".into()),
                Matcher::UrlEncoded("text".into(), "[Here you go](link)".into()),
            ]))
            .with_body(r#"{"json":{"errors":[],"data":{"things":[]}}}"#)
            .create();

        let mut client = client_for(&server);
        let target = Comment {
            id: "c1".into(),
            author: Some("alice".into()),
            body: "nice jpg".into(),
        };
        client.reply(&target, "[Here you go](link)").unwrap();
        post.assert();
    }

    #[test]
    fn ratelimit_error_body_becomes_rate_limited() {
        let mut server = Server::new();
        mock_token(&mut server);
        server
            .mock("POST", "/api/comment")
            .with_body(
                r#"{"json":{"ratelimit":540.2,"errors":[["RATELIMIT","you are doing that too much. try again in 9 minutes.","ratelimit"]]}}"#,
            )
            .create();

        let mut client = client_for(&server);
        let target = Comment {
            id: "c1".into(),
            author: Some("alice".into()),
            body: String::new(),
        };
        let err = client.reply(&target, "hi").unwrap_err();
        match err {
            BotError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(541))
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn http_429_uses_retry_after_header() {
        let mut server = Server::new();
        mock_token(&mut server);
        server
            .mock("POST", "/api/comment")
            .with_status(429)
            .with_header("retry-after", "17")
            .create();

        let mut client = client_for(&server);
        let target = Comment {
            id: "c1".into(),
            author: None,
            body: String::new(),
        };
        let err = client.reply(&target, "hi").unwrap_err();
        assert!(
            matches!(err, BotError::RateLimited { retry_after } if retry_after == Duration::from_secs(17)),
            "got {err:?}"
        );
    }

    #[test]
    fn other_api_errors_are_platform_errors() {
        let mut server = Server::new();
        mock_token(&mut server);
        server
            .mock("POST", "/api/comment")
            .with_body(r#"{"json":{"errors":[["DELETED_COMMENT","that comment has been deleted","parent"]]}}"#)
            .create();

        let mut client = client_for(&server);
        let target = Comment {
            id: "c1".into(),
            author: None,
            body: String::new(),
        };
        let err = client.reply(&target, "hi").unwrap_err();
        assert!(err.to_string().contains("DELETED_COMMENT"), "{err}");
    }

    #[test]
    fn ratelimit_message_parsing() {
        assert_eq!(
            parse_ratelimit_message("try again in 9 minutes."),
            Some(Duration::from_secs(540))
        );
        assert_eq!(
            parse_ratelimit_message("take a break for 30 seconds"),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_ratelimit_message("try again in 1 hour"),
            Some(Duration::from_secs(3600))
        );
        assert_eq!(parse_ratelimit_message("slow down"), None);
    }

    #[test]
    fn oversized_ratelimit_wait_is_rejected() {
        assert_eq!(
            parse_ratelimit_message("try again in 18446744073709551 hours"),
            None
        );
        assert_eq!(
            parse_ratelimit_message("try again in 99999999999999999999 seconds"),
            None
        );
    }

    #[test]
    fn retry_after_parsing() {
        assert_eq!(parse_retry_after("60"), Some(Duration::from_secs(60)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon"), None);
    }
}
