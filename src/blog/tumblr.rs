//! Tumblr v2 API client
//!
//! - `POST {base}/blog/{blog}/post` (legacy post format, form encoded)
//! - `GET {base}/user/info` (startup credential check)

use super::oauth::{self, OAuthCredentials};
use super::{BlogError, BlogPlatform, PhotoPost, TextPost};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.tumblr.com/v2";

#[derive(Debug, Deserialize)]
struct Envelope {
    meta: Option<Meta>,
    response: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    msg: Option<String>,
}

pub struct TumblrClient {
    client: reqwest::Client,
    base_url: String,
    credentials: OAuthCredentials,
    user_agent: String,
}

/// `name` becomes `name.tumblr.com`; anything with a dot is used as-is
pub fn blog_identifier(blog: &str) -> String {
    if blog.contains('.') {
        blog.to_string()
    } else {
        format!("{}.tumblr.com", blog)
    }
}

fn tags_field(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(","))
    }
}

pub fn text_post_form(post: &TextPost) -> Vec<(String, String)> {
    let mut form = vec![
        ("type".to_string(), "text".to_string()),
        ("state".to_string(), post.state.as_str().to_string()),
        ("body".to_string(), post.body.clone()),
    ];
    if let Some(tags) = tags_field(&post.tags) {
        form.push(("tags".to_string(), tags));
    }
    form
}

pub fn photo_post_form(post: &PhotoPost) -> Vec<(String, String)> {
    let mut form = vec![
        ("type".to_string(), "photo".to_string()),
        ("state".to_string(), post.state.as_str().to_string()),
        ("source".to_string(), post.source.clone()),
        ("caption".to_string(), post.caption.clone()),
    ];
    if let Some(tags) = tags_field(&post.tags) {
        form.push(("tags".to_string(), tags));
    }
    form
}

/// Non-2xx is a rejection carrying `meta.msg` when present. A 2xx body that
/// is not an envelope gives `Ok(None)`.
fn interpret_response(status: StatusCode, body: &[u8]) -> Result<Option<Envelope>, BlogError> {
    let envelope: Option<Envelope> = serde_json::from_slice(body).ok();

    if !status.is_success() {
        let message = envelope
            .and_then(|e| e.meta)
            .and_then(|m| m.msg)
            .unwrap_or_else(|| String::from_utf8_lossy(body).chars().take(200).collect());
        return Err(BlogError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    Ok(envelope)
}

impl TumblrClient {
    pub fn new(
        base_url: &str,
        credentials: OAuthCredentials,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, BlogError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            user_agent: user_agent.to_string(),
        })
    }

    fn post_url(&self, blog: &str) -> String {
        format!("{}/blog/{}/post", self.base_url, blog_identifier(blog))
    }

    fn authorize(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, BlogError> {
        oauth::authorization_header(
            &self.credentials,
            method,
            url,
            params,
            &oauth::generate_nonce(),
            chrono::Utc::now().timestamp(),
        )
        .map_err(|e| BlogError::Signing(e.to_string()))
    }

    async fn read_envelope(response: reqwest::Response) -> Result<Option<Envelope>, BlogError> {
        let status = response.status();
        let body = response.bytes().await?;
        interpret_response(status, &body)
    }

    async fn submit(&self, blog: &str, form: Vec<(String, String)>) -> Result<(), BlogError> {
        let url = self.post_url(blog);
        let authorization = self.authorize("POST", &url, &form)?;

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, authorization)
            .header(USER_AGENT, self.user_agent.as_str())
            .form(&form)
            .send()
            .await?;

        // Accepted on any 2xx, even if the body is unreadable
        match Self::read_envelope(response).await? {
            Some(envelope) => {
                if let Some(id) = envelope
                    .response
                    .as_ref()
                    .and_then(|r| r.get("id_string").or_else(|| r.get("id")))
                {
                    log::debug!("📝 Tumblr accepted post {}", id);
                }
            }
            None => log::warn!("⚠️  Tumblr accepted post with an unreadable response body"),
        }
        Ok(())
    }

    /// Name of the account the credentials belong to
    pub async fn verify_credentials(&self) -> Result<String, BlogError> {
        let url = format!("{}/user/info", self.base_url);
        let authorization = self.authorize("GET", &url, &[])?;

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, authorization)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await?;

        let body = Self::read_envelope(response)
            .await?
            .and_then(|envelope| envelope.response);
        body.as_ref()
            .and_then(|r| r.pointer("/user/name"))
            .and_then(|name| name.as_str())
            .map(str::to_string)
            .ok_or_else(|| BlogError::Decode("user name missing from user/info".to_string()))
    }
}

#[async_trait]
impl BlogPlatform for TumblrClient {
    async fn create_text_post(&self, post: &TextPost) -> Result<(), BlogError> {
        self.submit(&post.blog, text_post_form(post)).await
    }

    async fn create_photo_post(&self, post: &PhotoPost) -> Result<(), BlogError> {
        self.submit(&post.blog, photo_post_form(post)).await
    }
}
