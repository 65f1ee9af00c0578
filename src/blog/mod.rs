//! Blogging platform collaborator
//!
//! The publisher talks to `BlogPlatform`; `TumblrClient` is the production
//! implementation, signing every request with OAuth 1.0a.

pub mod oauth;
pub mod tumblr;

use async_trait::async_trait;

pub use oauth::OAuthCredentials;
pub use tumblr::TumblrClient;

/// Post visibility. Announcements are always published immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostState {
    #[default]
    Published,
}

impl PostState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostState::Published => "published",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextPost {
    pub blog: String,
    pub state: PostState,
    pub tags: Vec<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoPost {
    pub blog: String,
    pub state: PostState,
    pub tags: Vec<String>,
    /// Image URL the platform fetches itself
    pub source: String,
    pub caption: String,
}

#[derive(Debug)]
pub enum BlogError {
    /// Network failure or timeout
    Transport(String),
    /// Platform answered with a non-success status
    Rejected { status: u16, message: String },
    Decode(String),
    Signing(String),
}

impl From<reqwest::Error> for BlogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BlogError::Decode(err.to_string())
        } else {
            BlogError::Transport(err.to_string())
        }
    }
}

impl std::fmt::Display for BlogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlogError::Transport(msg) => write!(f, "Blog transport error: {}", msg),
            BlogError::Rejected { status, message } => {
                write!(f, "Blog rejected post ({}): {}", status, message)
            }
            BlogError::Decode(msg) => write!(f, "Blog decode error: {}", msg),
            BlogError::Signing(msg) => write!(f, "Request signing error: {}", msg),
        }
    }
}

impl std::error::Error for BlogError {}

#[async_trait]
pub trait BlogPlatform: Send + Sync {
    async fn create_text_post(&self, post: &TextPost) -> Result<(), BlogError>;

    async fn create_photo_post(&self, post: &PhotoPost) -> Result<(), BlogError>;
}
