use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use classroom_types::api::ErrorBody;
use classroom_types::{Channel, NewChannel, User};

use crate::backend::{ChannelRepository, UserDirectory};
use crate::error::ClientError;
use crate::search::email_matches;

const DEFAULT_API_URL: &str = "http://localhost:3000";

/// JSON-over-HTTP access to the classroom API. No retries; timeouts are
/// whatever reqwest defaults to.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Base URL from `CLASSROOM_API_URL`, falling back to localhost:3000.
    pub fn from_env() -> Self {
        let url = std::env::var("CLASSROOM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        Self::new(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turn a non-2xx response into [`ClientError::Status`], keeping the
/// server's error message when it sent one.
async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.error)
        .unwrap_or(body);

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl UserDirectory for HttpBackend {
    async fn search(&self, term: &str) -> Result<Vec<User>, ClientError> {
        let resp = self
            .client
            .get(format!("{}/users", self.base_url))
            .query(&[("search", term)])
            .send()
            .await?;

        let users: Vec<User> = check(resp).await?.json().await?;
        debug!("Directory returned {} users for '{}'", users.len(), term);

        // The server's filter is not trusted to be case-insensitive
        Ok(users.into_iter().filter(|u| email_matches(u, term)).collect())
    }
}

#[async_trait]
impl ChannelRepository for HttpBackend {
    async fn list(&self) -> Result<Vec<Channel>, ClientError> {
        let resp = self
            .client
            .get(format!("{}/classes", self.base_url))
            .send()
            .await?;

        Ok(check(resp).await?.json().await?)
    }

    async fn create(&self, channel: NewChannel) -> Result<Channel, ClientError> {
        let resp = self
            .client
            .post(format!("{}/classes", self.base_url))
            .json(&channel)
            .send()
            .await?;

        Ok(check(resp).await?.json().await?)
    }
}
