// src/backend.rs
// Collaborator services of the forum under test, reached through its admin API

use crate::fixtures::{CategorySpec, UserSpec};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Category as reported back by the forum after creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedCategory {
    pub cid: u64,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTopic<'a> {
    pub uid: u64,
    pub cid: u64,
    pub title: &'a str,
    pub content: &'a str,
}

/// Everything the harness needs from the forum besides its public routes.
///
/// Implementations are expected to be side-effecting and non-idempotent:
/// calling `create_*` twice creates two entities.
#[allow(async_fn_in_trait)]
pub trait ForumBackend {
    async fn create_category(&self, spec: &CategorySpec) -> Result<CreatedCategory, BackendError>;

    async fn create_user(&self, spec: &UserSpec) -> Result<u64, BackendError>;

    async fn post_topic(&self, topic: &NewTopic<'_>) -> Result<u64, BackendError>;

    /// Push runtime configuration values. Keys not present are left untouched.
    async fn set_config(&self, values: &BTreeMap<String, String>) -> Result<(), BackendError>;

    /// Remove all persisted content and configuration overrides.
    async fn wipe(&self) -> Result<(), BackendError>;
}

#[derive(Debug)]
pub enum BackendError {
    Transport { endpoint: String, message: String },
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    Decode { endpoint: String, message: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transport { endpoint, message } => {
                write!(f, "request to {} failed: {}", endpoint, message)
            }
            BackendError::Status {
                endpoint,
                status,
                body,
            } => {
                write!(f, "{} answered with status {}", endpoint, status)?;
                if !body.is_empty() {
                    write!(f, ": {}", truncate(body, 200))?;
                }
                Ok(())
            }
            BackendError::Decode { endpoint, message } => {
                write!(f, "unexpected response from {}: {}", endpoint, message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max).collect();
        cut.push('…');
        cut
    }
}

#[derive(Deserialize)]
struct UserCreated {
    uid: u64,
}

#[derive(Deserialize)]
struct TopicCreated {
    tid: u64,
}

/// Admin API client.
///
/// Endpoints, relative to `{base_url}{base_path}`:
/// `POST /categories`, `POST /users`, `POST /topics`, `PUT /config`, `POST /reset`.
pub struct HttpBackend {
    client: Client,
    admin_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        base_path: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport {
                endpoint: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(HttpBackend {
            client,
            admin_url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                base_path.trim_matches('/')
            ),
            token,
        })
    }

    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<String, BackendError> {
        let url = format!("{}/{}", self.admin_url, endpoint);
        log::debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url).json(body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| BackendError::Transport {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| BackendError::Transport {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(BackendError::Status {
                endpoint: url,
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }

    async fn send_for<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let text = self.send(method, endpoint, body).await?;
        serde_json::from_str(&text).map_err(|e| BackendError::Decode {
            endpoint: format!("{}/{}", self.admin_url, endpoint),
            message: e.to_string(),
        })
    }
}

impl ForumBackend for HttpBackend {
    async fn create_category(&self, spec: &CategorySpec) -> Result<CreatedCategory, BackendError> {
        self.send_for(Method::POST, "categories", spec).await
    }

    async fn create_user(&self, spec: &UserSpec) -> Result<u64, BackendError> {
        let created: UserCreated = self.send_for(Method::POST, "users", spec).await?;
        Ok(created.uid)
    }

    async fn post_topic(&self, topic: &NewTopic<'_>) -> Result<u64, BackendError> {
        let created: TopicCreated = self.send_for(Method::POST, "topics", topic).await?;
        Ok(created.tid)
    }

    async fn set_config(&self, values: &BTreeMap<String, String>) -> Result<(), BackendError> {
        self.send(Method::PUT, "config", values).await.map(|_| ())
    }

    async fn wipe(&self) -> Result<(), BackendError> {
        self.send(Method::POST, "reset", &serde_json::json!({}))
            .await
            .map(|_| ())
    }
}
