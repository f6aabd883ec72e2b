// src/probe.rs
// Single GET against the forum under test, bounded by a timeout and a cancel token

use crate::shutdown::CancelToken;
use reqwest::{redirect, Client, Url};
use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Captured response. Header names are lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub elapsed: Duration,
}

impl ProbeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    Timeout { after: Duration },
    Cancelled,
    Transport(String),
    InvalidUrl(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Timeout { after } => {
                write!(f, "no response within {} ms", after.as_millis())
            }
            ProbeError::Cancelled => write!(f, "cancelled"),
            ProbeError::Transport(msg) => write!(f, "transport error: {}", msg),
            ProbeError::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

#[allow(async_fn_in_trait)]
pub trait Probe {
    /// Issue exactly one GET. No retries.
    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError>;
}

pub struct HttpProbe {
    client: Client,
    timeout: Duration,
    cancel: CancelToken,
}

impl HttpProbe {
    pub fn new(timeout: Duration, cancel: CancelToken) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::limited(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProbeError::Transport(describe(&e)))?;

        Ok(HttpProbe {
            client,
            timeout,
            cancel,
        })
    }

    async fn fetch(&self, url: Url) -> Result<ProbeResponse, ProbeError> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(ProbeResponse {
            status,
            headers,
            body,
            elapsed: start.elapsed(),
        })
    }

    fn classify(&self, err: reqwest::Error) -> ProbeError {
        if err.is_timeout() {
            ProbeError::Timeout {
                after: self.timeout,
            }
        } else {
            ProbeError::Transport(describe(&err))
        }
    }
}

impl Probe for HttpProbe {
    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        let url = Url::parse(url).map_err(|e| ProbeError::InvalidUrl(format!("{}: {}", url, e)))?;

        if self.cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }

        log::debug!("GET {}", url);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProbeError::Cancelled),
            result = self.fetch(url) => result,
        }
    }
}

/// Error message including its source chain, which reqwest keeps the useful part in.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}
