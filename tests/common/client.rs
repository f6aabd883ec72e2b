//! HTTP client testing utilities
//!
//! Direct access to the mock forum, for checking what state a run left behind.

use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;

/// HTTP testing client wrapper
pub struct TestClient {
    pub client: Client,
}

impl TestClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        TestClient { client }
    }

    pub async fn get(&self, url: &str) -> Result<Response, Box<dyn std::error::Error>> {
        let response = self.client.get(url).send().await?;
        Ok(response)
    }

    /// Status and body of a GET
    pub async fn fetch(&self, url: &str) -> Result<(u16, String), Box<dyn std::error::Error>> {
        let response = self.get(url).await?;
        let status = response.status().as_u16();
        Ok((status, response.text().await?))
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let response = self.client.post(url).json(body).send().await?;
        Ok(response)
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
