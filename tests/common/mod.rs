//! Common test utilities for routeprobe integration tests
//!
//! A mock forum to run the checker against, a plain HTTP client for
//! inspecting it, and a wrapper around the compiled binary.

#![allow(dead_code)] // Test utilities will be used by integration tests
#![allow(unused_imports)] // Some re-exports may not be used in all test modules

pub mod cli;
pub mod client;
pub mod forum;

pub use cli::{stdout_of, CliRun};
pub use client::TestClient;
pub use forum::{ForumBehaviour, MockForum};

pub use serde_json::json;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_forum_serves_ping() {
        let forum = MockForum::start();
        let client = TestClient::new();

        let (status, body) = client.fetch(&forum.url_for("/ping")).await.unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, "200");
        assert_eq!(forum.state().requests, vec!["GET /ping"]);
    }

    #[tokio::test]
    async fn test_mock_forum_admin_seeding() {
        let forum = MockForum::start();
        let client = TestClient::new();

        let category: serde_json::Value = client
            .post_json(
                &forum.url_for("/api/admin/categories"),
                &json!({ "name": "Test Category", "description": "d" }),
            )
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(category["slug"], "1/test-category");

        let (status, _) = client
            .fetch(&forum.url_for("/category/1.rss"))
            .await
            .unwrap();
        assert_eq!(status, 200);
    }
}
