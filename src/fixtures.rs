// src/fixtures.rs
// Seeding of the minimal content graph the route checks depend on

use crate::backend::{BackendError, ForumBackend, NewTopic};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorySpec {
    pub name: String,
    pub description: String,
}

impl Default for CategorySpec {
    fn default() -> Self {
        CategorySpec {
            name: "Test Category".to_string(),
            description: "Test category created by testing script".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSpec {
    pub username: String,
    pub password: String,
}

impl Default for UserSpec {
    fn default() -> Self {
        UserSpec {
            username: "foo".to_string(),
            password: "barbar".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicSpec {
    pub title: String,
    pub content: String,
}

impl Default for TopicSpec {
    fn default() -> Self {
        TopicSpec {
            title: "test topic title".to_string(),
            content: "test topic content".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSpec {
    pub category: CategorySpec,
    pub user: UserSpec,
    pub topic: TopicSpec,
}

/// Identifiers captured while seeding. Valid until teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixtures {
    pub cid: u64,
    pub slug: String,
    pub uid: u64,
    pub username: String,
    pub tid: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStep {
    Category,
    User,
    Topic,
}

impl fmt::Display for SeedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedStep::Category => write!(f, "category"),
            SeedStep::User => write!(f, "user"),
            SeedStep::Topic => write!(f, "topic"),
        }
    }
}

#[derive(Debug)]
pub struct SeedError {
    pub step: SeedStep,
    pub source: BackendError,
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to create fixture {}: {}", self.step, self.source)
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Create the category, then the user, then a topic owned by both.
/// The first failing step aborts the seed; nothing is retried.
pub async fn seed<B: ForumBackend>(backend: &B, spec: &FixtureSpec) -> Result<Fixtures, SeedError> {
    let category = backend
        .create_category(&spec.category)
        .await
        .map_err(|source| SeedError {
            step: SeedStep::Category,
            source,
        })?;
    log::debug!("seeded category cid={}", category.cid);

    let uid = backend
        .create_user(&spec.user)
        .await
        .map_err(|source| SeedError {
            step: SeedStep::User,
            source,
        })?;
    log::debug!("seeded user uid={}", uid);

    let tid = backend
        .post_topic(&NewTopic {
            uid,
            cid: category.cid,
            title: &spec.topic.title,
            content: &spec.topic.content,
        })
        .await
        .map_err(|source| SeedError {
            step: SeedStep::Topic,
            source,
        })?;
    log::debug!("seeded topic tid={}", tid);

    let slug = match category.slug {
        // Forums commonly report "<cid>/<slug>"; keep the last segment only
        Some(ref reported) if !reported.trim_matches('/').is_empty() => reported
            .trim_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
        _ => slugify(&spec.category.name),
    };

    Ok(Fixtures {
        cid: category.cid,
        slug,
        uid,
        username: spec.user.username.clone(),
        tid,
    })
}

/// Lowercase, runs of non-alphanumerics collapsed to a single '-'.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
