// src/routes.rs
// Route table: what to request, in which configuration state, and what to expect back

use crate::assertions::BodyExpectation;
use crate::fixtures::Fixtures;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Runtime configuration a case requires. Empty string means "server default".
pub type ConfigOverrides = BTreeMap<String, String>;

pub const HOME_PAGE_ROUTE: &str = "homePageRoute";
pub const TERMS_OF_USE: &str = "termsOfUse";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteExpectation {
    pub name: String,
    pub path: String,
    pub status: u16,

    #[serde(default)]
    pub body: BodyExpectation,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub given: ConfigOverrides,
}

impl RouteExpectation {
    pub fn new(name: &str, path: &str, status: u16) -> Self {
        RouteExpectation {
            name: name.to_string(),
            path: path.to_string(),
            status,
            body: BodyExpectation::NonEmpty,
            given: ConfigOverrides::new(),
        }
    }

    pub fn body(mut self, body: BodyExpectation) -> Self {
        self.body = body;
        self
    }

    pub fn given(mut self, key: &str, value: &str) -> Self {
        self.given.insert(key.to_string(), value.to_string());
        self
    }

    fn feed(name: &str, path: &str) -> Self {
        Self::new(name, path, 200).body(BodyExpectation::Feed)
    }
}

/// A route expectation with every placeholder filled in from the seeded fixtures.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCase {
    pub name: String,
    pub path: String,
    pub status: u16,
    pub body: BodyExpectation,
    pub given: ConfigOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    pub template: String,
    pub placeholder: String,
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown placeholder ':{}' in '{}' (known: :cid, :slug, :uid, :username, :tid)",
            self.placeholder, self.template
        )
    }
}

impl std::error::Error for TemplateError {}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteExpectation>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteExpectation>) -> Self {
        Self { routes }
    }

    /// The forum's public surface, in the order the checks must run.
    pub fn standard() -> Self {
        let routes = vec![
            RouteExpectation::new("should load default home route", "/", 200)
                .given(HOME_PAGE_ROUTE, ""),
            RouteExpectation::new("should load unread as home route", "/", 200)
                .given(HOME_PAGE_ROUTE, "unread"),
            RouteExpectation::new("should load recent as home route", "/", 200)
                .given(HOME_PAGE_ROUTE, "recent"),
            RouteExpectation::new("should load popular as home route", "/", 200)
                .given(HOME_PAGE_ROUTE, "popular"),
            RouteExpectation::new("should load category as home route", "/", 200)
                .given(HOME_PAGE_ROUTE, "category/:cid/:slug"),
            RouteExpectation::new("should load /reset without code", "/reset", 200),
            RouteExpectation::new("should load /reset with invalid code", "/reset/123123", 200),
            RouteExpectation::new("should load /login", "/login", 200),
            RouteExpectation::new("should load /register", "/register", 200),
            RouteExpectation::new("should load /robots.txt", "/robots.txt", 200),
            RouteExpectation::new("should load /manifest.json", "/manifest.json", 200)
                .body(BodyExpectation::Json),
            RouteExpectation::new(
                "should load /outgoing?url=<url>",
                "/outgoing?url=http//youtube.com",
                200,
            ),
            RouteExpectation::new("should 404 on /outgoing with no url", "/outgoing", 404),
            RouteExpectation::new("should load /tos", "/tos", 200)
                .given(TERMS_OF_USE, "please accept our tos"),
            RouteExpectation::new("should 404 on /tos if terms of use are empty", "/tos", 404)
                .given(TERMS_OF_USE, ""),
            RouteExpectation::new("should load /sping", "/sping", 200)
                .body(BodyExpectation::Equals("healthy".to_string())),
            RouteExpectation::new("should load /ping", "/ping", 200)
                .body(BodyExpectation::Equals("200".to_string())),
            RouteExpectation::new("should handle 404", "/arouteinthevoid", 404),
            RouteExpectation::feed("should load topic rss feed", "/topic/:tid.rss"),
            RouteExpectation::feed("should load category rss feed", "/category/:cid.rss"),
            RouteExpectation::feed("should load recent rss feed", "/recent.rss"),
            RouteExpectation::feed("should load popular rss feed", "/popular.rss"),
            RouteExpectation::feed("should load popular rss feed with term", "/popular/day.rss"),
            RouteExpectation::feed("should load recent posts rss feed", "/recentposts.rss"),
            RouteExpectation::feed(
                "should load category recent posts rss feed",
                "/category/:cid/recentposts.rss",
            ),
            RouteExpectation::feed(
                "should load user topics rss feed",
                "/user/:username/topics.rss",
            ),
        ];

        Self { routes }
    }

    /// Append cases after the existing ones, keeping their order.
    pub fn with_extra(mut self, extra: Vec<RouteExpectation>) -> Self {
        self.routes.extend(extra);
        self
    }

    /// Keep only cases whose name or path contains `needle`. Order is preserved.
    pub fn filter(mut self, needle: &str) -> Self {
        self.routes
            .retain(|route| route.name.contains(needle) || route.path.contains(needle));
        self
    }

    pub fn routes(&self) -> &[RouteExpectation] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Reject unknown placeholders before anything touches the network.
    pub fn check_templates(&self) -> Result<(), TemplateError> {
        let probe = Fixtures {
            cid: 0,
            slug: String::new(),
            uid: 0,
            username: String::new(),
            tid: 0,
        };
        self.resolve(&probe).map(|_| ())
    }

    pub fn resolve(&self, fixtures: &Fixtures) -> Result<Vec<ResolvedCase>, TemplateError> {
        self.routes
            .iter()
            .map(|route| {
                let path = interpolate(&route.path, fixtures, true)?;
                let given = route
                    .given
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), interpolate(value, fixtures, false)?)))
                    .collect::<Result<ConfigOverrides, TemplateError>>()?;

                Ok(ResolvedCase {
                    name: route.name.clone(),
                    path,
                    status: route.status,
                    body: route.body.clone(),
                    given,
                })
            })
            .collect()
    }
}

fn placeholder_value(name: &str, fixtures: &Fixtures) -> Option<String> {
    match name {
        "cid" => Some(fixtures.cid.to_string()),
        "slug" => Some(fixtures.slug.clone()),
        "uid" => Some(fixtures.uid.to_string()),
        "username" => Some(fixtures.username.clone()),
        "tid" => Some(fixtures.tid.to_string()),
        _ => None,
    }
}

/// Replace `:name` placeholders. A name starts with an ASCII letter or '_';
/// any other ':' is literal, so `host:8080` passes through unchanged.
pub fn interpolate(template: &str, fixtures: &Fixtures, encode: bool) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != ':' {
            result.push(ch);
            continue;
        }

        let starts_name = matches!(chars.peek(), Some(c) if c.is_ascii_alphabetic() || *c == '_');
        if !starts_name {
            result.push(':');
            continue;
        }

        let mut name = String::new();
        while let Some(&next_ch) = chars.peek() {
            if next_ch.is_ascii_alphanumeric() || next_ch == '_' {
                name.push(next_ch);
                chars.next();
            } else {
                break;
            }
        }

        let value = placeholder_value(&name, fixtures).ok_or_else(|| TemplateError {
            template: template.to_string(),
            placeholder: name.clone(),
        })?;

        if encode {
            result.push_str(&urlencoding::encode(&value));
        } else {
            result.push_str(&value);
        }
    }

    Ok(result)
}
