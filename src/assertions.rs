// src/assertions.rs
// Compare a captured response against a route expectation

use crate::feed;
use crate::probe::ProbeResponse;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the body of a response must look like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyExpectation {
    #[default]
    NonEmpty,
    Equals(String),
    Matches(String),
    Json,
    Feed,
}

impl fmt::Display for BodyExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyExpectation::NonEmpty => write!(f, "non-empty body"),
            BodyExpectation::Equals(text) => write!(f, "body equal to {:?}", text),
            BodyExpectation::Matches(pattern) => write!(f, "body matching /{}/", pattern),
            BodyExpectation::Json => write!(f, "JSON body"),
            BodyExpectation::Feed => write!(f, "syndication feed"),
        }
    }
}

/// How strictly structured bodies are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyChecks {
    /// JSON must parse, feeds must be well-formed and served as XML.
    #[default]
    Strict,
    /// Every structured expectation only requires a non-empty body.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Mismatch {
    Status { expected: u16, actual: u16 },
    EmptyBody,
    BodyNotEqual { expected: String, actual: String },
    BodyNoMatch { pattern: String, actual: String },
    InvalidPattern { pattern: String, message: String },
    NotJson { message: String },
    ContentType { actual: String },
    MalformedFeed { reason: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Status { expected, actual } => {
                write!(f, "expected status {}, got {}", expected, actual)
            }
            Mismatch::EmptyBody => write!(f, "expected a non-empty body, got an empty one"),
            Mismatch::BodyNotEqual { expected, actual } => {
                write!(f, "expected body {:?}, got {:?}", expected, preview(actual))
            }
            Mismatch::BodyNoMatch { pattern, actual } => {
                write!(f, "expected body matching /{}/, got {:?}", pattern, preview(actual))
            }
            Mismatch::InvalidPattern { pattern, message } => {
                write!(f, "invalid body pattern /{}/: {}", pattern, message)
            }
            Mismatch::NotJson { message } => write!(f, "expected a JSON body: {}", message),
            Mismatch::ContentType { actual } => {
                write!(f, "expected an XML feed content type, got {:?}", actual)
            }
            Mismatch::MalformedFeed { reason } => write!(f, "malformed feed: {}", reason),
        }
    }
}

impl std::error::Error for Mismatch {}

fn preview(body: &str) -> String {
    const MAX: usize = 120;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX).collect();
        cut.push('…');
        cut
    }
}

/// Status first; the body is only looked at once the status matches.
pub fn check(
    expected_status: u16,
    expectation: &BodyExpectation,
    response: &ProbeResponse,
    mode: BodyChecks,
) -> Result<(), Mismatch> {
    if response.status != expected_status {
        return Err(Mismatch::Status {
            expected: expected_status,
            actual: response.status,
        });
    }

    check_body(expectation, response, mode)
}

fn check_body(
    expectation: &BodyExpectation,
    response: &ProbeResponse,
    mode: BodyChecks,
) -> Result<(), Mismatch> {
    let body = response.body.as_str();

    match (expectation, mode) {
        (BodyExpectation::Equals(expected), _) => {
            if body == expected {
                Ok(())
            } else {
                Err(Mismatch::BodyNotEqual {
                    expected: expected.clone(),
                    actual: body.to_string(),
                })
            }
        }
        (BodyExpectation::Matches(pattern), _) => {
            let regex = Regex::new(pattern).map_err(|e| Mismatch::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            if regex.is_match(body) {
                Ok(())
            } else {
                Err(Mismatch::BodyNoMatch {
                    pattern: pattern.clone(),
                    actual: body.to_string(),
                })
            }
        }
        (BodyExpectation::NonEmpty, _) | (_, BodyChecks::Lenient) => non_empty(body),
        (BodyExpectation::Json, BodyChecks::Strict) => {
            non_empty(body)?;
            serde_json::from_str::<serde_json::Value>(body)
                .map(|_| ())
                .map_err(|e| Mismatch::NotJson {
                    message: e.to_string(),
                })
        }
        (BodyExpectation::Feed, BodyChecks::Strict) => {
            non_empty(body)?;
            if let Some(content_type) = response.header("content-type") {
                if !feed::is_feed_content_type(content_type) {
                    return Err(Mismatch::ContentType {
                        actual: content_type.to_string(),
                    });
                }
            }
            feed::check_feed(body)
                .map(|kind| log::debug!("{} feed is well-formed", kind))
                .map_err(|reason| Mismatch::MalformedFeed { reason })
        }
    }
}

fn non_empty(body: &str) -> Result<(), Mismatch> {
    if body.is_empty() {
        Err(Mismatch::EmptyBody)
    } else {
        Ok(())
    }
}
