//! HTTP route conformance checker for a forum server.
//!
//! Seeds a category, a user and a topic through the forum's admin API, then
//! issues one GET per route in a fixed table and compares status and body
//! against what the route is expected to return. Everything it created is
//! removed again at the end of the run.

pub mod assertions;
pub mod backend;
pub mod config;
pub mod feed;
pub mod fixtures;
pub mod logger;
pub mod mutator;
pub mod network;
pub mod probe;
pub mod report;
pub mod routes;
pub mod runner;
pub mod shutdown;

pub use config::{ConfigError, ConfigLoader, Configuration};
pub use report::{exit_code, SuiteReport};
pub use routes::{RouteExpectation, RouteTable};
pub use runner::{CaseOutcome, Suite, SuiteRun};
