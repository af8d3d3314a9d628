//! Research pipeline web-search infrastructure adapter.
//!
//! Implements the [`pipeline::SearchProvider`] trait over the Tavily search
//! API: a JSON request/response protocol carried over HTTPS.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request formatting and response parsing live here;
//! status-code classification is shared through `provider-http`. The [`pipeline`] crate sees only
//! [`pipeline::SearchProvider`] and [`pipeline::SearchHit`].
//!
//! ## Result records
//!
//! Each Tavily result carries `content` and, usually, `url`. A result whose
//! `url` is missing, empty or not a well-formed locator is kept as a
//! [`pipeline::SearchHit`] without a locator rather than failing the search.

pub mod tavily;

pub use tavily::{TavilyConfig, TavilySearch};
