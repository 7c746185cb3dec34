//! Elasticsearch backend: NDJSON `_bulk` writes and `_search` queries over
//! HTTP with basic auth, plus the process-wide connection handle.

mod client;
pub mod config;
pub mod connection;
mod decode;
mod encode;

pub use client::ElasticClient;
pub use config::ElasticConfig;
pub use decode::ClusterInfo;
pub use encode::{bulk_body, query_dsl};
