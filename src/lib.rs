//! NEWSDESK: multi-source market news aggregation and ranking.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod config;
pub mod feed;
pub mod providers;
pub mod ranking;
pub mod sentiment;
pub mod server;
pub mod types;
