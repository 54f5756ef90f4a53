//! Integration tests: the aggregation pipeline against mock providers and
//! the HTTP API against an in-process router.

mod aggregation;
mod http_api;
mod mock_provider;
