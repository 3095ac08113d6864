//! # zebrahook-common
//!
//! Shared infrastructure used by every zebrahook binary (API server, fan-out
//! worker, delivery worker):
//! - Database connection pooling (PostgreSQL via sqlx)
//! - Custom error types
//! - Secret encryption, HMAC signing, API-key hashing, id generation
//! - Structured logging setup

pub mod crypto;
pub mod db;
pub mod error;
pub mod ids;
pub mod logging;

pub use db::create_pool;
pub use error::{Error, Result};
pub use ids::generate_endpoint_id;
pub use logging::{init_tracing, init_tracing_json};
