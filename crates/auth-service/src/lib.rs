//! Account Authentication Service Library
//!
//! Turns raw credentials into verified sessions: registration with email
//! activation, login with access/refresh token pairs, refresh, logout,
//! stateless access-token verification and link-based password reset.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `context` - Per-request context (request id, cancellation)
//! - `crypto` - Password hashing, token codec, link secrets
//! - `errors` - Error taxonomy and transport mapping
//! - `handlers` - HTTP request handlers
//! - `models` - Data models
//! - `notifier` - Outbound mail and the background dispatch pool
//! - `observability` - Metrics and log-correlation helpers
//! - `repositories` - Storage contracts (Postgres and in-memory)
//! - `services` - Credential orchestration and external collaborators

pub mod config;
pub mod context;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
