//! # Auth Test Utilities
//!
//! Shared test utilities for the auth service.
//!
//! This crate provides:
//! - `TestServiceBuilder` / `TestService`: a credential service over the
//!   in-memory store with a recording mailer and a counting provisioner
//! - `TestAuthServer`: the real router served on a random local port
//! - `TokenAssertions`: expressive checks on issued JWTs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestAuthServer::spawn().await?;
//!     let tokens = server.fixture().register_and_login("alice", "alice@x.com", "pw12345678").await?;
//!     tokens.access_token.assert_valid_jwt().assert_for_username("alice");
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod server_harness;

pub use assertions::*;
pub use fixtures::*;
pub use server_harness::*;
