//! Profile service HTTP client.
//!
//! Activation calls the profile service synchronously to create the default
//! profile for the new account. Any failure aborts the activation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Profile service unavailable: {0}")]
    Unavailable(String),

    #[error("Profile service rejected the request with status {0}")]
    Rejected(u16),
}

/// Creates the default profile record for an activated account.
#[async_trait]
pub trait ProfileProvisioner: Send + Sync {
    async fn create_default(&self, account_id: i64) -> Result<(), ProvisionError>;
}

#[derive(Debug, Serialize)]
struct CreateDefaultProfileRequest {
    user_id: i64,
}

/// HTTP client for the profile service.
#[derive(Clone)]
pub struct HttpProfileProvisioner {
    client: Client,
    base_url: String,
}

impl HttpProfileProvisioner {
    /// # Errors
    ///
    /// Returns `ProvisionError::Unavailable` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProvisionError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ProvisionError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProfileProvisioner for HttpProfileProvisioner {
    #[instrument(skip_all, name = "auth.profile.create_default", fields(account_id = account_id))]
    async fn create_default(&self, account_id: i64) -> Result<(), ProvisionError> {
        let url = format!("{}/api/v1/profiles/default", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&CreateDefaultProfileRequest {
                user_id: account_id,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(target: "auth.services.profile_client", error = %e, "Profile service request failed");
                ProvisionError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target: "auth.services.profile_client",
                status = status.as_u16(),
                "Profile service rejected default profile creation"
            );
            return Err(ProvisionError::Rejected(status.as_u16()));
        }

        Ok(())
    }
}

/// Mock provisioner for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    pub struct MockProfileProvisioner {
        call_count: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockProfileProvisioner {
        /// Create a mock that always succeeds.
        pub fn accepting() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }

        /// Create a mock that always fails.
        pub fn failing() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                fail: AtomicBool::new(true),
            }
        }

        /// Switch between succeeding and failing.
        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileProvisioner for MockProfileProvisioner {
        async fn create_default(&self, _account_id: i64) -> Result<(), ProvisionError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProvisionError::Unavailable(
                    "mock profile service down".to_string(),
                ));
            }
            Ok(())
        }
    }
}
