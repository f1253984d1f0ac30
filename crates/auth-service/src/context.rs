//! Explicit per-request context passed into every credential operation.

use crate::errors::AuthError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(request_id: Uuid, cancel: CancellationToken) -> Self {
        Self { request_id, cancel }
    }

    /// A context with a fresh request id that is never cancelled.
    pub fn background() -> Self {
        Self::new(Uuid::new_v4(), CancellationToken::new())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with `Cancelled` once the caller has gone away.
    pub fn ensure_active(&self) -> Result<(), AuthError> {
        if self.cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        Ok(())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}
