pub mod credential_service;
pub mod profile_client;
pub mod validation;

pub use credential_service::{CredentialService, TokenCodecs};
pub use profile_client::{HttpProfileProvisioner, ProfileProvisioner, ProvisionError};
