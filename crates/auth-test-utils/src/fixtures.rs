//! Credential service fixtures.
//!
//! Builds a [`CredentialService`] over [`MemoryStore`] with a
//! [`RecordingMailer`] and a [`MockProfileProvisioner`], so tests can read
//! the links that would have been emailed and count provisioning calls.

use auth_service::context::RequestContext;
use auth_service::crypto::{PasswordHasher, TokenCodec};
use auth_service::models::{AccountSelector, TokenPair};
use auth_service::notifier::mock::RecordingMailer;
use auth_service::notifier::{MailDispatcher, MailTemplates, Notifier};
use auth_service::repositories::{MemoryStore, Stores};
use auth_service::services::profile_client::mock::MockProfileProvisioner;
use auth_service::services::{CredentialService, TokenCodecs};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const TEST_ACCESS_SECRET: &str = "test-access-secret-0123456789abcdef0123";
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdef012";

/// Minimum bcrypt cost; keeps tests fast.
pub const TEST_BCRYPT_COST: u32 = 4;

pub const TEST_ACTIVATION_URL: &str = "https://auth.test/activate/";
pub const TEST_RESET_URL: &str = "https://auth.test/password/";

/// How long fixtures wait for a queued email to reach the mailer.
pub const MAIL_WAIT: Duration = Duration::from_secs(2);

pub struct TestServiceBuilder {
    access_ttl: Duration,
    refresh_ttl: Duration,
    mail_queue_capacity: usize,
    mailer: Arc<RecordingMailer>,
    provisioner: Arc<MockProfileProvisioner>,
}

impl Default for TestServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestServiceBuilder {
    pub fn new() -> Self {
        Self {
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(3600),
            mail_queue_capacity: 64,
            mailer: Arc::new(RecordingMailer::accepting()),
            provisioner: Arc::new(MockProfileProvisioner::accepting()),
        }
    }

    pub fn access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn mail_queue_capacity(mut self, capacity: usize) -> Self {
        self.mail_queue_capacity = capacity;
        self
    }

    /// Every send is recorded and then reported as a transport failure.
    pub fn failing_mailer(mut self) -> Self {
        self.mailer = Arc::new(RecordingMailer::failing());
        self
    }

    pub fn failing_provisioner(mut self) -> Self {
        self.provisioner = Arc::new(MockProfileProvisioner::failing());
        self
    }

    /// Must be called inside a Tokio runtime; the mail workers are spawned
    /// here.
    pub fn build(self) -> TestService {
        let store = Arc::new(MemoryStore::new());
        let cancel = CancellationToken::new();

        let (dispatcher, _workers) = MailDispatcher::spawn(
            self.mailer.clone(),
            self.mail_queue_capacity,
            1,
            cancel.clone(),
        );
        let notifier = Notifier::new(
            dispatcher,
            MailTemplates::new(TEST_ACTIVATION_URL, TEST_RESET_URL),
        );

        let tokens = TokenCodecs {
            access: TokenCodec::new(
                &SecretString::from(TEST_ACCESS_SECRET.to_string()),
                self.access_ttl,
            ),
            refresh: TokenCodec::new(
                &SecretString::from(TEST_REFRESH_SECRET.to_string()),
                self.refresh_ttl,
            ),
        };

        let service = CredentialService::new(
            Stores::shared(store.clone()),
            PasswordHasher::new(TEST_BCRYPT_COST),
            tokens,
            notifier,
            self.provisioner.clone(),
        )
        .expect("test bcrypt cost is valid");

        TestService {
            service: Arc::new(service),
            store,
            mailer: self.mailer,
            provisioner: self.provisioner,
            cancel,
        }
    }
}

/// A credential service and handles to all of its test doubles.
pub struct TestService {
    pub service: Arc<CredentialService>,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub provisioner: Arc<MockProfileProvisioner>,
    /// Stops the mail workers.
    pub cancel: CancellationToken,
}

impl TestService {
    pub fn spawn() -> Self {
        TestServiceBuilder::new().build()
    }

    /// Link token from the newest email to `to` whose body contains
    /// `url_prefix`, waiting up to [`MAIL_WAIT`] for it to be delivered.
    pub async fn link_sent_to(&self, to: &str, url_prefix: &str) -> Option<String> {
        let deadline = tokio::time::Instant::now() + MAIL_WAIT;
        loop {
            let found = self
                .mailer
                .sent()
                .await
                .into_iter()
                .rev()
                .find(|m| m.to == to && m.body.contains(url_prefix))
                .and_then(|m| m.body.rsplit(url_prefix).next().map(str::to_string));

            if found.is_some() || tokio::time::Instant::now() >= deadline {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn activation_link_for(&self, email: &str) -> Option<String> {
        self.link_sent_to(email, TEST_ACTIVATION_URL).await
    }

    pub async fn reset_link_for(&self, email: &str) -> Option<String> {
        self.link_sent_to(email, TEST_RESET_URL).await
    }

    /// Register an account and activate it through the emailed link.
    pub async fn register_and_activate(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), anyhow::Error> {
        let ctx = RequestContext::background();
        self.service.register(&ctx, username, email, password).await?;

        let link = self
            .activation_link_for(email)
            .await
            .ok_or_else(|| anyhow::anyhow!("no activation email sent to {}", email))?;
        self.service.activate_account(&ctx, &link).await?;
        Ok(())
    }

    /// Register, activate and log in by username.
    pub async fn register_and_login(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<TokenPair, anyhow::Error> {
        self.register_and_activate(username, email, password).await?;
        let tokens = self
            .service
            .login(
                &RequestContext::background(),
                AccountSelector::ByUsername(username.to_string()),
                password,
            )
            .await?;
        Ok(tokens)
    }
}
