//! In-memory implementation of every storage contract.
//!
//! All state sits behind one lock, so uniqueness checks and multi-row changes
//! are atomic with respect to each other. Faults can be injected per
//! operation to exercise error paths in the credential service.

use super::{
    AccountDirectory, ActivationLinks, PasswordResetLinks, SessionLedger, StoreError,
};
use crate::models::{
    Account, AccountSelector, ActivationLink, NewAccount, PasswordResetLink, RefreshToken,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

/// A storage operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    AccountCreate,
    AccountLookup,
    SessionInsert,
    SessionLookup,
    SessionDelete,
    ActivationCreate,
    ActivationLookup,
    ActivationUpdate,
    ResetLinkCreate,
    ResetLinkLookup,
    ResetLinkRedeem,
}

#[derive(Default)]
struct State {
    next_id: i64,
    accounts: BTreeMap<i64, Account>,
    sessions: HashMap<String, RefreshToken>,
    activations: BTreeMap<i64, ActivationLink>,
    resets: HashMap<String, PasswordResetLink>,
    faults: HashSet<Fault>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, fault: Fault) -> Result<(), StoreError> {
        if self.faults.contains(&fault) {
            return Err(StoreError::Database(format!("injected fault: {:?}", fault)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `fault`'s operation fail.
    pub async fn inject_fault(&self, fault: Fault) {
        self.state.lock().await.faults.insert(fault);
    }

    pub async fn clear_fault(&self, fault: Fault) {
        self.state.lock().await.faults.remove(&fault);
    }

    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }
}

#[async_trait]
impl AccountDirectory for MemoryStore {
    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let mut state = self.state.lock().await;
        state.check(Fault::AccountCreate)?;

        let taken = state
            .accounts
            .values()
            .any(|a| a.username == account.username || a.email == account.email);
        if taken {
            return Err(StoreError::AlreadyExists);
        }

        let now = Utc::now();
        let created = Account {
            id: state.next_id(),
            username: account.username.clone(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_account(&self, selector: &AccountSelector) -> Result<Account, StoreError> {
        let state = self.state.lock().await;
        state.check(Fault::AccountLookup)?;

        let found = match selector {
            AccountSelector::ById(id) => state.accounts.get(id),
            AccountSelector::ByUsername(username) => {
                state.accounts.values().find(|a| &a.username == username)
            }
            AccountSelector::ByEmail(email) => state.accounts.values().find(|a| &a.email == email),
        };

        found.cloned().ok_or(StoreError::NotFound)
    }

    async fn delete_account(&self, account_id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.accounts.remove(&account_id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.sessions.retain(|_, s| s.account_id != account_id);
        state.activations.retain(|_, a| a.account_id != account_id);
        Ok(())
    }
}

#[async_trait]
impl SessionLedger for MemoryStore {
    async fn insert_session(
        &self,
        account_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError> {
        let mut state = self.state.lock().await;
        state.check(Fault::SessionInsert)?;

        if !state.accounts.contains_key(&account_id) {
            return Err(StoreError::Database(
                "refresh token references a missing account".to_string(),
            ));
        }
        if state.sessions.contains_key(token) {
            return Err(StoreError::AlreadyExists);
        }

        let row = RefreshToken {
            id: state.next_id(),
            account_id,
            token: token.to_string(),
            expires_at,
        };
        state.sessions.insert(row.token.clone(), row.clone());
        Ok(row)
    }

    async fn get_session(&self, token: &str) -> Result<RefreshToken, StoreError> {
        let state = self.state.lock().await;
        state.check(Fault::SessionLookup)?;
        state.sessions.get(token).cloned().ok_or(StoreError::NotFound)
    }

    async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check(Fault::SessionDelete)?;
        state
            .sessions
            .remove(token)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl ActivationLinks for MemoryStore {
    async fn create_activation_link(
        &self,
        account_id: i64,
        link: &str,
    ) -> Result<ActivationLink, StoreError> {
        let mut state = self.state.lock().await;
        state.check(Fault::ActivationCreate)?;

        let duplicate = state
            .activations
            .values()
            .any(|a| a.account_id == account_id || a.link == link);
        if duplicate {
            return Err(StoreError::AlreadyExists);
        }

        let row = ActivationLink {
            id: state.next_id(),
            account_id,
            link: link.to_string(),
            is_activated: false,
        };
        state.activations.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_activation_link(&self, link: &str) -> Result<ActivationLink, StoreError> {
        let state = self.state.lock().await;
        state.check(Fault::ActivationLookup)?;
        state
            .activations
            .values()
            .find(|a| a.link == link)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn activation_for_account(
        &self,
        account_id: i64,
    ) -> Result<ActivationLink, StoreError> {
        let state = self.state.lock().await;
        state.check(Fault::ActivationLookup)?;
        state
            .activations
            .values()
            .find(|a| a.account_id == account_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn mark_activated(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check(Fault::ActivationUpdate)?;
        let row = state.activations.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.is_activated = true;
        Ok(())
    }
}

#[async_trait]
impl PasswordResetLinks for MemoryStore {
    async fn create_reset_link(
        &self,
        email: &str,
        link: &str,
    ) -> Result<PasswordResetLink, StoreError> {
        let mut state = self.state.lock().await;
        state.check(Fault::ResetLinkCreate)?;

        let duplicate =
            state.resets.contains_key(link) || state.resets.values().any(|r| r.email == email);
        if duplicate {
            return Err(StoreError::AlreadyExists);
        }

        let row = PasswordResetLink {
            id: state.next_id(),
            email: email.to_string(),
            link: link.to_string(),
        };
        state.resets.insert(row.link.clone(), row.clone());
        Ok(row)
    }

    async fn reset_link_for_email(&self, email: &str) -> Result<PasswordResetLink, StoreError> {
        let state = self.state.lock().await;
        state.check(Fault::ResetLinkLookup)?;
        state
            .resets
            .values()
            .find(|r| r.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_reset_link(&self, link: &str) -> Result<PasswordResetLink, StoreError> {
        let state = self.state.lock().await;
        state.check(Fault::ResetLinkLookup)?;
        state.resets.get(link).cloned().ok_or(StoreError::NotFound)
    }

    async fn redeem_reset_link(
        &self,
        link: &str,
        password_hash: &str,
    ) -> Result<PasswordResetLink, StoreError> {
        let mut state = self.state.lock().await;
        state.check(Fault::ResetLinkRedeem)?;

        // Validate everything before the first write so a failure changes nothing.
        let consumed = state.resets.get(link).cloned().ok_or(StoreError::NotFound)?;
        let account_id = state
            .accounts
            .values()
            .find(|a| a.email == consumed.email)
            .map(|a| a.id)
            .ok_or(StoreError::NotFound)?;

        if let Some(account) = state.accounts.get_mut(&account_id) {
            account.password_hash = password_hash.to_string();
            account.updated_at = Utc::now();
        }
        state.sessions.retain(|_, s| s.account_id != account_id);
        state.resets.remove(link);

        Ok(consumed)
    }
}
