use super::{AccountDirectory, PgStore, StoreError};
use crate::models::{Account, AccountSelector, NewAccount};
use async_trait::async_trait;

#[async_trait]
impl AccountDirectory for PgStore {
    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO account (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to create account", e))
    }

    async fn find_account(&self, selector: &AccountSelector) -> Result<Account, StoreError> {
        let query = match selector {
            AccountSelector::ById(id) => sqlx::query_as::<_, Account>(
                r#"
                SELECT id, username, email, password_hash, created_at, updated_at
                FROM account
                WHERE id = $1
                "#,
            )
            .bind(*id),
            AccountSelector::ByUsername(username) => sqlx::query_as::<_, Account>(
                r#"
                SELECT id, username, email, password_hash, created_at, updated_at
                FROM account
                WHERE username = $1
                "#,
            )
            .bind(username.clone()),
            AccountSelector::ByEmail(email) => sqlx::query_as::<_, Account>(
                r#"
                SELECT id, username, email, password_hash, created_at, updated_at
                FROM account
                WHERE email = $1
                "#,
            )
            .bind(email.clone()),
        };

        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx("Failed to fetch account", e))?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_account(&self, account_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx("Failed to delete account", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
