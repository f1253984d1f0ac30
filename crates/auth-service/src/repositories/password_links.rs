use super::{PasswordResetLinks, PgStore, StoreError};
use crate::models::PasswordResetLink;
use async_trait::async_trait;

#[async_trait]
impl PasswordResetLinks for PgStore {
    async fn create_reset_link(
        &self,
        email: &str,
        link: &str,
    ) -> Result<PasswordResetLink, StoreError> {
        sqlx::query_as::<_, PasswordResetLink>(
            r#"
            INSERT INTO password_link (email, link)
            VALUES ($1, $2)
            RETURNING id, email, link
            "#,
        )
        .bind(email)
        .bind(link)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to create password link", e))
    }

    async fn reset_link_for_email(&self, email: &str) -> Result<PasswordResetLink, StoreError> {
        sqlx::query_as::<_, PasswordResetLink>(
            r#"
            SELECT id, email, link
            FROM password_link
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to fetch password link by email", e))?
        .ok_or(StoreError::NotFound)
    }

    async fn get_reset_link(&self, link: &str) -> Result<PasswordResetLink, StoreError> {
        sqlx::query_as::<_, PasswordResetLink>(
            r#"
            SELECT id, email, link
            FROM password_link
            WHERE link = $1
            "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to fetch password link", e))?
        .ok_or(StoreError::NotFound)
    }

    async fn redeem_reset_link(
        &self,
        link: &str,
        password_hash: &str,
    ) -> Result<PasswordResetLink, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::from_sqlx("Failed to begin transaction", e))?;

        // Deleting first locks the row, so a concurrent redeem of the same
        // link finds nothing once this transaction commits.
        let consumed = sqlx::query_as::<_, PasswordResetLink>(
            r#"
            DELETE FROM password_link
            WHERE link = $1
            RETURNING id, email, link
            "#,
        )
        .bind(link)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to consume password link", e))?
        .ok_or(StoreError::NotFound)?;

        let account_id: i64 = sqlx::query_scalar(
            r#"
            UPDATE account
            SET password_hash = $1, updated_at = NOW()
            WHERE email = $2
            RETURNING id
            "#,
        )
        .bind(password_hash)
        .bind(&consumed.email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to update password", e))?
        .ok_or(StoreError::NotFound)?;

        sqlx::query("DELETE FROM refresh_token WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::from_sqlx("Failed to revoke refresh tokens", e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::from_sqlx("Failed to commit password change", e))?;

        Ok(consumed)
    }
}
