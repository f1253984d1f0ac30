use super::{PgStore, SessionLedger, StoreError};
use crate::models::RefreshToken;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl SessionLedger for PgStore {
    async fn insert_session(
        &self,
        account_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_token (account_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, token, expires_at
            "#,
        )
        .bind(account_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to insert refresh token", e))
    }

    async fn get_session(&self, token: &str) -> Result<RefreshToken, StoreError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, account_id, token, expires_at
            FROM refresh_token
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to fetch refresh token", e))?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx("Failed to delete refresh token", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
