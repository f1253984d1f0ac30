use super::{ActivationLinks, PgStore, StoreError};
use crate::models::ActivationLink;
use async_trait::async_trait;

#[async_trait]
impl ActivationLinks for PgStore {
    async fn create_activation_link(
        &self,
        account_id: i64,
        link: &str,
    ) -> Result<ActivationLink, StoreError> {
        sqlx::query_as::<_, ActivationLink>(
            r#"
            INSERT INTO activation_link (account_id, link, is_activated)
            VALUES ($1, $2, FALSE)
            RETURNING id, account_id, link, is_activated
            "#,
        )
        .bind(account_id)
        .bind(link)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to create activation link", e))
    }

    async fn get_activation_link(&self, link: &str) -> Result<ActivationLink, StoreError> {
        sqlx::query_as::<_, ActivationLink>(
            r#"
            SELECT id, account_id, link, is_activated
            FROM activation_link
            WHERE link = $1
            "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to fetch activation link", e))?
        .ok_or(StoreError::NotFound)
    }

    async fn activation_for_account(
        &self,
        account_id: i64,
    ) -> Result<ActivationLink, StoreError> {
        sqlx::query_as::<_, ActivationLink>(
            r#"
            SELECT id, account_id, link, is_activated
            FROM activation_link
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("Failed to fetch activation state", e))?
        .ok_or(StoreError::NotFound)
    }

    async fn mark_activated(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE activation_link SET is_activated = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx("Failed to activate link", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::NewAccount;
    use crate::repositories::AccountDirectory;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_activation_flag_flips(pool: PgPool) {
        let store = PgStore::new(pool);
        let account = store
            .create_account(&NewAccount {
                username: "alice".to_string(),
                email: "alice@x.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();

        let link = store
            .create_activation_link(account.id, "link-token")
            .await
            .unwrap();
        assert!(!link.is_activated);

        store.mark_activated(link.id).await.unwrap();

        let by_link = store.get_activation_link("link-token").await.unwrap();
        assert!(by_link.is_activated);
        let by_account = store.activation_for_account(account.id).await.unwrap();
        assert_eq!(by_account.id, link.id);
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_unknown_link(pool: PgPool) {
        let store = PgStore::new(pool);
        assert!(matches!(
            store.get_activation_link("missing").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.mark_activated(12345).await,
            Err(StoreError::NotFound)
        ));
    }
}
