//! Favorites repository.

use async_trait::async_trait;
use sqlx::PgPool;

use furnish_core::{ProductId, UserId};

use super::{FavoriteStore, RepositoryError, not_found_on_foreign_key};

/// `PostgreSQL` favorites store.
pub struct PgFavoriteStore {
    pool: PgPool,
}

impl PgFavoriteStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteStore for PgFavoriteStore {
    async fn product_ids(&self, user: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let ids = sqlx::query_scalar(
            r"
            SELECT product_id
            FROM favorites
            WHERE user_id = $1
            ORDER BY created_at DESC, product_id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn toggle(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(user)
            .bind(product)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query(
                r"
                INSERT INTO favorites (user_id, product_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(user)
            .bind(product)
            .execute(&mut *tx)
            .await
            .map_err(not_found_on_foreign_key)?;
        }

        tx.commit().await?;
        Ok(removed == 0)
    }

    async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(user)
            .bind(product)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
