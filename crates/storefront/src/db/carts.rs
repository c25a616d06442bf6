//! Cart repository.

use async_trait::async_trait;
use sqlx::PgPool;

use furnish_core::{ProductId, UserId};

use super::{CartStore, RepositoryError, db_quantity, model_quantity, not_found_on_foreign_key};
use crate::models::CartLine;

/// `PostgreSQL` cart store. One row per `(user, product)`.
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn lines(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows: Vec<(ProductId, i32)> = sqlx::query_as(
            r"
            SELECT product_id, quantity
            FROM cart_items
            WHERE user_id = $1
            ORDER BY added_at, product_id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(product_id, quantity)| {
                Ok(CartLine {
                    product_id,
                    quantity: model_quantity(quantity)?,
                })
            })
            .collect()
    }

    async fn add(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            ",
        )
        .bind(user)
        .bind(product)
        .bind(db_quantity(quantity)?)
        .execute(&self.pool)
        .await
        .map_err(not_found_on_foreign_key)?;
        Ok(())
    }

    async fn set_quantity(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        if quantity == 0 {
            return self.remove(user, product).await;
        }

        sqlx::query(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity
            ",
        )
        .bind(user)
        .bind(product)
        .bind(db_quantity(quantity)?)
        .execute(&self.pool)
        .await
        .map_err(not_found_on_foreign_key)?;
        Ok(())
    }

    async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user)
            .bind(product)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
