//! Saved card repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use furnish_core::{AddressId, CardNetwork, PaymentMethodId, UserId};

use super::defaults::{self, DefaultTable};
use super::{PaymentMethodStore, RepositoryError};
use crate::models::{PaymentMethod, PaymentMethodDraft};

/// Row type for the `payment_methods` table. The `cvv` column only ever holds
/// the mask and is never read back.
#[derive(Debug, sqlx::FromRow)]
struct PaymentMethodRow {
    id: PaymentMethodId,
    user_id: UserId,
    card_holder_name: String,
    last4: String,
    expiry_date: String,
    network: CardNetwork,
    billing_address_id: Option<AddressId>,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentMethodRow> for PaymentMethod {
    type Error = RepositoryError;

    fn try_from(row: PaymentMethodRow) -> Result<Self, Self::Error> {
        if row.last4.len() != 4 || !row.last4.chars().all(|c| c.is_ascii_digit()) {
            return Err(RepositoryError::DataCorruption(format!(
                "invalid last4 for payment method {}",
                row.id
            )));
        }

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            card_holder_name: row.card_holder_name,
            masked_number: Self::masked(&row.last4),
            last4: row.last4,
            expiry_date: row.expiry_date,
            network: row.network,
            billing_address_id: row.billing_address_id,
            is_default: row.is_default,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL` payment method store.
pub struct PgPaymentMethodStore {
    pool: PgPool,
}

impl PgPaymentMethodStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentMethodStore for PgPaymentMethodStore {
    async fn list(&self, user: UserId) -> Result<Vec<PaymentMethod>, RepositoryError> {
        let rows = sqlx::query_as::<_, PaymentMethodRow>(
            r"
            SELECT id, user_id, card_holder_name, last4, expiry_date, network,
                   billing_address_id, is_default, created_at
            FROM payment_methods
            WHERE user_id = $1
            ORDER BY id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PaymentMethod::try_from).collect()
    }

    async fn get(
        &self,
        user: UserId,
        id: PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentMethodRow>(
            r"
            SELECT id, user_id, card_holder_name, last4, expiry_date, network,
                   billing_address_id, is_default, created_at
            FROM payment_methods
            WHERE user_id = $1 AND id = $2
            ",
        )
        .bind(user)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentMethod::try_from).transpose()
    }

    async fn insert(
        &self,
        user: UserId,
        draft: &PaymentMethodDraft,
    ) -> Result<PaymentMethod, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let is_default =
            defaults::prepare_insert(&mut tx, DefaultTable::PaymentMethods, user, draft.is_default)
                .await?;

        let row = sqlx::query_as::<_, PaymentMethodRow>(
            r"
            INSERT INTO payment_methods (
                user_id, card_holder_name, last4, expiry_date, network, cvv,
                billing_address_id, is_default
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, card_holder_name, last4, expiry_date, network,
                      billing_address_id, is_default, created_at
            ",
        )
        .bind(user)
        .bind(&draft.card_holder_name)
        .bind(&draft.last4)
        .bind(&draft.expiry_date)
        .bind(draft.network)
        .bind(draft.cvv)
        .bind(draft.billing_address_id)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        PaymentMethod::try_from(row)
    }

    async fn update(
        &self,
        user: UserId,
        id: PaymentMethodId,
        draft: &PaymentMethodDraft,
    ) -> Result<PaymentMethod, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let is_default = defaults::prepare_update(
            &mut tx,
            DefaultTable::PaymentMethods,
            user,
            id.as_i32(),
            draft.is_default,
        )
        .await?;

        let row = sqlx::query_as::<_, PaymentMethodRow>(
            r"
            UPDATE payment_methods
            SET card_holder_name = $3, last4 = $4, expiry_date = $5, network = $6, cvv = $7,
                billing_address_id = $8, is_default = $9, updated_at = now()
            WHERE user_id = $1 AND id = $2
            RETURNING id, user_id, card_holder_name, last4, expiry_date, network,
                      billing_address_id, is_default, created_at
            ",
        )
        .bind(user)
        .bind(id)
        .bind(&draft.card_holder_name)
        .bind(&draft.last4)
        .bind(&draft.expiry_date)
        .bind(draft.network)
        .bind(draft.cvv)
        .bind(draft.billing_address_id)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        PaymentMethod::try_from(row)
    }

    async fn delete(&self, user: UserId, id: PaymentMethodId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        defaults::delete_and_promote(&mut tx, DefaultTable::PaymentMethods, user, id.as_i32())
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_default(&self, user: UserId, id: PaymentMethodId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        defaults::set_default(&mut tx, DefaultTable::PaymentMethods, user, id.as_i32()).await?;
        tx.commit().await?;
        Ok(())
    }
}
