//! Address book repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use furnish_core::{AddressId, Postcode, UserId};

use super::defaults::{self, DefaultTable};
use super::{AddressStore, RepositoryError};
use crate::models::{Address, AddressDraft, AddressLabel};

/// Row type for the `addresses` table.
#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    user_id: UserId,
    full_name: String,
    phone_number: String,
    address_line1: String,
    address_line2: Option<String>,
    town: String,
    county: Option<String>,
    postcode: String,
    country: String,
    is_default: bool,
    label: AddressLabel,
    created_at: DateTime<Utc>,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        let postcode = Postcode::parse(&row.postcode).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid postcode in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            phone_number: row.phone_number,
            address_line1: row.address_line1,
            address_line2: row.address_line2,
            town: row.town,
            county: row.county,
            postcode,
            country: row.country,
            is_default: row.is_default,
            label: row.label,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL` address store.
pub struct PgAddressStore {
    pool: PgPool,
}

impl PgAddressStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressStore for PgAddressStore {
    async fn list(&self, user: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, full_name, phone_number, address_line1, address_line2,
                   town, county, postcode, country, is_default, label, created_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Address::try_from).collect()
    }

    async fn get(&self, user: UserId, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, full_name, phone_number, address_line1, address_line2,
                   town, county, postcode, country, is_default, label, created_at
            FROM addresses
            WHERE user_id = $1 AND id = $2
            ",
        )
        .bind(user)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Address::try_from).transpose()
    }

    async fn insert(&self, user: UserId, draft: &AddressDraft) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let is_default =
            defaults::prepare_insert(&mut tx, DefaultTable::Addresses, user, draft.is_default)
                .await?;

        let row = sqlx::query_as::<_, AddressRow>(
            r"
            INSERT INTO addresses (
                user_id, full_name, phone_number, address_line1, address_line2,
                town, county, postcode, country, is_default, label
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, user_id, full_name, phone_number, address_line1, address_line2,
                      town, county, postcode, country, is_default, label, created_at
            ",
        )
        .bind(user)
        .bind(&draft.full_name)
        .bind(&draft.phone_number)
        .bind(&draft.address_line1)
        .bind(&draft.address_line2)
        .bind(&draft.town)
        .bind(&draft.county)
        .bind(draft.postcode.as_str())
        .bind(&draft.country)
        .bind(is_default)
        .bind(draft.label)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Address::try_from(row)
    }

    async fn update(
        &self,
        user: UserId,
        id: AddressId,
        draft: &AddressDraft,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let is_default = defaults::prepare_update(
            &mut tx,
            DefaultTable::Addresses,
            user,
            id.as_i32(),
            draft.is_default,
        )
        .await?;

        let row = sqlx::query_as::<_, AddressRow>(
            r"
            UPDATE addresses
            SET full_name = $3, phone_number = $4, address_line1 = $5, address_line2 = $6,
                town = $7, county = $8, postcode = $9, country = $10, is_default = $11,
                label = $12, updated_at = now()
            WHERE user_id = $1 AND id = $2
            RETURNING id, user_id, full_name, phone_number, address_line1, address_line2,
                      town, county, postcode, country, is_default, label, created_at
            ",
        )
        .bind(user)
        .bind(id)
        .bind(&draft.full_name)
        .bind(&draft.phone_number)
        .bind(&draft.address_line1)
        .bind(&draft.address_line2)
        .bind(&draft.town)
        .bind(&draft.county)
        .bind(draft.postcode.as_str())
        .bind(&draft.country)
        .bind(is_default)
        .bind(draft.label)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Address::try_from(row)
    }

    async fn delete(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        defaults::delete_and_promote(&mut tx, DefaultTable::Addresses, user, id.as_i32()).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_default(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        defaults::set_default(&mut tx, DefaultTable::Addresses, user, id.as_i32()).await?;
        tx.commit().await?;
        Ok(())
    }
}
