//! User repository for database operations.
//!
//! Accounts live in `users`; argon2 hashes are kept apart in
//! `user_passwords` so that ordinary user queries never load them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use furnish_core::{Email, UserId};

use super::{RepositoryError, UserStore, conflict_on_unique};
use crate::models::User;

/// Row type for the `users` table.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            phone: row.phone,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// `PostgreSQL` user store.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_with_password(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email, name)
            VALUES ($1, $2)
            RETURNING id, email, name, phone, created_at
            ",
        )
        .bind(email)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        sqlx::query("INSERT INTO user_passwords (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        User::try_from(row)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, phone, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT u.id, u.email, u.name, u.phone, u.created_at, p.password_hash
            FROM users u
            JOIN user_passwords p ON p.user_id = u.id
            WHERE u.email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        phone: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users
            SET name = $2, phone = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, email, name, phone, created_at
            ",
        )
        .bind(id)
        .bind(name)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }
}
