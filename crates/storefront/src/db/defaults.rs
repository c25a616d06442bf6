//! Single-default maintenance shared by addresses and payment methods.
//!
//! Both tables carry a per-user `is_default` flag backed by a partial unique
//! index `(user_id) WHERE is_default`. Each mutation runs in one transaction
//! that first locks the owner's `users` row, so concurrent changes for the
//! same user are serialized and the flag only ever moves, never duplicates.

use std::collections::BTreeMap;

use sqlx::PgConnection;

use furnish_core::UserId;

use super::RepositoryError;

/// A table with a per-user default flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DefaultTable {
    Addresses,
    PaymentMethods,
}

impl DefaultTable {
    const fn name(self) -> &'static str {
        match self {
            Self::Addresses => "addresses",
            Self::PaymentMethods => "payment_methods",
        }
    }
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// Lock the owner's row for the rest of the transaction.
///
/// Returns `NotFound` if the user does not exist.
pub(crate) async fn lock_owner(conn: &mut PgConnection, user: UserId) -> Result<(), RepositoryError> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user)
        .fetch_optional(&mut *conn)
        .await?
        .map(|_| ())
        .ok_or(RepositoryError::NotFound)
}

/// Whether the user currently has a default record.
pub(crate) async fn has_default(
    conn: &mut PgConnection,
    table: DefaultTable,
    user: UserId,
) -> Result<bool, RepositoryError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND is_default)",
        table.name()
    );
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(user)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// Read the default flag of one record, or `None` if the user does not own it.
pub(crate) async fn current_flag(
    conn: &mut PgConnection,
    table: DefaultTable,
    user: UserId,
    id: i32,
) -> Result<Option<bool>, RepositoryError> {
    let sql = format!(
        "SELECT is_default FROM {} WHERE user_id = $1 AND id = $2",
        table.name()
    );
    let flag: Option<bool> = sqlx::query_scalar(&sql)
        .bind(user)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(flag)
}

/// Clear the flag on every record of the user except `keep`.
pub(crate) async fn clear_defaults(
    conn: &mut PgConnection,
    table: DefaultTable,
    user: UserId,
    keep: Option<i32>,
) -> Result<(), RepositoryError> {
    let sql = format!(
        "UPDATE {} SET is_default = FALSE, updated_at = now() \
         WHERE user_id = $1 AND is_default AND id IS DISTINCT FROM $2",
        table.name()
    );
    sqlx::query(&sql)
        .bind(user)
        .bind(keep)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Make `id` the user's only default.
///
/// Returns `NotFound` without changing anything if the user does not own `id`.
pub(crate) async fn set_default(
    conn: &mut PgConnection,
    table: DefaultTable,
    user: UserId,
    id: i32,
) -> Result<(), RepositoryError> {
    lock_owner(conn, user).await?;
    if current_flag(conn, table, user, id).await?.is_none() {
        return Err(RepositoryError::NotFound);
    }

    clear_defaults(conn, table, user, Some(id)).await?;
    let sql = format!(
        "UPDATE {} SET is_default = TRUE, updated_at = now() WHERE user_id = $1 AND id = $2",
        table.name()
    );
    sqlx::query(&sql)
        .bind(user)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete a record and promote the lowest-id survivor if it was the default.
pub(crate) async fn delete_and_promote(
    conn: &mut PgConnection,
    table: DefaultTable,
    user: UserId,
    id: i32,
) -> Result<(), RepositoryError> {
    lock_owner(conn, user).await?;

    let sql = format!(
        "DELETE FROM {} WHERE user_id = $1 AND id = $2 RETURNING is_default",
        table.name()
    );
    let was_default: bool = sqlx::query_scalar(&sql)
        .bind(user)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    if was_default {
        let sql = format!(
            "UPDATE {0} SET is_default = TRUE, updated_at = now() \
             WHERE id = (SELECT id FROM {0} WHERE user_id = $1 ORDER BY id LIMIT 1)",
            table.name()
        );
        sqlx::query(&sql).bind(user).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Decide the stored flag for a new record and clear the others if needed.
///
/// A record becomes the default when asked to, or when the user has none.
pub(crate) async fn prepare_insert(
    conn: &mut PgConnection,
    table: DefaultTable,
    user: UserId,
    wants_default: bool,
) -> Result<bool, RepositoryError> {
    lock_owner(conn, user).await?;
    let make_default = wants_default || !has_default(conn, table, user).await?;
    if make_default {
        clear_defaults(conn, table, user, None).await?;
    }
    Ok(make_default)
}

/// Decide the stored flag for an edited record and clear the others if needed.
///
/// The current default keeps its flag even when the edit clears it.
pub(crate) async fn prepare_update(
    conn: &mut PgConnection,
    table: DefaultTable,
    user: UserId,
    id: i32,
    wants_default: bool,
) -> Result<bool, RepositoryError> {
    lock_owner(conn, user).await?;
    let is_default = current_flag(conn, table, user, id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    if wants_default && !is_default {
        clear_defaults(conn, table, user, Some(id)).await?;
    }
    Ok(is_default || wants_default)
}

// =============================================================================
// In-memory
// =============================================================================

/// A record with an owner and a default flag.
pub(crate) trait Defaultable {
    fn owner(&self) -> UserId;
    fn is_default(&self) -> bool;
    fn set_default(&mut self, on: bool);
}

pub(crate) fn has_default_in<K, T: Defaultable>(rows: &BTreeMap<K, T>, user: UserId) -> bool {
    rows.values().any(|r| r.owner() == user && r.is_default())
}

/// Make `target` the user's only default. Returns `false` if not owned.
pub(crate) fn set_default_in<K: Ord + Copy, T: Defaultable>(
    rows: &mut BTreeMap<K, T>,
    user: UserId,
    target: K,
) -> bool {
    if !rows.get(&target).is_some_and(|r| r.owner() == user) {
        return false;
    }
    for (key, row) in rows.iter_mut().filter(|(_, r)| r.owner() == user) {
        row.set_default(*key == target);
    }
    true
}

/// Flag the lowest-keyed record of the user, if any.
pub(crate) fn promote_first_in<K, T: Defaultable>(rows: &mut BTreeMap<K, T>, user: UserId) {
    if let Some(first) = rows.values_mut().find(|r| r.owner() == user) {
        first.set_default(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        owner: UserId,
        default: bool,
    }

    impl Defaultable for Row {
        fn owner(&self) -> UserId {
            self.owner
        }
        fn is_default(&self) -> bool {
            self.default
        }
        fn set_default(&mut self, on: bool) {
            self.default = on;
        }
    }

    fn rows() -> BTreeMap<i32, Row> {
        let alice = UserId::new(1);
        let bob = UserId::new(2);
        BTreeMap::from([
            (1, Row { owner: alice, default: true }),
            (2, Row { owner: alice, default: false }),
            (3, Row { owner: bob, default: true }),
            (4, Row { owner: alice, default: false }),
        ])
    }

    fn defaults_of(rows: &BTreeMap<i32, Row>, user: UserId) -> Vec<i32> {
        rows.iter()
            .filter(|(_, r)| r.owner == user && r.default)
            .map(|(k, _)| *k)
            .collect()
    }

    #[test]
    fn test_set_default_leaves_exactly_one() {
        let mut rows = rows();
        assert!(set_default_in(&mut rows, UserId::new(1), 4));
        assert_eq!(defaults_of(&rows, UserId::new(1)), vec![4]);
        // Other users are untouched.
        assert_eq!(defaults_of(&rows, UserId::new(2)), vec![3]);
    }

    #[test]
    fn test_set_default_rejects_foreign_record() {
        let mut rows = rows();
        assert!(!set_default_in(&mut rows, UserId::new(1), 3));
        assert_eq!(defaults_of(&rows, UserId::new(1)), vec![1]);
    }

    #[test]
    fn test_promote_first_picks_lowest_key() {
        let mut rows = rows();
        rows.remove(&1);
        assert!(!has_default_in(&rows, UserId::new(1)));
        promote_first_in(&mut rows, UserId::new(1));
        assert_eq!(defaults_of(&rows, UserId::new(1)), vec![2]);
    }
}
