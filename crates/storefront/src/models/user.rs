//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use furnish_core::{Email, UserId};

/// A shop customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}
