/// User profile model
///
/// Profiles live in the `users` table and share their ID with the account
/// held by the remote auth service. The role is chosen at signup and never
/// changes afterwards.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY REFERENCES auth.users(id),
///     email TEXT NOT NULL,
///     username TEXT NOT NULL,
///     role TEXT NOT NULL CHECK (role IN ('host', 'tenant')),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role a user signs up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Owns exactly one house and manages its chores and tenants
    Host,

    /// Joins a house owned by a host
    Tenant,
}

impl UserRole {
    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Host => "host",
            UserRole::Tenant => "tenant",
        }
    }

    /// Parses a role from its stored string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "host" => Some(UserRole::Host),
            "tenant" => Some(UserRole::Tenant),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Same ID as the auth account
    pub id: Uuid,

    /// Email address used to sign in
    pub email: String,

    /// Display name
    pub username: String,

    /// Host or tenant, fixed at signup
    pub role: UserRole,

    /// When the profile was created
    pub created_at: DateTime<Utc>,

    /// When the profile was last updated
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_host(&self) -> bool {
        self.role == UserRole::Host
    }

    pub fn is_tenant(&self) -> bool {
        self.role == UserRole::Tenant
    }

    /// Reduces the profile to the fields attached to chore listings
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Input for creating a profile row right after the auth account exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Auth account ID
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Display name
    pub username: String,

    /// Chosen role
    pub role: UserRole,
}

/// The slice of a profile shown next to a chore (assignee / creator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}
