/// House model
///
/// A house is created by a host and joined by tenants. The host's own
/// membership is implicit through `host_id`; tenants are linked through the
/// `house_members` table (see [`crate::models::membership`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE houses (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL,
///     description TEXT,
///     max_tenants INTEGER NOT NULL,
///     host_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// House row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    /// Unique house ID
    pub id: Uuid,

    /// House name shown to tenants looking for a house
    pub name: String,

    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Upper bound on tenant members (the host is not counted)
    pub max_tenants: i64,

    /// Owner of the house
    pub host_id: Uuid,

    /// When the house was created
    pub created_at: DateTime<Utc>,

    /// When the house was last updated
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl House {
    /// Checks whether a user owns this house
    pub fn is_host(&self, user_id: Uuid) -> bool {
        self.host_id == user_id
    }

    /// Checks whether another tenant fits given the current member count
    pub fn has_room_for(&self, current_tenant_count: u64) -> bool {
        (current_tenant_count as i64) < self.max_tenants
    }
}

/// Input for creating a house
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHouse {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub max_tenants: i64,
}

/// Input for updating a house
///
/// Only fields set to `Some` are sent to the remote service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateHouse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tenants: Option<i64>,
}

impl UpdateHouse {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.max_tenants.is_none()
    }
}

/// House plus the details shown on the join screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseWithDetails {
    #[serde(flatten)]
    pub house: House,

    /// Number of tenant members currently in the house
    pub current_tenant_count: u64,

    /// Username of the host, when the host profile could be read
    pub host_username: Option<String>,
}

impl HouseWithDetails {
    pub fn is_full(&self) -> bool {
        !self.house.has_room_for(self.current_tenant_count)
    }
}
