/// House membership model
///
/// A `house_members` row is the only proof that a tenant belongs to a house.
/// Hosts never get a row; their membership follows from `houses.host_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE house_members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     house_id UUID NOT NULL REFERENCES houses(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (house_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership row linking a tenant to a house
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseMember {
    pub id: Uuid,

    pub house_id: Uuid,

    pub user_id: Uuid,

    /// When the tenant joined
    pub joined_at: DateTime<Utc>,
}

/// Input for adding a tenant to a house
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHouseMember {
    pub house_id: Uuid,
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_house_member_serializes_ids_as_strings() {
        let house_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let json = serde_json::to_value(CreateHouseMember { house_id, user_id }).unwrap();

        assert_eq!(json["house_id"], house_id.to_string());
        assert_eq!(json["user_id"], user_id.to_string());
    }
}
