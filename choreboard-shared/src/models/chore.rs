/// Chore model
///
/// Chores belong to one house for their whole life. They are created
/// `not_done`, completed once (which stamps `completed_at`), optionally
/// archived, and optionally deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE chores (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     house_id UUID NOT NULL REFERENCES houses(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     description TEXT,
///     assigned_to_user_id UUID REFERENCES users(id),
///     created_by_user_id UUID NOT NULL REFERENCES users(id),
///     status TEXT NOT NULL DEFAULT 'not_done' CHECK (status IN ('not_done', 'done')),
///     archived BOOLEAN NOT NULL DEFAULT FALSE, -- missing on older deployments
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ,
///     completed_at TIMESTAMPTZ
/// );
/// ```
///
/// # Archived state
///
/// Some deployments lack the `archived` column. For those, archived chore
/// IDs are kept on the device and merged in at read time with
/// [`Chore::merge_archived`]: a chore counts as archived when either the
/// remote flag or the local list says so.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use super::user::UserSummary;

/// Title given to the stand-in record returned when an archive could only
/// be recorded locally
pub const ARCHIVED_PLACEHOLDER_TITLE: &str = "Archived Chore";

/// Completion status of a chore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoreStatus {
    NotDone,
    Done,
}

impl ChoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChoreStatus::NotDone => "not_done",
            ChoreStatus::Done => "done",
        }
    }
}

impl fmt::Display for ChoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chore row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    pub id: Uuid,

    /// Owning house, never changes
    pub house_id: Uuid,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Tenant (or host) responsible for the chore, if any
    #[serde(default)]
    pub assigned_to_user_id: Option<Uuid>,

    /// Member who created the chore
    pub created_by_user_id: Uuid,

    pub status: ChoreStatus,

    /// Remote archived flag; `None` when the deployment has no such column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Set exactly when `status` is `done`
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Chore {
    pub fn is_done(&self) -> bool {
        self.status == ChoreStatus::Done
    }

    pub fn is_archived(&self) -> bool {
        self.archived.unwrap_or(false)
    }

    pub fn is_unassigned(&self) -> bool {
        self.assigned_to_user_id.is_none()
    }

    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.assigned_to_user_id == Some(user_id)
    }

    /// Reconciles the remote flag with the locally archived IDs
    ///
    /// The chore is archived if either source says so.
    pub fn merge_archived(mut self, local_archived: &HashSet<Uuid>) -> Self {
        let archived = local_archived.contains(&self.id) || self.is_archived();
        self.archived = Some(archived);
        self
    }

    /// Builds the minimal record returned when an archive was recorded
    /// locally but the chore row could not be read back
    pub fn archived_placeholder(
        id: Uuid,
        house_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Chore {
            id,
            house_id,
            title: ARCHIVED_PLACEHOLDER_TITLE.to_string(),
            description: None,
            assigned_to_user_id: None,
            created_by_user_id: actor_id,
            status: ChoreStatus::Done,
            archived: Some(true),
            created_at: now,
            updated_at: None,
            completed_at: Some(now),
        }
    }
}

/// Input for creating a chore, as supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChore {
    pub house_id: Uuid,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Pre-assign the chore on creation
    #[serde(default)]
    pub assigned_to_user_id: Option<Uuid>,
}

/// Row inserted into `chores`
#[derive(Debug, Clone, Serialize)]
pub struct NewChore {
    pub house_id: Uuid,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub assigned_to_user_id: Option<Uuid>,

    pub created_by_user_id: Uuid,

    pub status: ChoreStatus,
}

impl NewChore {
    /// New chores always start `not_done`
    pub fn from_request(data: CreateChore, created_by_user_id: Uuid) -> Self {
        NewChore {
            house_id: data.house_id,
            title: data.title,
            description: data.description,
            assigned_to_user_id: data.assigned_to_user_id,
            created_by_user_id,
            status: ChoreStatus::NotDone,
        }
    }
}

/// Editable chore details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateChore {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Chore plus the people shown next to it in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoreWithUsers {
    #[serde(flatten)]
    pub chore: Chore,

    pub assigned_user: Option<UserSummary>,

    pub created_by_user: Option<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chore(status: ChoreStatus) -> Chore {
        Chore {
            id: Uuid::new_v4(),
            house_id: Uuid::new_v4(),
            title: "Vacuum the hallway".to_string(),
            description: None,
            assigned_to_user_id: None,
            created_by_user_id: Uuid::new_v4(),
            status,
            archived: None,
            created_at: Utc::now(),
            updated_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(ChoreStatus::NotDone).unwrap(), "not_done");
        assert_eq!(serde_json::to_value(ChoreStatus::Done).unwrap(), "done");
        assert_eq!(ChoreStatus::Done.to_string(), "done");
    }

    #[test]
    fn test_merge_archived_prefers_either_source() {
        let local_only = chore(ChoreStatus::Done);
        let ids: HashSet<Uuid> = [local_only.id].into_iter().collect();
        assert!(local_only.merge_archived(&ids).is_archived());

        let mut remote_only = chore(ChoreStatus::Done);
        remote_only.archived = Some(true);
        assert!(remote_only.merge_archived(&HashSet::new()).is_archived());

        let neither = chore(ChoreStatus::Done).merge_archived(&HashSet::new());
        assert_eq!(neither.archived, Some(false));
    }

    #[test]
    fn test_archived_placeholder_is_done_and_completed() {
        let now = Utc::now();
        let actor = Uuid::new_v4();
        let placeholder = Chore::archived_placeholder(Uuid::new_v4(), Uuid::new_v4(), actor, now);

        assert_eq!(placeholder.title, ARCHIVED_PLACEHOLDER_TITLE);
        assert!(placeholder.is_done());
        assert!(placeholder.is_archived());
        assert_eq!(placeholder.completed_at, Some(now));
        assert_eq!(placeholder.created_by_user_id, actor);
    }

    #[test]
    fn test_assignment_helpers() {
        let mut c = chore(ChoreStatus::NotDone);
        assert!(c.is_unassigned());

        let tenant = Uuid::new_v4();
        c.assigned_to_user_id = Some(tenant);
        assert!(c.is_assigned_to(tenant));
        assert!(!c.is_assigned_to(Uuid::new_v4()));
    }

    #[test]
    fn test_new_chore_starts_not_done() {
        let creator = Uuid::new_v4();
        let row = NewChore::from_request(
            CreateChore {
                house_id: Uuid::new_v4(),
                title: "Water plants".to_string(),
                description: None,
                assigned_to_user_id: None,
            },
            creator,
        );
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["status"], "not_done");
        assert!(json["assigned_to_user_id"].is_null());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_chore_without_archived_column_deserializes() {
        let c: Chore = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "house_id": Uuid::new_v4(),
            "title": "Dishes",
            "description": null,
            "assigned_to_user_id": null,
            "created_by_user_id": Uuid::new_v4(),
            "status": "done",
            "created_at": "2026-01-05T10:00:00Z",
            "completed_at": "2026-01-05T12:00:00Z"
        }))
        .unwrap();

        assert!(c.archived.is_none());
        assert!(!c.is_archived());
        assert!(c.is_done());
    }
}
