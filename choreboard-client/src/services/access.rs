/// Authorization helpers and permission checks
///
/// The hosted service enforces little on its own, so every mutating call
/// re-derives the actor's standing by reading the related rows first.
///
/// # Permission Model
///
/// 1. **House role**: the actor is the house's host, a tenant member (a
///    `house_members` row), or an outsider
/// 2. **Chore relation**: the actor may also be the chore's creator or
///    assignee
/// 3. **Action rules**: [`ChoreAction::is_permitted`] combines both
///
/// | Action   | Permitted when |
/// |----------|----------------|
/// | Complete | host, assignee, or member when the chore is unassigned |
/// | Assign   | host |
/// | Archive  | host or member (the chore must also be done) |
/// | Update   | creator or host |
/// | Delete   | creator or host |
///
/// Checks and the mutation that follows are separate round trips; nothing
/// stops the rows from changing in between.

use choreboard_shared::auth::session::AuthUser;
use choreboard_shared::models::chore::Chore;
use choreboard_shared::models::house::House;
use choreboard_shared::models::user::User;
use choreboard_shared::remote::query::{Query, Table};
use choreboard_shared::remote::{decode_row, RemoteError, RemoteService};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// Actor's standing in a house
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HouseRole {
    Host,
    Member,
    Outsider,
}

impl HouseRole {
    /// Host or member
    pub fn belongs(&self) -> bool {
        !matches!(self, HouseRole::Outsider)
    }
}

/// Mutations on a chore that need a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoreAction {
    Complete,
    Assign,
    Archive,
    Update,
    Delete,
}

impl ChoreAction {
    /// Message shown when the action is refused
    pub fn denial_message(&self) -> &'static str {
        match self {
            ChoreAction::Complete => "You do not have permission to complete this chore",
            ChoreAction::Assign => "Only the host can assign chores",
            ChoreAction::Archive => "You do not have permission to archive this chore",
            ChoreAction::Update => "You do not have permission to update this chore",
            ChoreAction::Delete => "You do not have permission to delete this chore",
        }
    }

    pub fn is_permitted(&self, chore: &Chore, actor_id: Uuid, role: HouseRole) -> bool {
        let is_host = role == HouseRole::Host;
        match self {
            ChoreAction::Complete => {
                is_host
                    || chore.is_assigned_to(actor_id)
                    || (chore.is_unassigned() && role == HouseRole::Member)
            }
            ChoreAction::Assign => is_host,
            ChoreAction::Archive => role.belongs(),
            ChoreAction::Update | ChoreAction::Delete => {
                is_host || chore.created_by_user_id == actor_id
            }
        }
    }
}

/// Fails with the action's denial message unless the actor may perform it
pub fn authorize(action: ChoreAction, chore: &Chore, actor_id: Uuid, role: HouseRole) -> ClientResult<()> {
    if action.is_permitted(chore, actor_id, role) {
        Ok(())
    } else {
        Err(ClientError::Permission(action.denial_message().to_string()))
    }
}

/// The signed-in account, or an authentication error
pub async fn require_user(remote: &dyn RemoteService) -> ClientResult<AuthUser> {
    remote
        .get_user()
        .await?
        .ok_or_else(ClientError::not_authenticated)
}

/// Profile row of an account
pub async fn fetch_profile(remote: &dyn RemoteService, user_id: Uuid) -> ClientResult<Option<User>> {
    let row = remote
        .select_one(Query::table(Table::Users).eq("id", user_id))
        .await?;
    Ok(row.map(decode_row).transpose()?)
}

/// Profile of the signed-in account; a missing profile counts as not
/// signed in
pub async fn require_profile(remote: &dyn RemoteService) -> ClientResult<User> {
    let account = require_user(remote).await?;
    fetch_profile(remote, account.id)
        .await?
        .ok_or_else(ClientError::not_authenticated)
}

pub async fn find_chore(remote: &dyn RemoteService, chore_id: Uuid) -> ClientResult<Option<Chore>> {
    match remote.select_one(Query::table(Table::Chores).eq("id", chore_id)).await {
        Ok(row) => Ok(row.map(decode_row).transpose()?),
        Err(RemoteError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_chore(remote: &dyn RemoteService, chore_id: Uuid) -> ClientResult<Chore> {
    find_chore(remote, chore_id)
        .await?
        .ok_or_else(ClientError::chore_not_found)
}

pub async fn find_house(remote: &dyn RemoteService, house_id: Uuid) -> ClientResult<Option<House>> {
    match remote.select_one(Query::table(Table::Houses).eq("id", house_id)).await {
        Ok(row) => Ok(row.map(decode_row).transpose()?),
        Err(RemoteError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_house(remote: &dyn RemoteService, house_id: Uuid) -> ClientResult<House> {
    find_house(remote, house_id)
        .await?
        .ok_or_else(ClientError::house_not_found)
}

/// True when the user has a `house_members` row for the house
pub async fn is_member(remote: &dyn RemoteService, house_id: Uuid, user_id: Uuid) -> ClientResult<bool> {
    let row = remote
        .select_one(
            Query::table(Table::HouseMembers)
                .eq("house_id", house_id)
                .eq("user_id", user_id),
        )
        .await?;
    Ok(row.is_some())
}

/// Works out the user's standing in a house; members are only looked up
/// for non-hosts
pub async fn house_role(remote: &dyn RemoteService, house: &House, user_id: Uuid) -> ClientResult<HouseRole> {
    if house.is_host(user_id) {
        return Ok(HouseRole::Host);
    }
    if is_member(remote, house.id, user_id).await? {
        Ok(HouseRole::Member)
    } else {
        Ok(HouseRole::Outsider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use choreboard_shared::models::chore::ChoreStatus;

    fn chore(created_by: Uuid, assigned: Option<Uuid>) -> Chore {
        Chore {
            id: Uuid::new_v4(),
            house_id: Uuid::new_v4(),
            title: "Dishes".to_string(),
            description: None,
            assigned_to_user_id: assigned,
            created_by_user_id: created_by,
            status: ChoreStatus::NotDone,
            archived: Some(false),
            created_at: Utc::now(),
            updated_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_complete_rules() {
        let tenant = Uuid::new_v4();
        let other = Uuid::new_v4();

        let unassigned = chore(other, None);
        assert!(ChoreAction::Complete.is_permitted(&unassigned, tenant, HouseRole::Member));
        assert!(ChoreAction::Complete.is_permitted(&unassigned, tenant, HouseRole::Host));
        assert!(!ChoreAction::Complete.is_permitted(&unassigned, tenant, HouseRole::Outsider));

        let assigned_elsewhere = chore(other, Some(other));
        assert!(!ChoreAction::Complete.is_permitted(&assigned_elsewhere, tenant, HouseRole::Member));
        assert!(ChoreAction::Complete.is_permitted(&assigned_elsewhere, other, HouseRole::Member));
    }

    #[test]
    fn test_assign_and_archive_rules() {
        let actor = Uuid::new_v4();
        let c = chore(actor, None);

        assert!(ChoreAction::Assign.is_permitted(&c, actor, HouseRole::Host));
        assert!(!ChoreAction::Assign.is_permitted(&c, actor, HouseRole::Member));

        assert!(ChoreAction::Archive.is_permitted(&c, actor, HouseRole::Member));
        assert!(!ChoreAction::Archive.is_permitted(&c, actor, HouseRole::Outsider));
    }

    #[test]
    fn test_update_delete_rules() {
        let creator = Uuid::new_v4();
        let someone = Uuid::new_v4();
        let c = chore(creator, None);

        for action in [ChoreAction::Update, ChoreAction::Delete] {
            assert!(action.is_permitted(&c, creator, HouseRole::Outsider));
            assert!(action.is_permitted(&c, someone, HouseRole::Host));
            assert!(!action.is_permitted(&c, someone, HouseRole::Member));
        }
    }

    #[test]
    fn test_authorize_uses_denial_message() {
        let c = chore(Uuid::new_v4(), None);
        let err = authorize(ChoreAction::Assign, &c, Uuid::new_v4(), HouseRole::Member).unwrap_err();
        assert_eq!(err.to_string(), "Only the host can assign chores");
    }
}
