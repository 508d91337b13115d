/// Chore operations
///
/// Listings come back newest first with the assignee and creator summaries
/// attached. The archived state of a chore is the remote `archived` flag
/// OR-ed with the local [`ArchiveLedger`]; deployments without the column
/// rely on the ledger alone.

use chrono::Utc;
use choreboard_shared::models::chore::{
    Chore, ChoreStatus, ChoreWithUsers, CreateChore, NewChore, UpdateChore,
};
use choreboard_shared::models::house::House;
use choreboard_shared::models::user::{User, UserSummary};
use choreboard_shared::remote::query::{Query, Table};
use choreboard_shared::remote::{decode_row, decode_rows, encode_row, RemoteService, Row};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::access::{
    authorize, fetch_chore, fetch_house, find_chore, find_house, house_role, require_user, ChoreAction,
    HouseRole,
};
use super::archive_ledger::ArchiveLedger;
use crate::error::{ClientError, ClientResult};

pub const MSG_ONLY_COMPLETED_ARCHIVABLE: &str = "Only completed chores can be archived";

fn patch<'a>(fields: impl IntoIterator<Item = (&'a str, Value)>) -> Row {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

/// Query for a house's done chores, most recently completed first
fn done_chores(house_id: Uuid) -> Query {
    Query::table(Table::Chores)
        .eq("house_id", house_id)
        .eq("status", ChoreStatus::Done)
        .order_desc("completed_at")
}

#[derive(Clone)]
pub struct ChoreService {
    remote: Arc<dyn RemoteService>,
    ledger: ArchiveLedger,
}

impl ChoreService {
    pub fn new(remote: Arc<dyn RemoteService>, ledger: ArchiveLedger) -> Self {
        Self { remote, ledger }
    }

    fn remote(&self) -> &dyn RemoteService {
        self.remote.as_ref()
    }

    pub fn ledger(&self) -> &ArchiveLedger {
        &self.ledger
    }

    /// Creates a `not_done` chore in a house the actor belongs to
    pub async fn create_chore(&self, data: CreateChore) -> ClientResult<Chore> {
        let account = require_user(self.remote()).await?;

        if data.title.trim().is_empty() {
            return Err(ClientError::invalid("title", "Chore title is required"));
        }

        let house = fetch_house(self.remote(), data.house_id).await?;
        if !house_role(self.remote(), &house, account.id).await?.belongs() {
            return Err(ClientError::Permission("You are not a member of this house".to_string()));
        }
        if let Some(assignee) = data.assigned_to_user_id {
            self.require_assignable(&house, assignee).await?;
        }

        let new_chore = NewChore::from_request(data, account.id);
        let row = self.remote.insert(Table::Chores, encode_row(&new_chore)?).await?;
        let chore: Chore = decode_row(row)?;

        info!(chore_id = %chore.id, house_id = %chore.house_id, "Chore created");
        Ok(chore)
    }

    /// All chores of a house, newest first, archived flag reconciled
    pub async fn get_chores_by_house(&self, house_id: Uuid) -> ClientResult<Vec<ChoreWithUsers>> {
        let rows = self
            .remote
            .select(
                Query::table(Table::Chores)
                    .eq("house_id", house_id)
                    .order_desc("created_at"),
            )
            .await?;
        let chores = self.reconcile(decode_rows(rows)?).await;
        Ok(self.with_users(chores).await)
    }

    /// Chores of a house that are not archived
    pub async fn get_active_chores(&self, house_id: Uuid) -> ClientResult<Vec<ChoreWithUsers>> {
        let mut chores = self.get_chores_by_house(house_id).await?;
        chores.retain(|c| !c.chore.is_archived());
        Ok(chores)
    }

    /// Chores of a house assigned to one user, newest first
    pub async fn get_chores_for_user(&self, user_id: Uuid, house_id: Uuid) -> ClientResult<Vec<ChoreWithUsers>> {
        let rows = self
            .remote
            .select(
                Query::table(Table::Chores)
                    .eq("house_id", house_id)
                    .eq("assigned_to_user_id", user_id)
                    .order_desc("created_at"),
            )
            .await?;
        let chores = self.reconcile(decode_rows(rows)?).await;
        Ok(self.with_users(chores).await)
    }

    /// Marks a chore done
    pub async fn complete_chore(&self, chore_id: Uuid) -> ClientResult<Chore> {
        let account = require_user(self.remote()).await?;
        let chore = fetch_chore(self.remote(), chore_id).await?;
        let house = fetch_house(self.remote(), chore.house_id).await?;

        let role = house_role(self.remote(), &house, account.id).await?;
        authorize(ChoreAction::Complete, &chore, account.id, role)?;

        let now = now_value();
        let updated = self
            .update_one(
                chore_id,
                patch([
                    ("status", Value::String(ChoreStatus::Done.as_str().to_string())),
                    ("completed_at", now.clone()),
                    ("updated_at", now),
                ]),
            )
            .await?;

        info!(chore_id = %chore_id, user_id = %account.id, "Chore completed");
        Ok(updated)
    }

    /// Assigns a chore to the host or a member (host only)
    pub async fn assign_chore(&self, chore_id: Uuid, user_id: Uuid) -> ClientResult<Chore> {
        let account = require_user(self.remote()).await?;
        let chore = fetch_chore(self.remote(), chore_id).await?;

        let house = find_house(self.remote(), chore.house_id).await?;
        let role = match &house {
            Some(h) if h.is_host(account.id) => HouseRole::Host,
            _ => HouseRole::Outsider,
        };
        authorize(ChoreAction::Assign, &chore, account.id, role)?;

        if let Some(house) = &house {
            self.require_assignable(house, user_id).await?;
        }

        let updated = self
            .update_one(
                chore_id,
                patch([
                    ("assigned_to_user_id", Value::String(user_id.to_string())),
                    ("updated_at", now_value()),
                ]),
            )
            .await?;

        info!(chore_id = %chore_id, assignee = %user_id, "Chore assigned");
        Ok(updated)
    }

    /// Edits title and description (creator or host)
    pub async fn update_chore(&self, chore_id: Uuid, data: UpdateChore) -> ClientResult<Chore> {
        let account = require_user(self.remote()).await?;
        let chore = fetch_chore(self.remote(), chore_id).await?;
        let role = self.host_or_outsider(chore.house_id, account.id).await?;
        authorize(ChoreAction::Update, &chore, account.id, role)?;

        if data.is_empty() {
            return Ok(chore.merge_archived(&self.ledger.ids().await));
        }
        if data.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ClientError::invalid("title", "Chore title is required"));
        }

        let mut fields = encode_row(&data)?;
        fields.insert("updated_at".to_string(), now_value());
        let updated = self.update_one(chore_id, fields).await?;

        info!(chore_id = %chore_id, "Chore updated");
        Ok(updated)
    }

    /// Archives a done chore
    ///
    /// The archive is recorded locally first, then on the remote row. When
    /// the remote write fails the chore is read back and returned as
    /// archived; when that fails as well, a placeholder record stands in.
    pub async fn archive_chore(&self, chore_id: Uuid) -> ClientResult<Chore> {
        let account = require_user(self.remote()).await?;
        let chore = fetch_chore(self.remote(), chore_id).await?;

        if !chore.is_done() {
            return Err(ClientError::Conflict(MSG_ONLY_COMPLETED_ARCHIVABLE.to_string()));
        }

        let house = fetch_house(self.remote(), chore.house_id).await?;
        let role = house_role(self.remote(), &house, account.id).await?;
        authorize(ChoreAction::Archive, &chore, account.id, role)?;

        if let Err(e) = self.ledger.add(chore_id).await {
            warn!(chore_id = %chore_id, error = %e, "Failed to save archived chore locally");
        }

        let remote_result = self
            .remote
            .update(
                Query::table(Table::Chores).eq("id", chore_id),
                patch([("archived", Value::Bool(true))]),
            )
            .await;

        match remote_result {
            Ok(mut rows) if !rows.is_empty() => {
                let mut archived: Chore = decode_row(rows.swap_remove(0))?;
                archived.archived = Some(true);
                info!(chore_id = %chore_id, "Chore archived");
                return Ok(archived);
            }
            Ok(_) => warn!(chore_id = %chore_id, "Remote archive matched no row"),
            Err(e) => warn!(chore_id = %chore_id, error = %e, "Remote archive failed, keeping local record"),
        }

        let fallback = match find_chore(self.remote(), chore_id).await {
            Ok(Some(mut current)) => {
                current.archived = Some(true);
                current
            }
            Ok(None) | Err(_) => {
                Chore::archived_placeholder(chore_id, chore.house_id, account.id, Utc::now())
            }
        };

        info!(chore_id = %chore_id, "Chore archived locally");
        Ok(fallback)
    }

    /// Archived chores of a house, most recently completed first
    ///
    /// Deployments without the `archived` column answer the flag filter
    /// with a schema mismatch; the done chores are then matched against the
    /// local ledger instead.
    pub async fn get_archived_chores(&self, house_id: Uuid) -> ClientResult<Vec<ChoreWithUsers>> {
        let ledger = self.ledger.ids().await;

        let mut archived: Vec<Chore> = match self
            .remote
            .select(done_chores(house_id).eq("archived", true))
            .await
        {
            Ok(rows) => {
                let mut chores: Vec<Chore> = decode_rows(rows)?;
                self.add_ledger_only(house_id, &ledger, &mut chores).await;
                chores
            }
            Err(e) if e.is_schema_mismatch() => {
                debug!(house_id = %house_id, error = %e, "Archived column unavailable, using local ledger");
                self.ledger_archived(house_id, &ledger).await
            }
            Err(e) => return Err(e.into()),
        };

        for chore in &mut archived {
            chore.archived = Some(true);
        }
        Ok(self.with_users(archived).await)
    }

    /// Deletes a chore (creator or host) and forgets its local archive
    pub async fn delete_chore(&self, chore_id: Uuid) -> ClientResult<()> {
        let account = require_user(self.remote()).await?;
        let chore = fetch_chore(self.remote(), chore_id).await?;
        let role = self.host_or_outsider(chore.house_id, account.id).await?;
        authorize(ChoreAction::Delete, &chore, account.id, role)?;

        if let Err(e) = self.ledger.remove(chore_id).await {
            warn!(chore_id = %chore_id, error = %e, "Failed to remove archived chore locally");
        }

        self.remote
            .delete(Query::table(Table::Chores).eq("id", chore_id))
            .await?;

        info!(chore_id = %chore_id, user_id = %account.id, "Chore deleted");
        Ok(())
    }

    /// Done chores of the house whose ids are in the ledger
    ///
    /// Any failure here yields an empty list.
    async fn ledger_archived(&self, house_id: Uuid, ledger: &HashSet<Uuid>) -> Vec<Chore> {
        let rows = match self.remote.select(done_chores(house_id)).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(house_id = %house_id, error = %e, "Fallback archived query failed");
                return Vec::new();
            }
        };

        match decode_rows::<Chore>(rows) {
            Ok(chores) => chores.into_iter().filter(|c| ledger.contains(&c.id)).collect(),
            Err(e) => {
                warn!(house_id = %house_id, error = %e, "Fallback archived rows unreadable");
                Vec::new()
            }
        }
    }

    /// Adds done chores recorded in the ledger whose remote flag was never
    /// set, keeping completion order
    async fn add_ledger_only(&self, house_id: Uuid, ledger: &HashSet<Uuid>, chores: &mut Vec<Chore>) {
        let known: HashSet<Uuid> = chores.iter().map(|c| c.id).collect();
        let missing: Vec<Uuid> = ledger.difference(&known).copied().collect();
        if missing.is_empty() {
            return;
        }

        let extra = match self
            .remote
            .select(done_chores(house_id).is_in("id", missing))
            .await
        {
            Ok(rows) => match decode_rows::<Chore>(rows) {
                Ok(extra) => extra,
                Err(e) => {
                    warn!(house_id = %house_id, error = %e, "Locally archived chore rows unreadable");
                    return;
                }
            },
            Err(e) => {
                warn!(house_id = %house_id, error = %e, "Could not read locally archived chores");
                return;
            }
        };
        if extra.is_empty() {
            return;
        }

        chores.extend(extra);
        chores.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    }

    /// Host role when the actor hosts the chore's house, outsider otherwise
    ///
    /// Used for the creator-or-host checks, where membership does not
    /// matter and a missing house is not an error.
    async fn host_or_outsider(&self, house_id: Uuid, actor_id: Uuid) -> ClientResult<HouseRole> {
        Ok(match find_house(self.remote(), house_id).await? {
            Some(house) if house.is_host(actor_id) => HouseRole::Host,
            _ => HouseRole::Outsider,
        })
    }

    async fn require_assignable(&self, house: &House, user_id: Uuid) -> ClientResult<()> {
        if house_role(self.remote(), house, user_id).await?.belongs() {
            Ok(())
        } else {
            Err(ClientError::invalid(
                "assigned_to_user_id",
                "Chores can only be assigned to members of this house",
            ))
        }
    }

    async fn update_one(&self, chore_id: Uuid, fields: Row) -> ClientResult<Chore> {
        let mut rows = self
            .remote
            .update(Query::table(Table::Chores).eq("id", chore_id), fields)
            .await?;
        if rows.is_empty() {
            return Err(ClientError::chore_not_found());
        }
        let chore: Chore = decode_row(rows.swap_remove(0))?;
        Ok(chore.merge_archived(&self.ledger.ids().await))
    }

    async fn reconcile(&self, chores: Vec<Chore>) -> Vec<Chore> {
        let ledger = self.ledger.ids().await;
        chores.into_iter().map(|c| c.merge_archived(&ledger)).collect()
    }

    /// Attaches assignee and creator summaries
    ///
    /// Users that cannot be read are left as `None`.
    async fn with_users(&self, chores: Vec<Chore>) -> Vec<ChoreWithUsers> {
        let summaries = match self.user_summaries(&chores).await {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Could not load chore users");
                HashMap::new()
            }
        };

        chores
            .into_iter()
            .map(|chore| ChoreWithUsers {
                assigned_user: chore
                    .assigned_to_user_id
                    .and_then(|id| summaries.get(&id).cloned()),
                created_by_user: summaries.get(&chore.created_by_user_id).cloned(),
                chore,
            })
            .collect()
    }

    async fn user_summaries(&self, chores: &[Chore]) -> ClientResult<HashMap<Uuid, UserSummary>> {
        let ids: BTreeSet<Uuid> = chores
            .iter()
            .flat_map(|c| c.assigned_to_user_id.into_iter().chain([c.created_by_user_id]))
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users: Vec<User> = decode_rows(
            self.remote
                .select(Query::table(Table::Users).is_in("id", ids))
                .await?,
        )?;
        Ok(users.into_iter().map(|u| (u.id, u.summary())).collect())
    }
}
