/// House operations
///
/// A house has exactly one host (its creator) and up to `max_tenants`
/// tenants, each recorded as a `house_members` row. A user belongs to at
/// most one house, as host or as member.

use chrono::Utc;
use choreboard_shared::models::house::{CreateHouse, House, HouseWithDetails, UpdateHouse};
use choreboard_shared::models::membership::{CreateHouseMember, HouseMember};
use choreboard_shared::models::user::User;
use choreboard_shared::remote::query::{Query, Table};
use choreboard_shared::remote::{decode_row, decode_rows, encode_row, RemoteError, RemoteService};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::access::{fetch_house, find_house, is_member, require_profile, require_user};
use crate::error::{ClientError, ClientResult};

pub const MSG_HOUSE_FULL: &str = "House is full";
pub const MSG_ALREADY_MEMBER_HERE: &str = "Already a member of this house";
pub const MSG_ALREADY_IN_A_HOUSE: &str = "You are already a member of a house";

#[derive(Clone)]
pub struct HouseService {
    remote: Arc<dyn RemoteService>,
}

impl HouseService {
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self { remote }
    }

    fn remote(&self) -> &dyn RemoteService {
        self.remote.as_ref()
    }

    /// Creates a house hosted by the signed-in user
    pub async fn create_house(&self, data: CreateHouse) -> ClientResult<House> {
        let user = require_profile(self.remote()).await?;
        if !user.is_host() {
            return Err(ClientError::Permission("Only hosts can create houses".to_string()));
        }

        if data.name.trim().is_empty() {
            return Err(ClientError::invalid("name", "House name is required"));
        }
        if data.max_tenants < 1 {
            return Err(ClientError::invalid("max_tenants", "A house needs room for at least one tenant"));
        }

        if self.hosted_house(user.id).await?.is_some() {
            return Err(ClientError::Conflict("You already host a house".to_string()));
        }

        let mut row = encode_row(&data)?;
        row.insert("host_id".to_string(), Value::String(user.id.to_string()));
        let house: House = decode_row(self.remote.insert(Table::Houses, row).await?)?;

        info!(house_id = %house.id, host_id = %user.id, "House created");
        Ok(house)
    }

    pub async fn get_house_by_id(&self, house_id: Uuid) -> ClientResult<Option<House>> {
        find_house(self.remote(), house_id).await
    }

    /// The house the signed-in user hosts or belongs to
    pub async fn get_current_user_house(&self) -> ClientResult<Option<House>> {
        let Some(account) = self.remote.get_user().await? else {
            return Ok(None);
        };

        if let Some(house) = self.hosted_house(account.id).await? {
            return Ok(Some(house));
        }

        match self.membership_of(account.id).await? {
            Some(member) => self.get_house_by_id(member.house_id).await,
            None => Ok(None),
        }
    }

    /// Every house with its tenant count and host username
    pub async fn get_available_houses(&self) -> ClientResult<Vec<HouseWithDetails>> {
        let houses: Vec<House> = decode_rows(
            self.remote
                .select(Query::table(Table::Houses).order_asc("created_at"))
                .await?,
        )?;
        if houses.is_empty() {
            return Ok(Vec::new());
        }

        let host_ids: BTreeSet<Uuid> = houses.iter().map(|h| h.host_id).collect();
        let hosts: Vec<User> = decode_rows(
            self.remote
                .select(Query::table(Table::Users).is_in("id", host_ids))
                .await?,
        )?;
        let host_names: HashMap<Uuid, String> =
            hosts.into_iter().map(|u| (u.id, u.username)).collect();

        let members: Vec<HouseMember> = decode_rows(
            self.remote
                .select(
                    Query::table(Table::HouseMembers)
                        .is_in("house_id", houses.iter().map(|h| h.id)),
                )
                .await?,
        )?;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for member in &members {
            *counts.entry(member.house_id).or_default() += 1;
        }

        Ok(houses
            .into_iter()
            .map(|house| HouseWithDetails {
                current_tenant_count: counts.get(&house.id).copied().unwrap_or(0),
                host_username: host_names.get(&house.host_id).cloned(),
                house,
            })
            .collect())
    }

    /// Joins a house as a tenant
    pub async fn join_house(&self, house_id: Uuid) -> ClientResult<HouseMember> {
        let user = require_profile(self.remote()).await?;
        if !user.is_tenant() {
            return Err(ClientError::Permission("Only tenants can join houses".to_string()));
        }

        let house = fetch_house(self.remote(), house_id).await?;

        let count = self.tenant_count(house_id).await?;
        if !house.has_room_for(count) {
            return Err(ClientError::Conflict(MSG_HOUSE_FULL.to_string()));
        }

        if is_member(self.remote(), house_id, user.id).await? {
            return Err(ClientError::Conflict(MSG_ALREADY_MEMBER_HERE.to_string()));
        }
        if self.membership_of(user.id).await?.is_some() {
            return Err(ClientError::Conflict(MSG_ALREADY_IN_A_HOUSE.to_string()));
        }

        let membership = CreateHouseMember {
            house_id,
            user_id: user.id,
        };
        let row = match self
            .remote
            .insert(Table::HouseMembers, encode_row(&membership)?)
            .await
        {
            Ok(row) => row,
            Err(RemoteError::Conflict(_)) => {
                return Err(ClientError::Conflict(MSG_ALREADY_MEMBER_HERE.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let member: HouseMember = decode_row(row)?;

        info!(house_id = %house_id, user_id = %user.id, tenants = count + 1, "Tenant joined house");
        Ok(member)
    }

    /// Tenant profiles of a house (host excluded)
    pub async fn get_house_tenants(&self, house_id: Uuid) -> ClientResult<Vec<User>> {
        let members: Vec<HouseMember> = decode_rows(
            self.remote
                .select(
                    Query::table(Table::HouseMembers)
                        .eq("house_id", house_id)
                        .order_asc("joined_at"),
                )
                .await?,
        )?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let mut users: Vec<User> = decode_rows(
            self.remote
                .select(Query::table(Table::Users).is_in("id", members.iter().map(|m| m.user_id)))
                .await?,
        )?;

        // Keep join order
        let position: HashMap<Uuid, usize> =
            members.iter().enumerate().map(|(i, m)| (m.user_id, i)).collect();
        users.sort_by_key(|u| position.get(&u.id).copied().unwrap_or(usize::MAX));
        Ok(users)
    }

    /// Host first, then tenants
    ///
    /// A host profile that cannot be read is left out rather than failing
    /// the whole list.
    pub async fn get_house_members(&self, house: &House) -> ClientResult<Vec<User>> {
        let tenants = self.get_house_tenants(house.id).await?;

        let host = match self
            .remote
            .select_one(Query::table(Table::Users).eq("id", house.host_id))
            .await
        {
            Ok(row) => row.map(decode_row::<User>).transpose()?,
            Err(e) => {
                error!(house_id = %house.id, error = %e, "Error fetching host");
                None
            }
        };

        let mut members: Vec<User> = host.into_iter().collect();
        members.extend(tenants.into_iter().filter(|t| t.id != house.host_id));
        Ok(members)
    }

    /// Removes a tenant (host only)
    pub async fn remove_tenant(&self, house_id: Uuid, user_id: Uuid) -> ClientResult<()> {
        let account = require_user(self.remote()).await?;

        let house = find_house(self.remote(), house_id).await?;
        if !house.is_some_and(|h| h.is_host(account.id)) {
            return Err(ClientError::Permission("Only the host can remove tenants".to_string()));
        }

        let removed = self
            .remote
            .delete(
                Query::table(Table::HouseMembers)
                    .eq("house_id", house_id)
                    .eq("user_id", user_id),
            )
            .await?;

        info!(house_id = %house_id, user_id = %user_id, removed, "Tenant removed");
        Ok(())
    }

    /// Leaves a house (tenants only)
    pub async fn leave_house(&self, house_id: Uuid) -> ClientResult<()> {
        let account = require_user(self.remote()).await?;
        let house = fetch_house(self.remote(), house_id).await?;

        if house.is_host(account.id) {
            return Err(ClientError::Permission(
                "Hosts cannot leave their own house. Delete the house instead.".to_string(),
            ));
        }
        if !is_member(self.remote(), house_id, account.id).await? {
            return Err(ClientError::NotFound("You are not a member of this house".to_string()));
        }

        self.remote
            .delete(
                Query::table(Table::HouseMembers)
                    .eq("house_id", house_id)
                    .eq("user_id", account.id),
            )
            .await?;

        info!(house_id = %house_id, user_id = %account.id, "Tenant left house");
        Ok(())
    }

    /// Updates name, description or capacity (host only)
    pub async fn update_house(&self, house_id: Uuid, data: UpdateHouse) -> ClientResult<House> {
        let account = require_user(self.remote()).await?;

        let house = match find_house(self.remote(), house_id).await? {
            Some(house) if house.is_host(account.id) => house,
            _ => {
                return Err(ClientError::Permission(
                    "Only the host can update the house".to_string(),
                ))
            }
        };

        if data.is_empty() {
            return Ok(house);
        }
        if data.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ClientError::invalid("name", "House name is required"));
        }
        if let Some(max_tenants) = data.max_tenants {
            let count = self.tenant_count(house_id).await?;
            if max_tenants < 1 || (max_tenants as u64) < count {
                return Err(ClientError::invalid(
                    "max_tenants",
                    "Capacity cannot be lower than the current number of tenants",
                ));
            }
        }

        let mut patch = encode_row(&data)?;
        patch.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));

        let mut rows = self
            .remote
            .update(Query::table(Table::Houses).eq("id", house_id), patch)
            .await?;
        if rows.is_empty() {
            return Err(ClientError::house_not_found());
        }
        let updated: House = decode_row(rows.swap_remove(0))?;

        info!(house_id = %house_id, "House updated");
        Ok(updated)
    }

    pub async fn tenant_count(&self, house_id: Uuid) -> ClientResult<u64> {
        Ok(self
            .remote
            .count(Query::table(Table::HouseMembers).eq("house_id", house_id))
            .await?)
    }

    async fn hosted_house(&self, user_id: Uuid) -> ClientResult<Option<House>> {
        let row = self
            .remote
            .select_one(Query::table(Table::Houses).eq("host_id", user_id))
            .await?;
        Ok(row.map(decode_row).transpose()?)
    }

    async fn membership_of(&self, user_id: Uuid) -> ClientResult<Option<HouseMember>> {
        let row = self
            .remote
            .select_one(Query::table(Table::HouseMembers).eq("user_id", user_id))
            .await?;
        Ok(row.map(decode_row).transpose()?)
    }
}
