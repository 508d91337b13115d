use choreboard_shared::models::chore::ChoreWithUsers;
use choreboard_shared::models::house::House;
use choreboard_shared::models::user::User;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::auth_state::AuthState;
use crate::services::{ChoreService, HouseService};

/// Snapshot of the signed-in user's household
#[derive(Debug, Clone, Default)]
pub struct AppSnapshot {
    pub current_house: Option<House>,

    /// Every chore of the house, archived ones included
    pub chores: Vec<ChoreWithUsers>,

    pub archived_chores: Vec<ChoreWithUsers>,

    /// Host first, then tenants
    pub tenants: Vec<User>,

    pub loading: bool,
}

/// Holds the current house and its chores and members
///
/// Refreshes never fail: errors are logged and the affected slice is reset
/// to empty. Overlapping refreshes are not serialized; the last one to
/// finish wins.
pub struct AppState {
    auth: Arc<AuthState>,
    houses: HouseService,
    chores: ChoreService,
    inner: RwLock<AppSnapshot>,
}

impl AppState {
    pub fn new(auth: Arc<AuthState>, houses: HouseService, chores: ChoreService) -> Self {
        Self {
            auth,
            houses,
            chores,
            inner: RwLock::new(AppSnapshot::default()),
        }
    }

    async fn house_if_signed_in(&self) -> Option<House> {
        self.auth.user().await?;
        self.inner.read().await.current_house.clone()
    }

    pub async fn refresh_house(&self) {
        let house = if self.auth.user().await.is_none() {
            None
        } else {
            match self.houses.get_current_user_house().await {
                Ok(house) => house,
                Err(e) => {
                    error!(error = %e, "Error refreshing house");
                    None
                }
            }
        };

        let mut inner = self.inner.write().await;
        if house.is_none() {
            inner.chores.clear();
            inner.archived_chores.clear();
            inner.tenants.clear();
        }
        inner.current_house = house;
    }

    pub async fn refresh_chores(&self) {
        let chores = match self.house_if_signed_in().await {
            Some(house) => match self.chores.get_chores_by_house(house.id).await {
                Ok(chores) => chores,
                Err(e) => {
                    error!(house_id = %house.id, error = %e, "Error refreshing chores");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        self.inner.write().await.chores = chores;
    }

    pub async fn refresh_archived_chores(&self) {
        let archived = match self.house_if_signed_in().await {
            Some(house) => match self.chores.get_archived_chores(house.id).await {
                Ok(archived) => archived,
                Err(e) => {
                    error!(house_id = %house.id, error = %e, "Error refreshing archived chores");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        self.inner.write().await.archived_chores = archived;
    }

    pub async fn refresh_tenants(&self) {
        let current = self.inner.read().await.current_house.clone();
        let tenants = match current {
            Some(house) => match self.houses.get_house_members(&house).await {
                Ok(members) => members,
                Err(e) => {
                    error!(house_id = %house.id, error = %e, "Error refreshing tenants");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        self.inner.write().await.tenants = tenants;
    }

    /// Reloads the house, then chores, archived chores and members together
    pub async fn refresh_all(&self) {
        self.inner.write().await.loading = true;

        self.refresh_house().await;
        futures::join!(
            self.refresh_chores(),
            self.refresh_archived_chores(),
            self.refresh_tenants()
        );

        let mut inner = self.inner.write().await;
        inner.loading = false;
        debug!(
            house = inner.current_house.as_ref().map(|h| h.name.as_str()).unwrap_or("-"),
            chores = inner.chores.len(),
            archived = inner.archived_chores.len(),
            members = inner.tenants.len(),
            "App state refreshed"
        );
    }

    /// Chores of the current house that are not archived
    pub async fn active_chores(&self) -> Vec<ChoreWithUsers> {
        self.inner
            .read()
            .await
            .chores
            .iter()
            .filter(|c| !c.chore.is_archived())
            .cloned()
            .collect()
    }

    /// True when the signed-in user neither hosts nor belongs to a house
    pub async fn is_first_time_user(&self) -> bool {
        if self.auth.user().await.is_none() {
            return true;
        }
        match self.houses.get_current_user_house().await {
            Ok(house) => house.is_none(),
            Err(e) => {
                debug!(error = %e, "House lookup failed, treating as first-time user");
                true
            }
        }
    }

    /// Forgets everything, e.g. after sign-out
    pub async fn clear(&self) {
        *self.inner.write().await = AppSnapshot::default();
    }

    pub async fn current_house(&self) -> Option<House> {
        self.inner.read().await.current_house.clone()
    }

    pub async fn chores(&self) -> Vec<ChoreWithUsers> {
        self.inner.read().await.chores.clone()
    }

    pub async fn archived_chores(&self) -> Vec<ChoreWithUsers> {
        self.inner.read().await.archived_chores.clone()
    }

    pub async fn tenants(&self) -> Vec<User> {
        self.inner.read().await.tenants.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.read().await.loading
    }

    pub async fn snapshot(&self) -> AppSnapshot {
        self.inner.read().await.clone()
    }
}
