//! # Choreboard Client
//!
//! Client-side state layer for Choreboard, a household chore board. Hosts
//! create a house, tenants join it, and members create, assign, complete,
//! archive and delete chores. Storage and authentication live in a hosted
//! backend reached through [`RemoteService`]; the device keeps the session
//! and the locally archived chore IDs in a [`KeyValueStore`].
//!
//! ## Module Organization
//!
//! - `config`: Environment-based configuration
//! - `error`: Client error type
//! - `services`: Auth, house and chore operations with permission checks
//! - `state`: In-memory auth and household state with refresh functions
//!
//! ## Example
//!
//! ```
//! use choreboard_client::Choreboard;
//! use choreboard_shared::remote::memory::MemoryBackend;
//! use choreboard_shared::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let backend = MemoryBackend::new();
//! let app = Choreboard::new(Arc::new(backend.client()), Arc::new(MemoryStore::new()));
//! let auth_state = app.auth_state(false);
//! let _app_state = app.app_state(auth_state);
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod state;

use choreboard_shared::auth::session::SessionStore;
use choreboard_shared::remote::rest::RestRemote;
use choreboard_shared::remote::RemoteService;
use choreboard_shared::storage::{FileStore, KeyValueStore};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::services::{ArchiveLedger, AuthService, ChoreService, HouseService};
use crate::state::{AppState, AuthState};

/// The services of one signed-in device, sharing a remote handle and a
/// key-value store
#[derive(Clone)]
pub struct Choreboard {
    pub auth: AuthService,
    pub houses: HouseService,
    pub chores: ChoreService,
}

impl Choreboard {
    pub fn new(remote: Arc<dyn RemoteService>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            auth: AuthService::new(remote.clone(), SessionStore::new(store.clone())),
            houses: HouseService::new(remote.clone()),
            chores: ChoreService::new(remote, ArchiveLedger::new(store)),
        }
    }

    /// REST backend and on-disk store, as configured
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let remote = RestRemote::new(config.rest_config())?;
        let store = FileStore::new(&config.storage.path);
        Ok(Self::new(Arc::new(remote), Arc::new(store)))
    }

    pub fn auth_state(&self, restore_session: bool) -> Arc<AuthState> {
        Arc::new(AuthState::new(self.auth.clone(), restore_session))
    }

    pub fn app_state(&self, auth: Arc<AuthState>) -> AppState {
        AppState::new(auth, self.houses.clone(), self.chores.clone())
    }
}
