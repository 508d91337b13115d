#![allow(dead_code)]

//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A fresh in-memory backend per test
//! - One "device" (remote handle + key-value store) per test user
//! - House setup helpers
//! - A fault-injecting remote for the archive fallback paths

use async_trait::async_trait;
use choreboard_client::services::SignUpRequest;
use choreboard_client::Choreboard;
use choreboard_shared::auth::session::{AuthUser, Session};
use choreboard_shared::models::chore::{Chore, CreateChore};
use choreboard_shared::models::house::{CreateHouse, House};
use choreboard_shared::models::user::{User, UserRole};
use choreboard_shared::remote::memory::{MemoryBackend, MemoryRemote};
use choreboard_shared::remote::query::{Query, Table};
use choreboard_shared::remote::{RemoteError, RemoteResult, RemoteService, Row, SignUpOutcome};
use choreboard_shared::storage::MemoryStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const PASSWORD: &str = "secret123";

/// One signed-in user on their own device
pub struct TestUser {
    pub app: Choreboard,
    pub user: User,
    pub store: Arc<MemoryStore>,
}

/// Test context owning the shared backend
pub struct TestContext {
    pub backend: MemoryBackend,
}

impl TestContext {
    /// Backend with the full schema
    pub fn new() -> Self {
        Self {
            backend: MemoryBackend::new(),
        }
    }

    /// Backend whose `chores` table has no `archived` column
    pub fn without_archived_column() -> Self {
        Self {
            backend: MemoryBackend::builder()
                .without_column(Table::Chores, "archived")
                .build(),
        }
    }

    pub fn with_email_confirmation() -> Self {
        Self {
            backend: MemoryBackend::builder()
                .require_email_confirmation(true)
                .build(),
        }
    }

    /// A signed-out device
    pub fn device(&self) -> (Choreboard, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let app = Choreboard::new(Arc::new(self.backend.client()), store.clone());
        (app, store)
    }

    /// A signed-out device whose remote handle goes through `FaultyRemote`
    pub fn faulty_device(&self, faults: Faults) -> (Choreboard, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let remote = FaultyRemote::new(self.backend.client(), faults);
        let app = Choreboard::new(Arc::new(remote), store.clone());
        (app, store)
    }

    pub fn sign_up_request(name: &str, role: UserRole) -> SignUpRequest {
        SignUpRequest {
            email: format!("{}@example.com", name),
            password: PASSWORD.to_string(),
            username: name.to_string(),
            role,
        }
    }

    /// Signs up a new user on a new device
    pub async fn user(&self, name: &str, role: UserRole) -> TestUser {
        let (app, store) = self.device();
        let user = app
            .auth
            .sign_up(Self::sign_up_request(name, role))
            .await
            .expect("sign up");
        TestUser { app, user, store }
    }

    /// Signs an existing user in on a new device with the given faults
    pub async fn faulty_login(&self, user: &TestUser, faults: Faults) -> TestUser {
        let (app, store) = self.faulty_device(faults);
        let signed_in = app
            .auth
            .sign_in(&user.user.email, PASSWORD)
            .await
            .expect("sign in");
        TestUser {
            app,
            user: signed_in,
            store,
        }
    }

    /// A host with a house
    pub async fn host_with_house(&self, name: &str, max_tenants: i64) -> (TestUser, House) {
        let host = self.user(name, UserRole::Host).await;
        let house = host
            .app
            .houses
            .create_house(CreateHouse {
                name: format!("{}'s house", name),
                description: None,
                max_tenants,
            })
            .await
            .expect("create house");
        (host, house)
    }

    /// A tenant who has joined the house
    pub async fn tenant_in(&self, house: &House, name: &str) -> TestUser {
        let tenant = self.user(name, UserRole::Tenant).await;
        tenant.app.houses.join_house(house.id).await.expect("join house");
        tenant
    }
}

impl TestUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }

    pub async fn create_chore(&self, house: &House, title: &str) -> Chore {
        self.app
            .chores
            .create_chore(CreateChore {
                house_id: house.id,
                title: title.to_string(),
                description: None,
                assigned_to_user_id: None,
            })
            .await
            .expect("create chore")
    }

    /// Creates a chore and marks it done
    pub async fn done_chore(&self, house: &House, title: &str) -> Chore {
        let chore = self.create_chore(house, title).await;
        self.app
            .chores
            .complete_chore(chore.id)
            .await
            .expect("complete chore")
    }
}

/// Which failures `FaultyRemote` injects
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Updates that set `archived` fail with a schema mismatch
    pub reject_archived_writes: bool,

    /// After the first failed update every read fails
    pub break_reads_after_failed_update: bool,
}

/// Remote handle that fails on demand and otherwise delegates
pub struct FaultyRemote {
    inner: MemoryRemote,
    faults: Faults,
    broken: AtomicBool,
}

impl FaultyRemote {
    pub fn new(inner: MemoryRemote, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            broken: AtomicBool::new(false),
        }
    }

    fn check_reads(&self) -> RemoteResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            Err(RemoteError::Transport("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteService for FaultyRemote {
    fn name(&self) -> &str {
        "faulty"
    }

    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<SignUpOutcome> {
        self.inner.sign_up(email, password).await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> RemoteResult<Session> {
        self.inner.sign_in_with_password(email, password).await
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        self.inner.sign_out().await
    }

    async fn get_user(&self) -> RemoteResult<Option<AuthUser>> {
        self.inner.get_user().await
    }

    async fn current_session(&self) -> Option<Session> {
        self.inner.current_session().await
    }

    async fn set_session(&self, session: Session) -> RemoteResult<()> {
        self.inner.set_session(session).await
    }

    async fn resend_verification_email(&self, email: &str) -> RemoteResult<()> {
        self.inner.resend_verification_email(email).await
    }

    async fn select(&self, query: Query) -> RemoteResult<Vec<Row>> {
        self.check_reads()?;
        self.inner.select(query).await
    }

    async fn count(&self, query: Query) -> RemoteResult<u64> {
        self.check_reads()?;
        self.inner.count(query).await
    }

    async fn insert(&self, table: Table, row: Row) -> RemoteResult<Row> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, query: Query, patch: Row) -> RemoteResult<Vec<Row>> {
        if self.faults.reject_archived_writes && patch.contains_key("archived") {
            if self.faults.break_reads_after_failed_update {
                self.broken.store(true, Ordering::SeqCst);
            }
            return Err(RemoteError::SchemaMismatch {
                table: query.table,
                column: "archived".to_string(),
            });
        }
        self.inner.update(query, patch).await
    }

    async fn delete(&self, query: Query) -> RemoteResult<u64> {
        self.inner.delete(query).await
    }
}
