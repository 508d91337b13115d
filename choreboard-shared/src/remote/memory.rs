/// In-process remote backend
///
/// [`MemoryBackend`] holds the four tables, the auth accounts and an outbox of
/// verification emails behind one lock. Each [`MemoryRemote`] handle created
/// by [`MemoryBackend::client`] keeps its own session, the way two devices
/// signed in to the hosted service would.
///
/// The backend enforces the same contract as the hosted service: unknown
/// columns fail with [`RemoteError::SchemaMismatch`], unique keys fail with
/// [`RemoteError::Conflict`], and session tokens are signed JWTs. A column
/// can be dropped from a table with [`MemoryBackendBuilder::without_column`]
/// to mimic an older deployment.
///
/// Row-level security is not modelled; any handle may read any row.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::query::{Query, Table};
use super::{RemoteError, RemoteResult, RemoteService, Row, SignUpOutcome};
use crate::auth::jwt::{create_token, validate_token, JwtError, SessionClaims};
use crate::auth::password::{hash_password_with, verify_password, HashParams, PasswordError};
use crate::auth::session::{AuthUser, Session};

const ISSUER: &str = "choreboard-memory";

const MSG_ALREADY_REGISTERED: &str = "User already registered";
const MSG_INVALID_CREDENTIALS: &str = "Invalid login credentials";
const MSG_EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";

fn table_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Users => &["id", "email", "username", "role", "created_at", "updated_at"],
        Table::Houses => &[
            "id",
            "name",
            "description",
            "max_tenants",
            "host_id",
            "created_at",
            "updated_at",
        ],
        Table::HouseMembers => &["id", "house_id", "user_id", "joined_at"],
        Table::Chores => &[
            "id",
            "house_id",
            "title",
            "description",
            "assigned_to_user_id",
            "created_by_user_id",
            "status",
            "archived",
            "created_at",
            "updated_at",
            "completed_at",
        ],
    }
}

/// Column sets that must be unique per table
fn unique_keys(table: Table) -> &'static [(&'static str, &'static [&'static str])] {
    match table {
        Table::Users => &[("users_pkey", &["id"]), ("users_email_key", &["email"])],
        Table::Houses => &[("houses_pkey", &["id"])],
        Table::HouseMembers => &[
            ("house_members_pkey", &["id"]),
            ("house_members_house_id_user_id_key", &["house_id", "user_id"]),
        ],
        Table::Chores => &[("chores_pkey", &["id"])],
    }
}

fn timestamp_now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true))
}

#[derive(Debug)]
struct TableData {
    columns: Vec<&'static str>,
    rows: Vec<Row>,
}

impl TableData {
    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| *c == column)
    }

    fn fill_defaults(&self, row: &mut Row) {
        for column in &self.columns {
            if row.contains_key(*column) {
                continue;
            }
            let default = match *column {
                "id" => Value::String(Uuid::new_v4().to_string()),
                "created_at" | "joined_at" => timestamp_now(),
                "archived" => Value::Bool(false),
                _ => Value::Null,
            };
            row.insert(column.to_string(), default);
        }
    }

    /// Finds a unique key that `row` would duplicate, skipping row `skip`
    fn violated_key(&self, table: Table, row: &Row, skip: Option<usize>) -> Option<&'static str> {
        unique_keys(table).iter().find_map(|(name, cols)| {
            let clash = self.rows.iter().enumerate().any(|(i, existing)| {
                Some(i) != skip
                    && cols.iter().all(|c| {
                        let value = row.get(*c).unwrap_or(&Value::Null);
                        !value.is_null() && existing.get(*c) == Some(value)
                    })
            });
            clash.then_some(*name)
        })
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: Uuid,
    email: String,
    password_hash: String,
    email_confirmed_at: Option<DateTime<Utc>>,
}

impl Account {
    fn auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.clone(),
            email_confirmed_at: self.email_confirmed_at,
        }
    }
}

#[derive(Debug)]
struct MemoryState {
    tables: HashMap<Table, TableData>,
    /// Accounts keyed by lowercased email
    accounts: HashMap<String, Account>,
    outbox: Vec<String>,
    revoked_tokens: HashSet<String>,
}

impl MemoryState {
    fn table(&self, table: Table) -> &TableData {
        // Every table is created by the builder
        &self.tables[&table]
    }

    fn table_mut(&mut self, table: Table) -> &mut TableData {
        self.tables.entry(table).or_insert_with(|| TableData {
            columns: table_columns(table).to_vec(),
            rows: Vec::new(),
        })
    }

    fn account_by_id(&self, id: Uuid) -> Option<&Account> {
        self.accounts.values().find(|a| a.id == id)
    }
}

#[derive(Debug)]
struct BackendSettings {
    secret: String,
    require_email_confirmation: bool,
    hash_params: HashParams,
}

/// Configures a [`MemoryBackend`]
#[derive(Debug)]
pub struct MemoryBackendBuilder {
    removed_columns: Vec<(Table, String)>,
    require_email_confirmation: bool,
    hash_params: HashParams,
}

impl MemoryBackendBuilder {
    /// Drops a column from a table's schema
    pub fn without_column(mut self, table: Table, column: &str) -> Self {
        self.removed_columns.push((table, column.to_string()));
        self
    }

    /// When set, new accounts cannot sign in until their email is confirmed
    pub fn require_email_confirmation(mut self, required: bool) -> Self {
        self.require_email_confirmation = required;
        self
    }

    pub fn password_hash_params(mut self, params: HashParams) -> Self {
        self.hash_params = params;
        self
    }

    pub fn build(self) -> MemoryBackend {
        let tables = Table::ALL
            .iter()
            .map(|&table| {
                let columns = table_columns(table)
                    .iter()
                    .copied()
                    .filter(|c| {
                        !self
                            .removed_columns
                            .iter()
                            .any(|(t, removed)| *t == table && removed == c)
                    })
                    .collect();
                (table, TableData { columns, rows: Vec::new() })
            })
            .collect();

        MemoryBackend {
            state: Arc::new(RwLock::new(MemoryState {
                tables,
                accounts: HashMap::new(),
                outbox: Vec::new(),
                revoked_tokens: HashSet::new(),
            })),
            settings: Arc::new(BackendSettings {
                secret: Uuid::new_v4().to_string(),
                require_email_confirmation: self.require_email_confirmation,
                hash_params: self.hash_params,
            }),
        }
    }
}

/// Shared in-process backend; clones share the same data
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
    settings: Arc<BackendSettings>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Backend with the full schema and no email confirmation step
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MemoryBackendBuilder {
        MemoryBackendBuilder {
            removed_columns: Vec::new(),
            require_email_confirmation: false,
            hash_params: HashParams::light(),
        }
    }

    /// New client handle with no session
    pub fn client(&self) -> MemoryRemote {
        MemoryRemote {
            backend: self.clone(),
            session: RwLock::new(None),
        }
    }

    /// Marks an account's email as confirmed; returns false for unknown emails
    pub async fn confirm_email(&self, email: &str) -> bool {
        let mut state = self.state.write().await;
        match state.accounts.get_mut(&email.to_lowercase()) {
            Some(account) => {
                account.email_confirmed_at.get_or_insert_with(Utc::now);
                true
            }
            None => false,
        }
    }

    /// Addresses verification emails were sent to, oldest first
    pub async fn sent_verification_emails(&self) -> Vec<String> {
        self.state.read().await.outbox.clone()
    }

    pub async fn row_count(&self, table: Table) -> usize {
        self.state.read().await.table(table).rows.len()
    }

    fn issue_session(&self, account: &Account) -> RemoteResult<Session> {
        let claims = SessionClaims::new(account.id, &account.email, ISSUER);
        let access_token = create_token(&claims, &self.settings.secret).map_err(jwt_error)?;

        Ok(Session {
            access_token,
            refresh_token: Uuid::new_v4().simple().to_string(),
            expires_at: claims.expires_at(),
            user: account.auth_user(),
        })
    }

    /// Resolves a token to its account, or `None` if the token is not usable
    async fn account_for_token(&self, token: &str) -> Option<Account> {
        let claims = validate_token(token, &self.settings.secret, ISSUER).ok()?;
        let state = self.state.read().await;
        if state.revoked_tokens.contains(token) {
            return None;
        }
        state.account_by_id(claims.sub).cloned()
    }
}

fn jwt_error(err: JwtError) -> RemoteError {
    RemoteError::Service {
        status: 500,
        message: err.to_string(),
    }
}

fn password_error(err: PasswordError) -> RemoteError {
    RemoteError::Service {
        status: 500,
        message: err.to_string(),
    }
}

fn check_columns<'a>(
    data: &TableData,
    table: Table,
    mut columns: impl Iterator<Item = &'a str>,
) -> RemoteResult<()> {
    match columns.find(|c| !data.has_column(c)) {
        Some(column) => Err(RemoteError::SchemaMismatch {
            table,
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

/// Orders two cell values; nulls sort after everything else
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Runs a query against a table and returns matching row indexes, ordered
/// and limited
fn matching_indexes(data: &TableData, query: &Query) -> Vec<usize> {
    let mut indexes: Vec<usize> = data
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| query.matches(row))
        .map(|(i, _)| i)
        .collect();

    if let Some(order) = &query.order {
        let key = |i: &usize| data.rows[*i].get(&order.column).cloned().unwrap_or(Value::Null);
        indexes.sort_by(|a, b| compare_values(&key(a), &key(b)));
        // Descending: later inserts win ties, nulls come first
        if !order.ascending {
            indexes.reverse();
        }
    }

    if let Some(limit) = query.limit {
        indexes.truncate(limit);
    }

    indexes
}

/// Client handle onto a [`MemoryBackend`] with its own session
#[derive(Debug)]
pub struct MemoryRemote {
    backend: MemoryBackend,
    session: RwLock<Option<Session>>,
}

impl MemoryRemote {
    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }
}

#[async_trait]
impl RemoteService for MemoryRemote {
    fn name(&self) -> &str {
        "memory"
    }

    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<SignUpOutcome> {
        let key = email.trim().to_lowercase();
        if key.is_empty() || password.is_empty() {
            return Err(RemoteError::Auth(
                "Signup requires a valid email and password".to_string(),
            ));
        }

        if self.backend.state.read().await.accounts.contains_key(&key) {
            return Err(RemoteError::Auth(MSG_ALREADY_REGISTERED.to_string()));
        }

        // Hash before taking the write lock
        let password_hash =
            hash_password_with(password, &self.backend.settings.hash_params).map_err(password_error)?;

        let confirmation_required = self.backend.settings.require_email_confirmation;
        let account = Account {
            id: Uuid::new_v4(),
            email: email.trim().to_string(),
            password_hash,
            email_confirmed_at: (!confirmation_required).then(Utc::now),
        };

        {
            let mut state = self.backend.state.write().await;
            if state.accounts.contains_key(&key) {
                return Err(RemoteError::Auth(MSG_ALREADY_REGISTERED.to_string()));
            }
            state.accounts.insert(key, account.clone());
            if confirmation_required {
                state.outbox.push(account.email.clone());
            }
        }

        info!(user_id = %account.id, confirmation_required, "Account created");

        let session = if confirmation_required {
            None
        } else {
            let session = self.backend.issue_session(&account)?;
            *self.session.write().await = Some(session.clone());
            Some(session)
        };

        Ok(SignUpOutcome {
            user: account.auth_user(),
            session,
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> RemoteResult<Session> {
        let account = self
            .backend
            .state
            .read()
            .await
            .accounts
            .get(&email.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| RemoteError::Auth(MSG_INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &account.password_hash).map_err(password_error)? {
            debug!(user_id = %account.id, "Password mismatch");
            return Err(RemoteError::Auth(MSG_INVALID_CREDENTIALS.to_string()));
        }

        if account.email_confirmed_at.is_none() {
            return Err(RemoteError::Auth(MSG_EMAIL_NOT_CONFIRMED.to_string()));
        }

        let session = self.backend.issue_session(&account)?;
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        if let Some(session) = self.session.write().await.take() {
            self.backend
                .state
                .write()
                .await
                .revoked_tokens
                .insert(session.access_token);
        }
        Ok(())
    }

    async fn get_user(&self) -> RemoteResult<Option<AuthUser>> {
        let Some(token) = self.session.read().await.as_ref().map(|s| s.access_token.clone()) else {
            return Ok(None);
        };

        Ok(self
            .backend
            .account_for_token(&token)
            .await
            .map(|account| account.auth_user()))
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn set_session(&self, session: Session) -> RemoteResult<()> {
        if self.backend.account_for_token(&session.access_token).await.is_none() {
            return Err(RemoteError::Auth("Invalid session".to_string()));
        }
        *self.session.write().await = Some(session);
        Ok(())
    }

    async fn resend_verification_email(&self, email: &str) -> RemoteResult<()> {
        let mut state = self.backend.state.write().await;
        let pending = state
            .accounts
            .get(&email.trim().to_lowercase())
            .filter(|a| a.email_confirmed_at.is_none())
            .map(|a| a.email.clone());

        if let Some(address) = pending {
            state.outbox.push(address);
        }
        Ok(())
    }

    async fn select(&self, query: Query) -> RemoteResult<Vec<Row>> {
        let state = self.backend.state.read().await;
        let data = state.table(query.table);
        check_columns(data, query.table, query.columns())?;

        Ok(matching_indexes(data, &query)
            .into_iter()
            .map(|i| data.rows[i].clone())
            .collect())
    }

    async fn count(&self, query: Query) -> RemoteResult<u64> {
        let query = Query {
            order: None,
            limit: None,
            ..query
        };
        let state = self.backend.state.read().await;
        let data = state.table(query.table);
        check_columns(data, query.table, query.columns())?;

        Ok(matching_indexes(data, &query).len() as u64)
    }

    async fn insert(&self, table: Table, mut row: Row) -> RemoteResult<Row> {
        let mut state = self.backend.state.write().await;
        let data = state.table_mut(table);
        check_columns(data, table, row.keys().map(String::as_str))?;

        data.fill_defaults(&mut row);
        if let Some(key) = data.violated_key(table, &row, None) {
            return Err(RemoteError::Conflict(format!(
                "duplicate key value violates unique constraint \"{}\"",
                key
            )));
        }

        data.rows.push(row.clone());
        debug!(table = %table, "Inserted row");
        Ok(row)
    }

    async fn update(&self, query: Query, patch: Row) -> RemoteResult<Vec<Row>> {
        let table = query.table;
        let mut state = self.backend.state.write().await;
        let data = state.table_mut(table);
        check_columns(data, table, query.columns().chain(patch.keys().map(String::as_str)))?;

        let indexes = matching_indexes(data, &query);

        let mut updated = Vec::with_capacity(indexes.len());
        for &i in &indexes {
            let mut row = data.rows[i].clone();
            row.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
            if let Some(key) = data.violated_key(table, &row, Some(i)) {
                return Err(RemoteError::Conflict(format!(
                    "duplicate key value violates unique constraint \"{}\"",
                    key
                )));
            }
            updated.push((i, row));
        }

        for (i, row) in &updated {
            data.rows[*i] = row.clone();
        }

        debug!(table = %table, rows = updated.len(), "Updated rows");
        Ok(updated.into_iter().map(|(_, row)| row).collect())
    }

    async fn delete(&self, query: Query) -> RemoteResult<u64> {
        let table = query.table;
        let mut state = self.backend.state.write().await;
        let data = state.table_mut(table);
        check_columns(data, table, query.columns())?;

        let doomed: HashSet<usize> = matching_indexes(data, &query).into_iter().collect();
        let mut index = 0;
        data.rows.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });

        debug!(table = %table, rows = doomed.len(), "Deleted rows");
        Ok(doomed.len() as u64)
    }
}
