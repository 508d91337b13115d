/// Remote data service contract
///
/// The hosted backend is an opaque table store with session-based auth. This
/// module defines the [`RemoteService`] trait every backend implements,
/// plus helpers for moving typed models in and out of JSON rows.
///
/// # Backends
///
/// - [`rest::RestRemote`]: HTTP client for the hosted service
/// - [`memory::MemoryBackend`]: complete in-process stand-in, used by tests
///   and demos
///
/// # Contract
///
/// All backends must:
/// 1. Report a filter, sort or write on a column the schema lacks as
///    [`RemoteError::SchemaMismatch`]
/// 2. Report a unique-constraint violation as [`RemoteError::Conflict`]
/// 3. Keep the signed-in session per client handle, not per backend
/// 4. Surface auth failures as [`RemoteError::Auth`] with a readable message
///
/// # Example
///
/// ```
/// use choreboard_shared::remote::{decode_rows, RemoteService};
/// use choreboard_shared::remote::memory::MemoryBackend;
/// use choreboard_shared::remote::query::{Query, Table};
/// use choreboard_shared::models::house::House;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// let client = backend.client();
///
/// let rows = client.select(Query::table(Table::Houses)).await?;
/// let houses: Vec<House> = decode_rows(rows)?;
/// assert!(houses.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod error;
pub mod memory;
pub mod query;
pub mod rest;

pub use error::{RemoteError, RemoteResult};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::session::{AuthUser, Session};
use query::{Query, Table};

/// One table row as a JSON object
pub type Row = Map<String, Value>;

/// Result of a signup request
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    /// The newly created account
    pub user: AuthUser,

    /// Present when the service signs the user in right away (no email
    /// confirmation required)
    pub session: Option<Session>,
}

/// Hosted table store with session-based authentication
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Backend name, used in logs
    fn name(&self) -> &str;

    /// Creates an auth account
    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<SignUpOutcome>;

    /// Signs in with email and password and keeps the session on this handle
    async fn sign_in_with_password(&self, email: &str, password: &str) -> RemoteResult<Session>;

    /// Ends the session on this handle
    async fn sign_out(&self) -> RemoteResult<()>;

    /// Asks the service who the current session belongs to
    ///
    /// Returns `Ok(None)` when there is no session or the service no longer
    /// accepts it.
    async fn get_user(&self) -> RemoteResult<Option<AuthUser>>;

    /// The session held by this handle, as last seen
    async fn current_session(&self) -> Option<Session>;

    /// Adopts a previously persisted session
    async fn set_session(&self, session: Session) -> RemoteResult<()>;

    /// Sends the signup confirmation email again
    async fn resend_verification_email(&self, email: &str) -> RemoteResult<()>;

    /// Reads rows matching the query
    async fn select(&self, query: Query) -> RemoteResult<Vec<Row>>;

    /// Counts rows matching the query
    async fn count(&self, query: Query) -> RemoteResult<u64>;

    /// Inserts one row and returns it as stored (with defaults filled in)
    async fn insert(&self, table: Table, row: Row) -> RemoteResult<Row>;

    /// Applies `patch` to every matching row and returns the updated rows
    async fn update(&self, query: Query, patch: Row) -> RemoteResult<Vec<Row>>;

    /// Deletes every matching row and returns how many were removed
    async fn delete(&self, query: Query) -> RemoteResult<u64>;

    /// Reads at most one row
    async fn select_one(&self, query: Query) -> RemoteResult<Option<Row>> {
        let mut rows = self.select(query.limit(1)).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }
}

/// Serializes a model into a row
pub fn encode_row<T: Serialize>(value: &T) -> RemoteResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(RemoteError::Decode(format!("expected an object, got {}", other))),
    }
}

/// Deserializes a row into a model
pub fn decode_row<T: DeserializeOwned>(row: Row) -> RemoteResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Deserializes rows into models
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> RemoteResult<Vec<T>> {
    rows.into_iter().map(decode_row).collect()
}
