use thiserror::Error;

use super::query::Table;

/// Remote service errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// The auth service rejected the request (bad credentials, unverified
    /// email, duplicate signup, ...). The message is the service's own.
    #[error("{0}")]
    Auth(String),

    /// The call needs a signed-in session and there is none
    #[error("User not authenticated")]
    NotAuthenticated,

    /// A single-row read found nothing
    #[error("{0} row not found")]
    NotFound(Table),

    /// The request names a column the deployed schema does not have
    #[error("column {table}.{column} does not exist")]
    SchemaMismatch { table: Table, column: String },

    /// A unique constraint rejected the write
    #[error("{0}")]
    Conflict(String),

    /// The service answered with an error status
    #[error("Remote service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The request never got an answer
    #[error("Network error: {0}")]
    Transport(String),

    /// The answer could not be decoded
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// True when the failure comes from a column missing in the deployed schema
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, RemoteError::SchemaMismatch { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

/// Result alias for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RemoteError::SchemaMismatch {
            table: Table::Chores,
            column: "archived".to_string(),
        };
        assert_eq!(err.to_string(), "column chores.archived does not exist");
        assert!(err.is_schema_mismatch());

        assert_eq!(RemoteError::NotAuthenticated.to_string(), "User not authenticated");
        assert_eq!(
            RemoteError::Auth("Invalid login credentials".to_string()).to_string(),
            "Invalid login credentials"
        );
        assert!(RemoteError::NotFound(Table::Houses).is_not_found());
    }
}
