/// Error handling for the client
///
/// Every service call returns `Result<T, ClientError>`. The variants follow
/// the failure taxonomy the app shows to users: authentication,
/// authorization, missing rows, conflicts, invalid input, and the remote or
/// storage layer failing underneath. `Display` yields the message meant for
/// the user, so callers can surface it verbatim.
///
/// # Example
///
/// ```
/// use choreboard_client::error::{ClientError, ClientResult};
///
/// fn check(is_host: bool) -> ClientResult<()> {
///     if !is_host {
///         return Err(ClientError::Permission("Only the host can assign chores".to_string()));
///     }
///     Ok(())
/// }
///
/// assert_eq!(check(false).unwrap_err().to_string(), "Only the host can assign chores");
/// ```

use choreboard_shared::remote::RemoteError;
use choreboard_shared::storage::StorageError;
use serde::{Deserialize, Serialize};

pub const MSG_NOT_AUTHENTICATED: &str = "User not authenticated";
pub const MSG_CHORE_NOT_FOUND: &str = "Chore not found";
pub const MSG_HOUSE_NOT_FOUND: &str = "House not found";

/// Client result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// Unified client error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Not signed in, bad credentials, unverified email
    #[error("{0}")]
    Authentication(String),

    /// The actor's role or membership does not allow the action
    #[error("{0}")]
    Permission(String),

    #[error("{0}")]
    NotFound(String),

    /// House full, duplicate membership, second house
    #[error("{0}")]
    Conflict(String),

    /// Input rejected before any remote call
    #[error("{}", join_details(.0))]
    Validation(Vec<ValidationErrorDetail>),

    #[error(transparent)]
    Remote(RemoteError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

fn join_details(details: &[ValidationErrorDetail]) -> String {
    if details.is_empty() {
        return "Validation failed".to_string();
    }
    details
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    pub fn not_authenticated() -> Self {
        ClientError::Authentication(MSG_NOT_AUTHENTICATED.to_string())
    }

    pub fn chore_not_found() -> Self {
        ClientError::NotFound(MSG_CHORE_NOT_FOUND.to_string())
    }

    pub fn house_not_found() -> Self {
        ClientError::NotFound(MSG_HOUSE_NOT_FOUND.to_string())
    }

    /// Single-field validation failure
    pub fn invalid(field: &str, message: &str) -> Self {
        ClientError::Validation(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, ClientError::Permission(_))
    }
}

impl From<RemoteError> for ClientError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Auth(message) => ClientError::Authentication(message),
            RemoteError::NotAuthenticated => ClientError::not_authenticated(),
            other => ClientError::Remote(other),
        }
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        // field_errors() is a map; keep the output stable
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ClientError::Validation(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choreboard_shared::remote::query::Table;

    #[test]
    fn test_messages_are_verbatim() {
        let err = ClientError::Permission("You do not have permission to delete this chore".to_string());
        assert_eq!(err.to_string(), "You do not have permission to delete this chore");
        assert!(err.is_permission());

        assert_eq!(ClientError::chore_not_found().to_string(), "Chore not found");
        assert_eq!(ClientError::house_not_found().to_string(), "House not found");
        assert_eq!(ClientError::not_authenticated().to_string(), "User not authenticated");
    }

    #[test]
    fn test_remote_auth_errors_become_authentication() {
        let err = ClientError::from(RemoteError::Auth("Invalid login credentials".to_string()));
        assert!(matches!(err, ClientError::Authentication(ref m) if m == "Invalid login credentials"));

        let err = ClientError::from(RemoteError::NotAuthenticated);
        assert!(matches!(err, ClientError::Authentication(_)));

        let err = ClientError::from(RemoteError::NotFound(Table::Chores));
        assert!(matches!(err, ClientError::Remote(RemoteError::NotFound(Table::Chores))));
    }

    #[test]
    fn test_validation_display() {
        let err = ClientError::Validation(vec![
            ValidationErrorDetail::new("email", "Invalid email format"),
            ValidationErrorDetail::new("password", "Password must be at least 6 characters"),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid email format; Password must be at least 6 characters"
        );
        assert_eq!(ClientError::Validation(vec![]).to_string(), "Validation failed");
    }
}
