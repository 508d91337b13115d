/// Account operations
///
/// Sign-up creates the auth account and then the `users` profile row with
/// the chosen username and role. Every successful sign-in persists the
/// session through [`SessionStore`] so it can be restored later.

use choreboard_shared::auth::session::{Session, SessionStore};
use choreboard_shared::models::user::{CreateUser, User, UserRole};
use choreboard_shared::remote::query::Table;
use choreboard_shared::remote::{decode_row, encode_row, RemoteError, RemoteService};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError};

use super::access::{fetch_profile, require_user};
use crate::error::{ClientError, ClientResult};

/// Sign-up form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(custom(function = "validate_username"))]
    pub username: String,

    pub role: UserRole,
}

/// At least 3 characters, letters, digits and underscores only
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username.chars().count() >= 3
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("username");
        err.message = Some(
            "Username must be at least 3 characters (letters, numbers, underscores)".into(),
        );
        Err(err)
    }
}

#[derive(Clone)]
pub struct AuthService {
    remote: Arc<dyn RemoteService>,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(remote: Arc<dyn RemoteService>, sessions: SessionStore) -> Self {
        Self { remote, sessions }
    }

    /// Creates the account and its profile
    ///
    /// When the service requires email confirmation no session is returned
    /// and the user must verify before signing in.
    pub async fn sign_up(&self, request: SignUpRequest) -> ClientResult<User> {
        request.validate()?;

        let outcome = self.remote.sign_up(&request.email, &request.password).await?;

        let profile = CreateUser {
            id: outcome.user.id,
            email: request.email.clone(),
            username: request.username.clone(),
            role: request.role,
        };
        let row = self.remote.insert(Table::Users, encode_row(&profile)?).await?;
        let user: User = decode_row(row)?;

        if let Some(session) = &outcome.session {
            self.persist(session).await;
        }

        info!(user_id = %user.id, role = %user.role, "User signed up");
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<User> {
        let session = self.remote.sign_in_with_password(email, password).await?;

        let user = fetch_profile(self.remote.as_ref(), session.user.id)
            .await?
            .ok_or_else(|| ClientError::NotFound("User profile not found".to_string()))?;

        self.persist(&session).await;

        info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.remote.sign_out().await?;
        if let Err(e) = self.sessions.clear().await {
            warn!(error = %e, "Failed to clear stored session");
        }
        info!("User signed out");
        Ok(())
    }

    /// Profile of the signed-in user, or `None` when signed out or the
    /// profile row is missing
    pub async fn current_user(&self) -> ClientResult<Option<User>> {
        let Some(account) = self.remote.get_user().await? else {
            return Ok(None);
        };
        fetch_profile(self.remote.as_ref(), account.id).await
    }

    pub async fn session(&self) -> Option<Session> {
        self.remote.current_session().await
    }

    pub async fn is_email_verified(&self) -> ClientResult<bool> {
        Ok(self
            .remote
            .get_user()
            .await?
            .map(|u| u.is_email_confirmed())
            .unwrap_or(false))
    }

    /// Resends the confirmation email of the signed-in account
    pub async fn resend_verification_email(&self) -> ClientResult<()> {
        let account = require_user(self.remote.as_ref())
            .await
            .map_err(|_| ClientError::Authentication("No user found".to_string()))?;
        if account.email.is_empty() {
            return Err(ClientError::Authentication("No user found".to_string()));
        }
        self.resend_verification_email_to(&account.email).await
    }

    /// Resends the confirmation email to an address that has no session
    /// yet, e.g. right after a sign-up that requires confirmation
    pub async fn resend_verification_email_to(&self, email: &str) -> ClientResult<()> {
        self.remote.resend_verification_email(email).await?;
        debug!("Verification email resent");
        Ok(())
    }

    /// Adopts the session stored on the device
    ///
    /// A stored session the service no longer accepts is discarded and
    /// `None` is returned.
    pub async fn restore_session(&self) -> ClientResult<Option<User>> {
        let stored = match self.sessions.load().await {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "Stored session unreadable, discarding");
                self.sessions.clear().await?;
                return Ok(None);
            }
        };

        match self.remote.set_session(stored).await {
            Ok(()) => {}
            Err(RemoteError::Auth(message)) => {
                debug!(reason = %message, "Stored session rejected");
                self.sessions.clear().await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        // The backend may have refreshed it
        if let Some(session) = self.remote.current_session().await {
            self.persist(&session).await;
        }

        let user = self.current_user().await?;
        if let Some(user) = &user {
            info!(user_id = %user.id, "Session restored");
        }
        Ok(user)
    }

    /// Signs out locally and forgets the stored session
    pub async fn discard_session(&self) {
        if let Err(e) = self.remote.sign_out().await {
            warn!(error = %e, "Error clearing session");
        }
        if let Err(e) = self.sessions.clear().await {
            warn!(error = %e, "Failed to clear stored session");
        }
    }

    async fn persist(&self, session: &Session) {
        if let Err(e) = self.sessions.save(session).await {
            warn!(error = %e, "Failed to persist session");
        }
    }
}
