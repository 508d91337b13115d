use choreboard_shared::auth::session::Session;
use choreboard_shared::models::user::User;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::ClientResult;
use crate::services::{AuthService, SignUpRequest};

/// Snapshot of the signed-in user
#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub loading: bool,
}

/// Holds who is signed in
///
/// Starts out `loading` until [`AuthState::initialize`] has run.
pub struct AuthState {
    auth: AuthService,
    restore_session: bool,
    inner: RwLock<AuthSnapshot>,
}

impl AuthState {
    pub fn new(auth: AuthService, restore_session: bool) -> Self {
        Self {
            auth,
            restore_session,
            inner: RwLock::new(AuthSnapshot {
                loading: true,
                ..AuthSnapshot::default()
            }),
        }
    }

    /// Settles the startup session
    ///
    /// Without `restore_session` any stored session is discarded, so the
    /// user always signs in again on start.
    pub async fn initialize(&self) {
        let user = if self.restore_session {
            match self.auth.restore_session().await {
                Ok(user) => user,
                Err(e) => {
                    error!(error = %e, "Error restoring session");
                    None
                }
            }
        } else {
            self.auth.discard_session().await;
            None
        };

        let session = if user.is_some() {
            self.auth.session().await
        } else {
            None
        };

        *self.inner.write().await = AuthSnapshot {
            user,
            session,
            loading: false,
        };
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<User> {
        let user = self.auth.sign_in(email, password).await?;
        self.set_user(user.clone()).await;
        Ok(user)
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> ClientResult<User> {
        let user = self.auth.sign_up(request).await?;
        self.set_user(user.clone()).await;
        Ok(user)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.auth.sign_out().await?;
        let mut inner = self.inner.write().await;
        inner.user = None;
        inner.session = None;
        info!("Auth state cleared");
        Ok(())
    }

    async fn set_user(&self, user: User) {
        let session = self.auth.session().await;
        let mut inner = self.inner.write().await;
        inner.user = Some(user);
        inner.session = session;
        inner.loading = false;
    }

    pub async fn user(&self) -> Option<User> {
        self.inner.read().await.user.clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.inner.read().await.session.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.read().await.loading
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        self.inner.read().await.clone()
    }

    pub fn service(&self) -> &AuthService {
        &self.auth
    }
}
