/// In-memory state providers
///
/// [`AuthState`] tracks the signed-in user; [`AppState`] tracks that user's
/// house, chores and members and reads the user from an `AuthState`.

pub mod app_state;
pub mod auth_state;

pub use app_state::{AppSnapshot, AppState};
pub use auth_state::{AuthSnapshot, AuthState};
