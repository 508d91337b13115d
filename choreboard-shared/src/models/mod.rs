/// Data models for Choreboard
///
/// Each model mirrors one remote table (or a view model assembled from
/// several). Rows travel as JSON objects; these types are what the services
/// decode them into.
///
/// # Models
///
/// - `user`: User profiles with their fixed role
/// - `house`: Houses owned by a host, plus the join-screen view model
/// - `membership`: Tenant membership rows
/// - `chore`: Chores, their status lifecycle, and the list view model
///
/// # Example
///
/// ```
/// use choreboard_shared::models::chore::{Chore, ChoreStatus};
///
/// let row = serde_json::json!({
///     "id": "6f1c1c2e-8a3b-4d6a-9d3e-2a7f1f1b0c11",
///     "house_id": "0b7e1e1a-3c2d-4f4a-8b6e-1d2c3b4a5f60",
///     "title": "Take out the bins",
///     "created_by_user_id": "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d",
///     "status": "not_done",
///     "created_at": "2026-01-05T10:00:00Z"
/// });
///
/// let chore: Chore = serde_json::from_value(row).unwrap();
/// assert_eq!(chore.status, ChoreStatus::NotDone);
/// assert!(chore.completed_at.is_none());
/// ```

pub mod chore;
pub mod house;
pub mod membership;
pub mod user;
