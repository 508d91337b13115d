/// Domain services
///
/// Each service turns a user action into calls against the remote service,
/// checking permissions by reading the related rows first.
///
/// - [`auth::AuthService`]: sign-up, sign-in, sessions, email verification
/// - [`houses::HouseService`]: houses and tenant membership
/// - [`chores::ChoreService`]: chores, including the local archive fallback
/// - [`access`]: shared lookups and permission rules
/// - [`archive_ledger::ArchiveLedger`]: locally archived chore IDs

pub mod access;
pub mod archive_ledger;
pub mod auth;
pub mod chores;
pub mod houses;

pub use archive_ledger::ArchiveLedger;
pub use auth::{AuthService, SignUpRequest};
pub use chores::ChoreService;
pub use houses::HouseService;
