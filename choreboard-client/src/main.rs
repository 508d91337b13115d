//! # Choreboard CLI
//!
//! Minimal app shell: loads configuration, settles the startup session,
//! optionally signs in with configured credentials, refreshes the
//! household state and logs a dashboard summary.
//!
//! ## Usage
//!
//! ```bash
//! CHOREBOARD_REMOTE__URL=https://project.example.co \
//! CHOREBOARD_REMOTE__ANON_KEY=... \
//! cargo run -p choreboard-client
//! ```

use choreboard_client::config::ClientConfig;
use choreboard_client::Choreboard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "choreboard=debug,choreboard_client=debug,choreboard_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Choreboard v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env()?;
    let app = Choreboard::from_config(&config)?;

    let auth_state = app.auth_state(config.auth.restore_session);
    auth_state.initialize().await;

    if auth_state.user().await.is_none() {
        match config.credentials() {
            Some((email, password)) => {
                auth_state.sign_in(email, password).await?;
            }
            None => {
                tracing::info!("Not signed in; set CHOREBOARD_AUTH__EMAIL and CHOREBOARD_AUTH__PASSWORD to sign in");
                return Ok(());
            }
        }
    }

    let app_state = app.app_state(auth_state.clone());
    app_state.refresh_all().await;

    let Some(user) = auth_state.user().await else {
        return Ok(());
    };

    if app_state.is_first_time_user().await {
        tracing::info!(username = %user.username, role = %user.role, "No house yet");
        if user.is_tenant() {
            for house in app.houses.get_available_houses().await? {
                tracing::info!(
                    house = %house.house.name,
                    host = house.host_username.as_deref().unwrap_or("unknown"),
                    tenants = house.current_tenant_count,
                    max_tenants = house.house.max_tenants,
                    full = house.is_full(),
                    "Available house"
                );
            }
        }
        return Ok(());
    }

    let snapshot = app_state.snapshot().await;
    if let Some(house) = &snapshot.current_house {
        tracing::info!(
            house = %house.name,
            members = snapshot.tenants.len(),
            active = app_state.active_chores().await.len(),
            archived = snapshot.archived_chores.len(),
            "Dashboard"
        );
    }

    for item in app_state.active_chores().await {
        tracing::info!(
            title = %item.chore.title,
            status = %item.chore.status,
            assignee = item.assigned_user.as_ref().map(|u| u.username.as_str()).unwrap_or("unassigned"),
            "Chore"
        );
    }

    Ok(())
}
