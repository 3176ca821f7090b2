//! Velocity - PC optimizer daemon
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Axum for the dashboard/admin HTTP API with rate limiting
//! - sysinfo for host metric sampling
//! - Tokio for async runtime; supervised plugins for long-running services

mod entity;
mod error;
mod metrics;
mod plugins;
mod prelude;
mod score;
mod state;
mod sv;
mod tweaks;
mod utils;

use std::{collections::HashSet, env, sync::Arc};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::prelude::*;
use crate::state::{AppState, Config};

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "velocity=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let admins: HashSet<String> = env::var("ADMIN_EMAILS")
    .unwrap_or_default()
    .split(',')
    .map(|email| email.trim().to_lowercase())
    .filter(|email| !email.is_empty())
    .collect();

  let db_url =
    env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:velocity.db?mode=rwc".into());

  info!("Starting Velocity daemon v{}", env!("CARGO_PKG_VERSION"));

  let config = Config::from_env();
  let app = Arc::new(AppState::new(&db_url, admins, config).await);

  if app.admins.is_empty() {
    warn!("No admin emails configured, the admin panel is unreachable");
  } else if let Err(err) =
    app.sv().profile.bootstrap_admins(app.admins.iter().cloned()).await
  {
    warn!("Admin bootstrap failed: {err}");
  }

  plugins::App::new()
    .register(plugins::server::Server)
    .register(plugins::scheduler::Scheduler)
    .run(app)
    .await;

  tokio::signal::ctrl_c().await.expect("Failed to listen for shutdown signal");
  info!("Shutting down");
}
