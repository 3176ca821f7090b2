mod admin;
mod handlers;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
  Router,
  routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub struct Server;

#[async_trait]
impl super::Plugin for Server {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();

    let router = Router::new()
      .route("/health", get(handlers::health))
      // Auth and session bootstrap
      .route("/api/auth/register", post(handlers::register))
      .route("/api/auth/login", post(handlers::login))
      .route("/api/auth/logout", post(handlers::logout))
      .route("/api/session", get(handlers::session))
      .route("/api/profile", put(handlers::update_profile))
      .route("/api/heartbeat", post(handlers::heartbeat))
      // Dashboard
      .route("/api/metrics", get(handlers::metrics))
      .route("/api/notifications", get(handlers::notifications))
      .route("/api/tweaks", get(handlers::tweaks))
      .route("/api/tweaks/{name}/apply", post(handlers::apply_tweak))
      .route("/api/optimize", post(handlers::optimize))
      .route("/api/license/redeem", post(handlers::redeem))
      // Admin panel
      .route("/api/admin/stats", get(admin::stats))
      .route("/api/admin/users", get(admin::users))
      .route("/api/admin/users/{id}", delete(admin::delete_user))
      .route("/api/admin/users/{id}/role", put(admin::set_role))
      .route("/api/admin/licenses", get(admin::licenses).post(admin::create_licenses))
      .route("/api/admin/licenses/{id}", delete(admin::delete_license))
      .route(
        "/api/admin/notifications",
        get(admin::notifications).post(admin::create_notification),
      )
      .route("/api/admin/notifications/{id}", delete(admin::delete_notification))
      .route(
        "/api/admin/maintenance",
        get(admin::maintenance).put(admin::set_maintenance),
      )
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .with_state(app)
      .into_make_service_with_connect_info::<SocketAddr>();

    let port: u16 =
      std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .context("Failed to bind HTTP listener")?;
    info!("HTTP server listening on {addr}");

    let limiter = async {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
            Ok(_) => info!("Server stopped gracefully"),
            Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}
