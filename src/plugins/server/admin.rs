//! Admin panel endpoints: users, licenses, notifications, maintenance.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use super::handlers::{Status, authorize_admin};
use crate::{
  entity::{Role, license_key, notification, profile},
  prelude::*,
  state::AppState,
};

const MAX_BATCH_QUANTITY: u32 = 100;
const MAX_DURATION_DAYS: i64 = 3650;
const MAX_NOTIFICATION_TTL_HOURS: i64 = 720;

#[derive(Debug, Serialize)]
pub struct AdminStats {
  pub users: u64,
  pub admins: u64,
  pub licenses: u64,
  pub licenses_unused: u64,
  pub active_subscriptions: u64,
  pub notifications: u64,
  pub maintenance: bool,
}

pub async fn stats(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<AdminStats>> {
  authorize_admin(&app, &headers).await?;
  let sv = app.sv();

  Ok(Json(AdminStats {
    users: sv.profile.count().await?,
    admins: sv.profile.admin_count().await?,
    licenses: sv.license.count().await?,
    licenses_unused: sv.license.count_unused().await?,
    active_subscriptions: sv.subscription.count_active().await?,
    notifications: sv.notification.count().await?,
    maintenance: sv.config.maintenance_mode().await?,
  }))
}

#[derive(Debug, Serialize)]
pub struct UserView {
  pub profile: profile::Model,
  pub role: Role,
}

pub async fn users(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<UserView>>> {
  authorize_admin(&app, &headers).await?;
  let sv = app.sv();

  let mut out = Vec::new();
  for profile in sv.profile.all().await? {
    let role = sv.profile.role_of(&profile.id).await?;
    out.push(UserView { profile, role });
  }

  Ok(Json(out))
}

pub async fn delete_user(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
) -> Result<Json<Status>> {
  let admin = authorize_admin(&app, &headers).await?;

  if admin.id == id {
    return Err(Error::Invalid("Admins cannot delete their own account".into()));
  }

  app.sv().profile.delete(&id).await?;
  app.drop_sessions_for(&id);
  info!("Deleted account {id}");

  Ok(Json(Status::ok()))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleReq {
  pub role: Role,
}

pub async fn set_role(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
  Json(req): Json<SetRoleReq>,
) -> Result<Json<Status>> {
  authorize_admin(&app, &headers).await?;
  app.sv().profile.set_role(&id, req.role).await?;
  Ok(Json(Status::ok()))
}

pub async fn licenses(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<license_key::Model>>> {
  authorize_admin(&app, &headers).await?;
  Ok(Json(app.sv().license.all().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateLicensesReq {
  pub duration_days: i64,
  #[serde(default = "default_quantity")]
  pub quantity: u32,
}

fn default_quantity() -> u32 {
  1
}

pub async fn create_licenses(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<CreateLicensesReq>,
) -> Result<Json<Vec<license_key::Model>>> {
  let admin = authorize_admin(&app, &headers).await?;

  if !(1..=MAX_DURATION_DAYS).contains(&req.duration_days) {
    return Err(Error::Invalid(format!(
      "Duration must be between 1 and {MAX_DURATION_DAYS} days"
    )));
  }
  if !(1..=MAX_BATCH_QUANTITY).contains(&req.quantity) {
    return Err(Error::Invalid(format!(
      "Quantity must be between 1 and {MAX_BATCH_QUANTITY}"
    )));
  }

  let keys = app
    .sv()
    .license
    .create_batch(Some(&admin.id), req.duration_days, req.quantity)
    .await?;

  info!("{} created {} license key(s)", admin.email, keys.len());
  Ok(Json(keys))
}

pub async fn delete_license(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
) -> Result<Json<Status>> {
  authorize_admin(&app, &headers).await?;
  app.sv().license.delete(&id).await?;
  Ok(Json(Status::ok()))
}

pub async fn notifications(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<notification::Model>>> {
  authorize_admin(&app, &headers).await?;
  Ok(Json(app.sv().notification.all().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationReq {
  pub title: String,
  pub message: String,
  pub ttl_hours: i64,
}

pub async fn create_notification(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<CreateNotificationReq>,
) -> Result<Json<notification::Model>> {
  let admin = authorize_admin(&app, &headers).await?;

  if req.title.trim().is_empty() || req.message.trim().is_empty() {
    return Err(Error::Invalid("Title and message must not be empty".into()));
  }
  if !(1..=MAX_NOTIFICATION_TTL_HOURS).contains(&req.ttl_hours) {
    return Err(Error::Invalid(format!(
      "TTL must be between 1 and {MAX_NOTIFICATION_TTL_HOURS} hours"
    )));
  }

  let created = app
    .sv()
    .notification
    .create(
      Some(&admin.id),
      &req.title,
      &req.message,
      TimeDelta::hours(req.ttl_hours),
    )
    .await?;

  Ok(Json(created))
}

pub async fn delete_notification(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
) -> Result<Json<Status>> {
  authorize_admin(&app, &headers).await?;
  app.sv().notification.delete(&id).await?;
  Ok(Json(Status::ok()))
}

#[derive(Debug, Serialize)]
pub struct MaintenanceRes {
  pub enabled: bool,
}

pub async fn maintenance(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<MaintenanceRes>> {
  authorize_admin(&app, &headers).await?;
  Ok(Json(MaintenanceRes { enabled: app.sv().config.maintenance_mode().await? }))
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceReq {
  pub enabled: bool,
}

/// Flip the kill switch. Open non-admin sessions are not torn down here;
/// they sign out on their next auth-data fetch.
pub async fn set_maintenance(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<MaintenanceReq>,
) -> Result<Json<MaintenanceRes>> {
  let admin = authorize_admin(&app, &headers).await?;

  app.sv().config.set_maintenance(req.enabled).await?;
  info!(
    "Maintenance mode {} by {}",
    if req.enabled { "enabled" } else { "disabled" },
    admin.email
  );

  Ok(Json(MaintenanceRes { enabled: req.enabled }))
}

#[cfg(test)]
mod tests {
  use axum::http::header;

  use super::*;
  use crate::state::tests::test_state;

  fn auth_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      format!("Bearer {token}").parse().unwrap(),
    );
    headers
  }

  async fn seeded_admin(app: &Arc<AppState>) -> (profile::Model, HeaderMap) {
    let sv = app.sv();
    let admin =
      sv.profile.register("admin", "admin@example.com", "secret123").await.unwrap();
    sv.profile.set_role(&admin.id, Role::Admin).await.unwrap();

    let token = app.create_session(&admin.id);
    (admin, auth_headers(&token))
  }

  #[tokio::test]
  async fn admin_routes_reject_regular_users() {
    let app = test_state().await;
    let user =
      app.sv().profile.register("user", "user@example.com", "secret123").await.unwrap();
    let headers = auth_headers(&app.create_session(&user.id));

    let result = stats(State(app.clone()), headers.clone()).await;
    assert!(matches!(result, Err(Error::Forbidden)));

    let result = set_maintenance(
      State(app.clone()),
      headers,
      Json(MaintenanceReq { enabled: true }),
    )
    .await;
    assert!(matches!(result, Err(Error::Forbidden)));
    assert!(!app.sv().config.maintenance_mode().await.unwrap());
  }

  #[tokio::test]
  async fn license_creation_validates_bounds() {
    let app = test_state().await;
    let (_, headers) = seeded_admin(&app).await;

    let result = create_licenses(
      State(app.clone()),
      headers.clone(),
      Json(CreateLicensesReq { duration_days: 0, quantity: 1 }),
    )
    .await;
    assert!(matches!(result, Err(Error::Invalid(_))));

    let result = create_licenses(
      State(app.clone()),
      headers.clone(),
      Json(CreateLicensesReq { duration_days: 30, quantity: 500 }),
    )
    .await;
    assert!(matches!(result, Err(Error::Invalid(_))));

    let Json(keys) = create_licenses(
      State(app.clone()),
      headers,
      Json(CreateLicensesReq { duration_days: 30, quantity: 3 }),
    )
    .await
    .unwrap();
    assert_eq!(keys.len(), 3);
  }

  #[tokio::test]
  async fn stats_track_license_and_user_counts() {
    let app = test_state().await;
    let (_, headers) = seeded_admin(&app).await;
    let sv = app.sv();

    let user =
      sv.profile.register("user", "user@example.com", "secret123").await.unwrap();
    let keys = sv.license.create_batch(None, 30, 2).await.unwrap();
    sv.license.redeem(&user.id, &keys[0].key).await.unwrap();

    let Json(stats) = stats(State(app.clone()), headers).await.unwrap();

    assert_eq!(stats.users, 2);
    assert_eq!(stats.admins, 1);
    assert_eq!(stats.licenses, 2);
    assert_eq!(stats.licenses_unused, 1);
    assert_eq!(stats.active_subscriptions, 1);
    assert!(!stats.maintenance);
  }

  #[tokio::test]
  async fn deleting_a_user_revokes_their_sessions() {
    let app = test_state().await;
    let (admin, headers) = seeded_admin(&app).await;

    let user =
      app.sv().profile.register("user", "user@example.com", "secret123").await.unwrap();
    let user_token = app.create_session(&user.id);

    delete_user(State(app.clone()), headers.clone(), Path(user.id.clone()))
      .await
      .unwrap();

    assert!(app.sv().profile.by_id(&user.id).await.unwrap().is_none());
    assert!(!app.sessions.contains_key(&user_token));

    // Self-deletion is refused.
    let result =
      delete_user(State(app.clone()), headers, Path(admin.id.clone())).await;
    assert!(matches!(result, Err(Error::Invalid(_))));
  }

  #[tokio::test]
  async fn notification_lifecycle_via_admin_api() {
    let app = test_state().await;
    let (_, headers) = seeded_admin(&app).await;

    let Json(created) = create_notification(
      State(app.clone()),
      headers.clone(),
      Json(CreateNotificationReq {
        title: "Scheduled downtime".into(),
        message: "Back at 02:00 UTC".into(),
        ttl_hours: 24,
      }),
    )
    .await
    .unwrap();

    let Json(all) = notifications(State(app.clone()), headers.clone()).await.unwrap();
    assert_eq!(all.len(), 1);

    delete_notification(State(app.clone()), headers.clone(), Path(created.id))
      .await
      .unwrap();
    let Json(all) = notifications(State(app.clone()), headers).await.unwrap();
    assert!(all.is_empty());
  }
}
