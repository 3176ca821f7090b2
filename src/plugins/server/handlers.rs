use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, header},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{Role, notification, profile},
  metrics::SystemMetrics,
  prelude::*,
  state::AppState,
  sv,
  tweaks::{self, ApplyReport, TweakStatus},
};

const MIN_PASSWORD_LEN: usize = 6;

pub(super) fn bearer_token(headers: &HeaderMap) -> Result<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .ok_or(Error::Unauthorized)
}

pub(super) async fn authorize(
  app: &AppState,
  headers: &HeaderMap,
) -> Result<profile::Model> {
  let token = bearer_token(headers)?;
  let user_id = app.session_user(token)?;

  app.sv().profile.by_id(&user_id).await?.ok_or(Error::Unauthorized)
}

pub(super) async fn authorize_admin(
  app: &AppState,
  headers: &HeaderMap,
) -> Result<profile::Model> {
  let profile = authorize(app, headers).await?;

  match app.sv().profile.role_of(&profile.id).await? {
    Role::Admin => Ok(profile),
    Role::User => Err(Error::Forbidden),
  }
}

#[derive(Debug, Serialize)]
pub struct Status {
  pub success: bool,
}

impl Status {
  pub(super) fn ok() -> Self {
    Self { success: true }
  }
}

pub async fn health() -> &'static str {
  "OK"
}

#[derive(Debug, Deserialize)]
pub struct RegisterReq {
  pub username: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthRes {
  pub token: String,
  pub profile: profile::Model,
  pub role: Role,
}

pub async fn register(
  State(app): State<Arc<AppState>>,
  Json(req): Json<RegisterReq>,
) -> Result<Json<AuthRes>> {
  if req.username.trim().is_empty() {
    return Err(Error::Invalid("Username must not be empty".into()));
  }
  if !req.email.contains('@') {
    return Err(Error::Invalid("Enter a valid email address".into()));
  }
  if req.password.len() < MIN_PASSWORD_LEN {
    return Err(Error::Invalid(format!(
      "Password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }

  let sv = app.sv();
  let profile = sv.profile.register(&req.username, &req.email, &req.password).await?;

  if app.admins.contains(&profile.email) {
    sv.profile.set_role(&profile.id, Role::Admin).await?;
  }
  let role = sv.profile.role_of(&profile.id).await?;

  let token = app.create_session(&profile.id);
  info!("Registered {}", profile.email);

  Ok(Json(AuthRes { token, profile, role }))
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
  pub email: String,
  pub password: String,
}

pub async fn login(
  State(app): State<Arc<AppState>>,
  Json(req): Json<LoginReq>,
) -> Result<Json<AuthRes>> {
  let sv = app.sv();
  let profile = sv.profile.verify_login(&req.email, &req.password).await?;
  let role = sv.profile.role_of(&profile.id).await?;

  // Maintenance keeps non-admins out before a session even exists.
  let maintenance = sv.config.maintenance_mode().await?;
  if sv::config::maintenance_blocks(maintenance, role) {
    return Err(Error::Maintenance);
  }

  let token = app.create_session(&profile.id);
  Ok(Json(AuthRes { token, profile, role }))
}

pub async fn logout(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Status>> {
  let token = bearer_token(&headers)?;
  app.drop_session(token);
  Ok(Json(Status::ok()))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
  pub expires_at: DateTime,
  pub source: String,
  pub license_key_id: Option<String>,
  pub active: bool,
  pub countdown: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionRes {
  pub profile: profile::Model,
  pub role: Role,
  pub subscription: Option<SubscriptionView>,
  pub subscription_active: bool,
  pub maintenance: bool,
}

/// The auth-data fetch: profile, role and entitlement in one round trip.
/// This is where the maintenance gate catches already-open sessions.
pub async fn session(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<SessionRes>> {
  let token = bearer_token(&headers)?;
  let user_id = app.session_user(token)?;

  let sv = app.sv();
  let profile = sv.profile.by_id(&user_id).await?.ok_or(Error::Unauthorized)?;
  let role = sv.profile.role_of(&profile.id).await?;

  let maintenance = sv.config.maintenance_mode().await?;
  if sv::config::maintenance_blocks(maintenance, role) {
    app.drop_session(token);
    warn!("Signed out {} for maintenance", profile.email);
    return Err(Error::Maintenance);
  }

  let now = Utc::now().naive_utc();
  let subscription = sv.subscription.for_user(&profile.id).await?.map(|sub| {
    SubscriptionView {
      active: sv::subscription::is_active(sub.expires_at, now),
      countdown: sv::subscription::countdown(sub.expires_at, now),
      expires_at: sub.expires_at,
      source: sub.source,
      license_key_id: sub.license_key_id,
    }
  });
  let subscription_active = subscription.as_ref().is_some_and(|sub| sub.active);

  Ok(Json(SessionRes { profile, role, subscription, subscription_active, maintenance }))
}

/// Keeps the session warm and stamps activity on the caller's live key.
pub async fn heartbeat(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Status>> {
  let profile = authorize(&app, &headers).await?;
  app.sv().license.touch_activity(&profile.id).await?;
  Ok(Json(Status::ok()))
}

/// Latest snapshot, or `null` until the first sample lands.
pub async fn metrics(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Option<SystemMetrics>>> {
  authorize(&app, &headers).await?;
  Ok(Json(app.latest_metrics().await))
}

pub async fn notifications(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<notification::Model>>> {
  authorize(&app, &headers).await?;
  Ok(Json(app.sv().notification.active().await?))
}

pub async fn tweaks(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<TweakStatus>>> {
  authorize(&app, &headers).await?;
  Ok(Json(app.resources.statuses(tweaks::catalog()).await))
}

/// Apply a single tweak by display name.
pub async fn apply_tweak(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(name): Path<String>,
) -> Result<Json<Status>> {
  let profile = authorize(&app, &headers).await?;

  if app.sv().subscription.active_for(&profile.id).await?.is_none() {
    return Err(Error::SubscriptionRequired);
  }

  let resource =
    tweaks::find(&name).ok_or_else(|| Error::ResourceNotFound(name.clone()))?;
  app.resources.apply(resource).await?;

  info!("{} applied tweak '{}'", profile.email, resource.name);
  Ok(Json(Status::ok()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileReq {
  pub username: Option<String>,
  pub avatar_url: Option<String>,
}

/// Settings form: partial profile update.
pub async fn update_profile(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<UpdateProfileReq>,
) -> Result<Json<profile::Model>> {
  let profile = authorize(&app, &headers).await?;

  if let Some(username) = &req.username {
    if username.trim().is_empty() {
      return Err(Error::Invalid("Username must not be empty".into()));
    }
  }

  let updated = app
    .sv()
    .profile
    .update_settings(&profile.id, req.username.as_deref(), req.avatar_url.as_deref())
    .await?;

  Ok(Json(updated))
}

/// Full optimize pass. Gated on a live entitlement; best-effort across the
/// catalog, so the response reports counts instead of failing outright.
pub async fn optimize(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<ApplyReport>> {
  let profile = authorize(&app, &headers).await?;

  if app.sv().subscription.active_for(&profile.id).await?.is_none() {
    return Err(Error::SubscriptionRequired);
  }

  let report = app.resources.apply_all(tweaks::catalog()).await;
  info!(
    "Optimize run for {}: {}/{} applied",
    profile.email, report.applied, report.attempted
  );

  Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RedeemReq {
  pub key: String,
}

#[derive(Debug, Serialize)]
pub struct RedeemRes {
  pub success: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub expires_at: Option<DateTime>,
}

impl RedeemRes {
  fn ok(message: impl Into<String>, expires_at: DateTime) -> Self {
    Self { success: true, message: message.into(), expires_at: Some(expires_at) }
  }

  fn invalid(message: impl Into<String>) -> Self {
    Self { success: false, message: message.into(), expires_at: None }
  }
}

/// Key redemption. Business failures come back as `success = false` with a
/// message; only infrastructure failures surface as HTTP errors.
pub async fn redeem(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<RedeemReq>,
) -> Result<Json<RedeemRes>> {
  let profile = authorize(&app, &headers).await?;

  let key = sv::License::normalize_key(&req.key);
  if key.is_empty() {
    return Ok(Json(RedeemRes::invalid("Enter a license key")));
  }

  match app.sv().license.redeem(&profile.id, &key).await {
    Ok(expires_at) => {
      info!("{} redeemed a license key", profile.email);
      Ok(Json(RedeemRes::ok(
        format!("License activated until {}", utils::format_date(expires_at)),
        expires_at,
      )))
    }
    Err(Error::LicenseNotFound) => Ok(Json(RedeemRes::invalid("Invalid license key"))),
    Err(Error::LicenseUsed) => {
      Ok(Json(RedeemRes::invalid("This key has already been used")))
    }
    Err(err) => Err(err),
  }
}
