use std::{collections::HashSet, env, path::PathBuf, sync::Arc};

use migration::{Migrator, MigratorTrait};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
  metrics::{self, Probe, SystemMetrics},
  prelude::*,
  sv,
  tweaks::{ResourceManager, ShellRunner},
};

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Session {
  pub user_id: String,
  pub created_at: DateTime,
  pub last_seen: DateTime,
}

pub type Sessions = DashMap<String, Session>;

#[derive(Debug, Clone)]
pub struct Config {
  pub cdn_base_url: String,
  pub resources_dir: PathBuf,
  /// Seconds of inactivity before a session token dies.
  pub session_lifetime: i64,
  pub metrics_interval: Duration,
  pub sweep_interval: Duration,
  pub expiry_warning_days: i64,
  pub simulate_metrics: bool,
  pub prefetch_resources: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      cdn_base_url: String::from("https://cdn.velocity-app.io/tweaks"),
      resources_dir: PathBuf::from("./tweaks"),

      session_lifetime: 86_400,
      metrics_interval: Duration::from_secs(15),
      sweep_interval: Duration::from_secs(300),
      expiry_warning_days: 3,
      simulate_metrics: false,
      prefetch_resources: true,
    }
  }
}

impl Config {
  pub fn from_env() -> Self {
    let defaults = Self::default();

    let interval = |name: &str, fallback: Duration| {
      env::var(name)
        .ok()
        .and_then(|raw| humantime::parse_duration(&raw).ok())
        .unwrap_or(fallback)
    };
    let flag = |name: &str, fallback: bool| {
      env::var(name)
        .map(|raw| matches!(raw.trim(), "1" | "true" | "yes"))
        .unwrap_or(fallback)
    };

    Self {
      cdn_base_url: env::var("CDN_BASE_URL").unwrap_or(defaults.cdn_base_url),
      resources_dir: env::var("RESOURCES_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.resources_dir),
      session_lifetime: env::var("SESSION_LIFETIME")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(defaults.session_lifetime),
      metrics_interval: interval("METRICS_INTERVAL", defaults.metrics_interval),
      sweep_interval: interval("SWEEP_INTERVAL", defaults.sweep_interval),
      expiry_warning_days: env::var("EXPIRY_WARNING_DAYS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(defaults.expiry_warning_days),
      simulate_metrics: flag("SIMULATE_METRICS", defaults.simulate_metrics),
      prefetch_resources: flag("PREFETCH_RESOURCES", defaults.prefetch_resources),
    }
  }
}

pub struct Services<'a> {
  pub profile: sv::Profile<'a>,
  pub license: sv::License<'a>,
  pub subscription: sv::Subscription<'a>,
  pub notification: sv::Notification<'a>,
  pub config: sv::Config<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub admins: HashSet<String>,
  pub sessions: Sessions,
  pub probe: Box<dyn Probe>,
  pub resources: ResourceManager,
  metrics: RwLock<Option<SystemMetrics>>,
}

impl AppState {
  pub async fn new(db_url: &str, admins: HashSet<String>, config: Config) -> Self {
    info!("Connecting to database...");
    let db =
      Database::connect(db_url).await.expect("Failed to connect to database");

    info!("Running migrations...");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    let probe = metrics::detect(config.simulate_metrics);
    let resources = ResourceManager::new(
      config.cdn_base_url.clone(),
      config.resources_dir.clone(),
      Arc::new(ShellRunner),
    );

    Self {
      db,
      admins,
      sessions: DashMap::new(),
      probe,
      resources,
      metrics: RwLock::new(None),
      config,
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      profile: sv::Profile::new(&self.db),
      license: sv::License::new(&self.db),
      subscription: sv::Subscription::new(&self.db),
      notification: sv::Notification::new(&self.db),
      config: sv::Config::new(&self.db),
    }
  }

  pub fn create_session(&self, user_id: &str) -> String {
    let token = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    self.sessions.insert(
      token.clone(),
      Session { user_id: user_id.to_string(), created_at: now, last_seen: now },
    );

    token
  }

  /// Resolve a token to its user, refreshing the inactivity window.
  pub fn session_user(&self, token: &str) -> Result<String> {
    let now = Utc::now().naive_utc();

    {
      let mut session =
        self.sessions.get_mut(token).ok_or(Error::Unauthorized)?;

      if (now - session.last_seen).num_seconds() < self.config.session_lifetime {
        session.last_seen = now;
        return Ok(session.user_id.clone());
      }
    }

    self.sessions.remove(token);
    Err(Error::Unauthorized)
  }

  pub fn drop_session(&self, token: &str) {
    self.sessions.remove(token);
  }

  pub fn drop_sessions_for(&self, user_id: &str) {
    self.sessions.retain(|_token, session| session.user_id != user_id);
  }

  pub fn gc_sessions(&self) {
    let now = Utc::now().naive_utc();
    let lifetime = self.config.session_lifetime;

    self
      .sessions
      .retain(|_token, session| (now - session.last_seen).num_seconds() < lifetime);
  }

  pub async fn latest_metrics(&self) -> Option<SystemMetrics> {
    self.metrics.read().await.clone()
  }

  pub async fn store_metrics(&self, snapshot: SystemMetrics) {
    *self.metrics.write().await = Some(snapshot);
  }
}
