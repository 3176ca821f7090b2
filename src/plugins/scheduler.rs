//! The single owner of all periodic work. Metrics sampling, session GC and
//! DB sweeps share one loop instead of scattering timers across components.

use std::sync::Arc;

use crate::{plugins::Plugin, prelude::*, state::AppState, tweaks};

const SESSION_GC_INTERVAL: Duration = Duration::from_secs(60);

pub struct Scheduler;

#[async_trait::async_trait]
impl Plugin for Scheduler {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    if app.config.prefetch_resources {
      let (downloaded, failed) = app.resources.prefetch(tweaks::catalog()).await;
      if downloaded + failed > 0 {
        info!("Resource prefetch: {downloaded} downloaded, {failed} failed");
      }
    }

    let mut metrics = time::interval(app.config.metrics_interval);
    let mut sessions = time::interval(SESSION_GC_INTERVAL);
    let mut sweep = time::interval(app.config.sweep_interval);

    loop {
      tokio::select! {
        _ = metrics.tick() => sample_metrics(&app).await,
        _ = sessions.tick() => app.gc_sessions(),
        _ = sweep.tick() => run_sweeps(&app).await,
      }
    }
  }
}

async fn sample_metrics(app: &AppState) {
  match app.probe.sample() {
    Ok(snapshot) => {
      debug!(
        "Sampled metrics: cpu {}%, score {}",
        snapshot.cpu.usage, snapshot.optimization_score
      );
      app.store_metrics(snapshot).await;
    }
    // Keep the last snapshot; the dashboard shows stale data over none.
    Err(err) => warn!("Metrics sample failed: {err}"),
  }
}

async fn run_sweeps(app: &AppState) {
  let sv = app.sv();

  match sv.notification.sweep_expired().await {
    Ok(0) => {}
    Ok(swept) => info!("Swept {swept} expired notifications"),
    Err(err) => warn!("Notification sweep failed: {err}"),
  }

  let window = TimeDelta::days(app.config.expiry_warning_days);
  match sv.subscription.expiring_within(window).await {
    Ok(expiring) if !expiring.is_empty() => {
      info!(
        "{} subscriptions expire within {} days",
        expiring.len(),
        app.config.expiry_warning_days
      );
    }
    Ok(_) => {}
    Err(err) => warn!("Expiry check failed: {err}"),
  }
}
