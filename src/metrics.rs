//! Host metric sampling behind a capability-selected probe.
//!
//! The probe is resolved once at startup: a sysinfo-backed probe when host
//! sampling is wanted, a pseudo-random simulated probe otherwise. Callers
//! never check capabilities per call site.

use std::sync::Mutex;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sysinfo::{Disks, Networks, ProcessStatus, System};

use crate::prelude::*;
use crate::score;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
  pub usage: f64,
  pub temperature: f64,
  pub cores: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
  pub total: u64,
  pub used: u64,
  pub free: u64,
  pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
  pub total: u64,
  pub used: u64,
  pub free: u64,
  pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
  pub all: u32,
  pub running: u32,
  pub blocked: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
  /// Bytes sent since the previous sample.
  pub upload: u64,
  /// Bytes received since the previous sample.
  pub download: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
  pub cpu: CpuMetrics,
  pub memory: MemoryMetrics,
  pub disk: DiskMetrics,
  pub processes: ProcessMetrics,
  pub network: NetworkMetrics,
  pub optimization_score: u8,
  pub sampled_at: DateTime,
}

/// A source of system snapshots. Implementations are picked once at startup.
pub trait Probe: Send + Sync {
  fn sample(&self) -> Result<SystemMetrics>;
}

/// Select the probe for this process lifetime.
pub fn detect(simulate: bool) -> Box<dyn Probe> {
  if simulate {
    info!("Metrics probe: simulated");
    Box::new(SimulatedProbe)
  } else {
    info!("Metrics probe: host (sysinfo)");
    Box::new(HostProbe::new())
  }
}

#[allow(clippy::too_many_arguments)]
fn compose(
  cpu_usage: f64,
  temperature: f64,
  cores: usize,
  mem_total: u64,
  mem_used: u64,
  disk_total: u64,
  disk_used: u64,
  processes: ProcessMetrics,
  network: NetworkMetrics,
) -> SystemMetrics {
  let percent = |used: u64, total: u64| {
    if total == 0 { 0.0 } else { (used as f64 / total as f64 * 100.0).round() }
  };

  let memory_percent = percent(mem_used, mem_total);
  let disk_percent = percent(disk_used, disk_total);

  let optimization_score =
    score::optimization_score(cpu_usage, memory_percent, disk_percent, processes.all);

  SystemMetrics {
    cpu: CpuMetrics { usage: cpu_usage, temperature, cores },
    memory: MemoryMetrics {
      total: mem_total,
      used: mem_used,
      free: mem_total.saturating_sub(mem_used),
      usage_percent: memory_percent,
    },
    disk: DiskMetrics {
      total: disk_total,
      used: disk_used,
      free: disk_total.saturating_sub(disk_used),
      usage_percent: disk_percent,
    },
    processes,
    network,
    optimization_score,
    sampled_at: Utc::now().naive_utc(),
  }
}

struct HostState {
  sys: System,
  disks: Disks,
  networks: Networks,
}

/// Samples the machine this daemon runs on.
pub struct HostProbe {
  state: Mutex<HostState>,
}

impl HostProbe {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(HostState {
        sys: System::new_all(),
        disks: Disks::new_with_refreshed_list(),
        networks: Networks::new_with_refreshed_list(),
      }),
    }
  }
}

impl Default for HostProbe {
  fn default() -> Self {
    Self::new()
  }
}

impl Probe for HostProbe {
  fn sample(&self) -> Result<SystemMetrics> {
    let mut state = self
      .state
      .lock()
      .map_err(|_| Error::Internal("metrics probe poisoned".into()))?;

    state.sys.refresh_all();
    state.disks.refresh(true);
    state.networks.refresh(true);

    let cpu_usage = (state.sys.global_cpu_usage() as f64).round();
    let cores = state.sys.cpus().len();

    let mem_total = state.sys.total_memory();
    let mem_used = state.sys.used_memory();

    // Primary disk only, same as the dashboard shows.
    let (disk_total, disk_used) = state
      .disks
      .list()
      .first()
      .map(|d| (d.total_space(), d.total_space().saturating_sub(d.available_space())))
      .unwrap_or((0, 0));

    let mut running = 0u32;
    let mut blocked = 0u32;
    for process in state.sys.processes().values() {
      match process.status() {
        ProcessStatus::Run => running += 1,
        ProcessStatus::Stop => blocked += 1,
        _ => {}
      }
    }
    let all = state.sys.processes().len() as u32;

    let mut upload = 0u64;
    let mut download = 0u64;
    for (_name, data) in &state.networks {
      upload += data.transmitted();
      download += data.received();
    }

    Ok(compose(
      cpu_usage,
      0.0,
      cores,
      mem_total,
      mem_used,
      disk_total,
      disk_used,
      ProcessMetrics { all, running, blocked },
      NetworkMetrics { upload, download },
    ))
  }
}

/// Plausible pseudo-random snapshots for hosts where sampling is unwanted
/// (CI, containers, development off the target platform).
pub struct SimulatedProbe;

const SIM_MEM_TOTAL: u64 = 16_000_000_000;
const SIM_DISK_TOTAL: u64 = 500_000_000_000;

impl Probe for SimulatedProbe {
  fn sample(&self) -> Result<SystemMetrics> {
    let mut rng = rand::thread_rng();

    let cpu = rng.gen_range(20..50) as f64;
    let mem_percent = rng.gen_range(40..80) as u64;
    let disk_percent = rng.gen_range(30..50) as u64;
    let all = rng.gen_range(150..250) as u32;

    Ok(compose(
      cpu,
      45.0,
      4,
      SIM_MEM_TOTAL,
      SIM_MEM_TOTAL / 100 * mem_percent,
      SIM_DISK_TOTAL,
      SIM_DISK_TOTAL / 100 * disk_percent,
      ProcessMetrics { all, running: all * 3 / 10, blocked: 0 },
      NetworkMetrics { upload: 0, download: 0 },
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn simulated_probe_stays_in_plausible_ranges() {
    let probe = SimulatedProbe;

    for _ in 0..50 {
      let m = probe.sample().unwrap();

      assert!((20.0..50.0).contains(&m.cpu.usage));
      assert!((40.0..=80.0).contains(&m.memory.usage_percent));
      assert!((30.0..=50.0).contains(&m.disk.usage_percent));
      assert!((150..250).contains(&m.processes.all));
      assert!(m.optimization_score <= 100);
      assert_eq!(m.memory.total, m.memory.used + m.memory.free);
    }
  }

  #[test]
  fn compose_guards_empty_totals() {
    let m = compose(
      10.0,
      0.0,
      0,
      0,
      0,
      0,
      0,
      ProcessMetrics { all: 10, running: 1, blocked: 0 },
      NetworkMetrics { upload: 0, download: 0 },
    );

    assert_eq!(m.memory.usage_percent, 0.0);
    assert_eq!(m.disk.usage_percent, 0.0);
    assert_eq!(m.optimization_score, 100);
  }
}
