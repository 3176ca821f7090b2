//! Optimization score: maps four raw host metrics to a 0-100 rating.
//!
//! Each metric gets a piecewise-linear sub-score; the weighted penalties are
//! deducted from a baseline of 100. Deterministic and stateless.

const CPU_WEIGHT: f64 = 0.25;
const MEM_WEIGHT: f64 = 0.30;
const DISK_WEIGHT: f64 = 0.10;
const PROCESS_WEIGHT: f64 = 0.35;

/// CPU usage sub-score. <30% is ideal, 70%+ degrades toward zero.
fn cpu_subscore(usage: f64) -> f64 {
  if usage < 30.0 {
    100.0
  } else if usage < 50.0 {
    100.0 - (usage - 30.0) / 20.0 * 20.0
  } else if usage < 70.0 {
    80.0 - (usage - 50.0) / 20.0 * 30.0
  } else {
    (50.0 - (usage - 70.0) / 30.0 * 50.0).max(0.0)
  }
}

/// RAM usage sub-score. The knee sits at 80%, where paging pressure starts.
fn mem_subscore(usage: f64) -> f64 {
  if usage < 40.0 {
    100.0
  } else if usage < 60.0 {
    100.0 - (usage - 40.0) / 20.0 * 20.0
  } else if usage < 80.0 {
    80.0 - (usage - 60.0) / 20.0 * 30.0
  } else {
    (50.0 - (usage - 80.0) / 20.0 * 50.0).max(0.0)
  }
}

/// Disk usage sub-score. Fill level matters less than CPU or RAM.
fn disk_subscore(usage: f64) -> f64 {
  if usage < 60.0 {
    100.0
  } else if usage < 80.0 {
    100.0 - (usage - 60.0) / 20.0 * 30.0
  } else {
    (70.0 - (usage - 80.0) / 20.0 * 70.0).max(0.0)
  }
}

/// Process count sub-score. 150+ background processes is the heaviest signal.
fn process_subscore(count: u32) -> f64 {
  let count = count as f64;
  if count < 50.0 {
    100.0
  } else if count < 100.0 {
    100.0 - (count - 50.0) / 50.0 * 20.0
  } else if count < 150.0 {
    80.0 - (count - 100.0) / 50.0 * 30.0
  } else {
    (50.0 - (count - 150.0) / 150.0 * 50.0).max(0.0)
  }
}

/// Compute the overall optimization score from raw usage percentages and the
/// total process count. Always in `0..=100`.
pub fn optimization_score(cpu: f64, memory: f64, disk: f64, processes: u32) -> u8 {
  let mut score = 100.0;
  score -= (100.0 - cpu_subscore(cpu)) * CPU_WEIGHT;
  score -= (100.0 - mem_subscore(memory)) * MEM_WEIGHT;
  score -= (100.0 - disk_subscore(disk)) * DISK_WEIGHT;
  score -= (100.0 - process_subscore(processes)) * PROCESS_WEIGHT;

  score.clamp(0.0, 100.0).round() as u8
}
