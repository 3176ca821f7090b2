//! Tweak resources: registry and batch-script artifacts applied to the host
//! to alter performance-related settings. The catalog is static; artifact
//! bytes live on a CDN and are fetched on demand.

mod manager;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub use manager::{
  ApplyReport, CommandOutput, CommandRunner, ResourceManager, ShellRunner, TweakStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TweakKind {
  /// Registry export, applied via `regedit /s`.
  Reg,
  /// Batch script, executed directly.
  Bat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweakResource {
  pub kind: TweakKind,
  pub name: String,
  pub file_name: String,
  pub category: String,
  pub description: String,
  /// Pinned SHA-256 of the artifact; verified before the file is executable.
  #[serde(skip_serializing)]
  pub sha256: String,
}

impl TweakResource {
  fn new(
    kind: TweakKind,
    name: &str,
    file_name: &str,
    category: &str,
    description: &str,
    sha256: &str,
  ) -> Self {
    Self {
      kind,
      name: name.into(),
      file_name: file_name.into(),
      category: category.into(),
      description: description.into(),
      sha256: sha256.into(),
    }
  }
}

const GENERAL: &str = "System Performance";
const LATENCY: &str = "FPS and Input Lag";
const REGISTRY: &str = "Registry Tweaks";

static CATALOG: Lazy<Vec<TweakResource>> = Lazy::new(|| {
  use TweakKind::{Bat, Reg};

  vec![
    TweakResource::new(
      Reg,
      "Power Throttling",
      "power-throttling-off.reg",
      GENERAL,
      "Disables power throttling for foreground processes",
      "1e287be02745442ab02ff8712e45748a28a22c840f54da9a08b9aacef6ad8bc8",
    ),
    TweakResource::new(
      Reg,
      "Processor Scheduling",
      "processor-scheduling.reg",
      GENERAL,
      "Prioritizes foreground process scheduling",
      "18a71cd6d13023f7b1ddb40f7d45bb6c5acb87fb330d417ae52255c1309fed69",
    ),
    TweakResource::new(
      Reg,
      "Superfetch",
      "superfetch-off.reg",
      GENERAL,
      "Disables Superfetch prefetching to free RAM",
      "835b6fa2a22b90970bb1d2f8a8a7cbe1c8bad86313b45e197c5cc9dbaf308c1f",
    ),
    TweakResource::new(
      Reg,
      "System Responsiveness",
      "system-responsiveness.reg",
      GENERAL,
      "Raises multimedia scheduler responsiveness and GPU priority",
      "7ba0f7b477efa8389517018aaf37ca6c1960dff0a0064085451532509128be5d",
    ),
    TweakResource::new(
      Reg,
      "Windows Performance",
      "windows-performance.reg",
      GENERAL,
      "General Windows performance settings",
      "7c86c318faa5532723b735703008fc19733d21275aacc80ae848d9b6d080033f",
    ),
    TweakResource::new(
      Bat,
      "Raise FPS",
      "raise-fps.bat",
      LATENCY,
      "Trims background services that cost frames",
      "dae3b9d121e6a07c3c0f9babcc192facb9e99f44e7e2504ef3cd9530347edc59",
    ),
    TweakResource::new(
      Bat,
      "Smooth Gameplay",
      "smooth-gameplay.bat",
      LATENCY,
      "Tunes timer resolution for smoother frametimes",
      "ad11321f499da1d0da4f96e40dfe568cb46e1980b2068ccae23a6cd9fb1dd3cd",
    ),
    TweakResource::new(
      Bat,
      "Reduce Input Lag",
      "reduce-input-lag.bat",
      LATENCY,
      "Lowers input queue latency",
      "e52aa3a736e5f4a6814dae89e88253260a247cacc07a0f3184f68ecc9b78d316",
    ),
    TweakResource::new(
      Reg,
      "Input Lag Registry",
      "input-lag-registry.reg",
      LATENCY,
      "Registry-side input latency settings",
      "3106ec44ea5dc4df1109f97174a26f3f8feaa1b090a73b10d4844a50c1371594",
    ),
    TweakResource::new(
      Reg,
      "Disable Game DVR",
      "disable-game-dvr.reg",
      REGISTRY,
      "Turns off background game capture",
      "f7751b170e18196cc2c019c66d44901eb2c4773860bab55a37194326e5ceae2a",
    ),
    TweakResource::new(
      Reg,
      "Unpark Cores",
      "unpark-cores.reg",
      REGISTRY,
      "Makes parked CPU cores available to applications",
      "8f61b53fb79ea226195bcb3f8bcb7e9202bf68cb020689e88f7c76033e6bb76f",
    ),
    TweakResource::new(
      Reg,
      "Low-end Boost",
      "lowend-boost.reg",
      REGISTRY,
      "Visual-effects and cache settings for weaker machines",
      "60d96d611b70969bf0ec947f2018305bd6b013befeadf1510b68633c2b2490e0",
    ),
    TweakResource::new(
      Reg,
      "Ping Optimization",
      "ping-optimization.reg",
      REGISTRY,
      "Network stack settings that lower latency",
      "e3a9089f76acc474ed1f40f9935882308b6864dafc3b0b082740a3c468d1ef98",
    ),
    TweakResource::new(
      Reg,
      "Reclaim RAM",
      "reclaim-ram.reg",
      REGISTRY,
      "Releases working-set memory after programs close",
      "0cfce601c12c69366dfaf7fa18f6fbc90f511458f2c238cac80244f852cc924c",
    ),
  ]
});

/// The full static catalog, in application order.
pub fn catalog() -> &'static [TweakResource] {
  &CATALOG
}

pub fn find(name: &str) -> Option<&'static TweakResource> {
  CATALOG.iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalog_is_well_formed() {
    let catalog = catalog();
    assert!(!catalog.is_empty());

    for res in catalog {
      let extension = match res.kind {
        TweakKind::Reg => ".reg",
        TweakKind::Bat => ".bat",
      };
      assert!(res.file_name.ends_with(extension), "{}", res.file_name);
      assert_eq!(res.sha256.len(), 64);
      assert!(res.sha256.bytes().all(|b| b.is_ascii_hexdigit()));
    }
  }

  #[test]
  fn file_names_are_unique() {
    let catalog = catalog();
    for (i, a) in catalog.iter().enumerate() {
      for b in &catalog[i + 1..] {
        assert_ne!(a.file_name, b.file_name);
      }
    }
  }

  #[test]
  fn find_by_display_name() {
    assert!(find("Superfetch").is_some());
    assert!(find("No Such Tweak").is_none());
  }
}
