//! Local resource cache and best-effort application of tweak artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{TweakKind, TweakResource};
use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct CommandOutput {
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
}

/// Seam between the manager and the host shell. The production runner
/// elevates; tests record invocations.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
  async fn run(&self, program: &str, args: &[&str], elevated: bool) -> Result<CommandOutput>;
}

/// Runs commands on the host, elevated where requested.
pub struct ShellRunner;

#[async_trait::async_trait]
impl CommandRunner for ShellRunner {
  #[cfg(target_os = "windows")]
  async fn run(&self, program: &str, args: &[&str], elevated: bool) -> Result<CommandOutput> {
    use tokio::process::Command;

    let output = if elevated {
      let arg_list = args.join("','");
      let script = format!(
        "Start-Process -FilePath '{program}' -ArgumentList '{arg_list}' \
         -Verb RunAs -WindowStyle Hidden -Wait"
      );
      Command::new("powershell").args(["-Command", &script]).output().await?
    } else {
      Command::new(program).args(args).output().await?
    };

    Ok(CommandOutput {
      success: output.status.success(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }

  #[cfg(not(target_os = "windows"))]
  async fn run(&self, _program: &str, _args: &[&str], _elevated: bool) -> Result<CommandOutput> {
    Err(Error::HostUnavailable)
  }
}

/// Outcome of a full optimize pass. Partial failure is expected; the pass
/// applies as many tweaks as possible.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
  pub attempted: usize,
  pub applied: usize,
  pub failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TweakStatus {
  pub name: String,
  pub category: String,
  pub kind: TweakKind,
  pub description: String,
  pub present: bool,
}

pub struct ResourceManager {
  client: reqwest::Client,
  base_url: String,
  root: PathBuf,
  runner: Arc<dyn CommandRunner>,
}

impl ResourceManager {
  pub fn new(
    base_url: impl Into<String>,
    root: impl Into<PathBuf>,
    runner: Arc<dyn CommandRunner>,
  ) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: base_url.into(),
      root: root.into(),
      runner,
    }
  }

  pub fn local_path(&self, res: &TweakResource) -> PathBuf {
    self.root.join(res.category.replace(' ', "_")).join(&res.file_name)
  }

  fn url(&self, res: &TweakResource) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), res.file_name)
  }

  /// Return the local path of a resource, downloading it first if absent.
  /// Once the file exists this never touches the network again.
  pub async fn ensure(&self, res: &TweakResource) -> Result<PathBuf> {
    let path = self.local_path(res);
    if tokio::fs::try_exists(&path).await? {
      return Ok(path);
    }

    self.download(res, &path).await?;
    Ok(path)
  }

  async fn download(&self, res: &TweakResource, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }

    debug!("Downloading {} from {}", res.name, self.url(res));
    let bytes = self
      .client
      .get(self.url(res))
      .send()
      .await?
      .error_for_status()?
      .bytes()
      .await?;

    // The artifact will run elevated; reject anything that does not match
    // the pinned digest before it reaches an executable path.
    let digest = hex::encode(Sha256::digest(&bytes));
    if !digest.eq_ignore_ascii_case(&res.sha256) {
      return Err(Error::ChecksumMismatch(res.name.clone()));
    }

    let staged = path.with_extension("part");
    tokio::fs::write(&staged, &bytes).await?;
    tokio::fs::rename(&staged, path).await?;

    info!("Downloaded {} ({} bytes)", res.name, bytes.len());
    Ok(())
  }

  /// Ensure and execute one resource with elevated privileges.
  pub async fn apply(&self, res: &TweakResource) -> Result<()> {
    let path = self.ensure(res).await?;
    let path = path.to_string_lossy().into_owned();

    let output = match res.kind {
      TweakKind::Reg => self.runner.run("regedit", &["/S", &path], true).await?,
      TweakKind::Bat => self.runner.run("cmd", &["/C", &path], true).await?,
    };

    if !output.success {
      let detail = if output.stderr.is_empty() { res.name.clone() } else { output.stderr };
      return Err(Error::CommandFailed(detail));
    }

    Ok(())
  }

  /// Apply every resource in order, tolerating individual failures.
  pub async fn apply_all(&self, resources: &[TweakResource]) -> ApplyReport {
    let mut report = ApplyReport {
      attempted: resources.len(),
      applied: 0,
      failed: Vec::new(),
    };

    for res in resources {
      match self.apply(res).await {
        Ok(()) => report.applied += 1,
        Err(err) => {
          warn!("Tweak '{}' failed: {}", res.name, err);
          report.failed.push(res.name.clone());
        }
      }
    }

    report
  }

  /// Catalog view with local-presence flags for the dashboard.
  pub async fn statuses(&self, resources: &[TweakResource]) -> Vec<TweakStatus> {
    let mut out = Vec::with_capacity(resources.len());
    for res in resources {
      let present =
        tokio::fs::try_exists(self.local_path(res)).await.unwrap_or(false);
      out.push(TweakStatus {
        name: res.name.clone(),
        category: res.category.clone(),
        kind: res.kind,
        description: res.description.clone(),
        present,
      });
    }
    out
  }

  /// Download whatever is missing. Best effort: failures are logged and
  /// skipped so startup never blocks on the CDN.
  pub async fn prefetch(&self, resources: &[TweakResource]) -> (usize, usize) {
    let mut downloaded = 0;
    let mut failed = 0;

    for res in resources {
      let path = self.local_path(res);
      if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        continue;
      }

      match self.download(res, &path).await {
        Ok(()) => downloaded += 1,
        Err(err) => {
          warn!("Prefetch of '{}' failed: {}", res.name, err);
          failed += 1;
        }
      }
    }

    (downloaded, failed)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  fn resource(kind: TweakKind, file_name: &str, body: &[u8]) -> TweakResource {
    TweakResource {
      kind,
      name: file_name.trim_end_matches(".reg").trim_end_matches(".bat").to_string(),
      file_name: file_name.to_string(),
      category: "Test Tweaks".to_string(),
      description: String::new(),
      sha256: hex::encode(Sha256::digest(body)),
    }
  }

  struct StubRunner {
    fail_on: Option<&'static str>,
    calls: Mutex<Vec<(String, Vec<String>, bool)>>,
  }

  impl StubRunner {
    fn new(fail_on: Option<&'static str>) -> Arc<Self> {
      Arc::new(Self { fail_on, calls: Mutex::new(Vec::new()) })
    }
  }

  #[async_trait::async_trait]
  impl CommandRunner for StubRunner {
    async fn run(&self, program: &str, args: &[&str], elevated: bool) -> Result<CommandOutput> {
      self.calls.lock().unwrap().push((
        program.to_string(),
        args.iter().map(|a| a.to_string()).collect(),
        elevated,
      ));

      let fail = self.fail_on.is_some_and(|needle| args.iter().any(|a| a.contains(needle)));
      Ok(CommandOutput {
        success: !fail,
        stdout: String::new(),
        stderr: if fail { "access denied".into() } else { String::new() },
      })
    }
  }

  #[tokio::test]
  async fn ensure_downloads_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"Windows Registry Editor Version 5.00\r\n";
    let res = resource(TweakKind::Reg, "power-throttling-off.reg", body);

    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/power-throttling-off.reg")
      .with_status(200)
      .with_body(body.as_slice())
      .expect(1)
      .create_async()
      .await;

    let manager =
      ResourceManager::new(server.url(), dir.path(), StubRunner::new(None));

    let first = manager.ensure(&res).await.unwrap();
    let second = manager.ensure(&res).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(tokio::fs::read(&first).await.unwrap(), body);
    assert!(first.starts_with(dir.path().join("Test_Tweaks")));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn checksum_mismatch_rejects_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let res = resource(TweakKind::Bat, "raise-fps.bat", b"@echo off\r\n");

    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/raise-fps.bat")
      .with_status(200)
      .with_body("format c:")
      .create_async()
      .await;

    let manager =
      ResourceManager::new(server.url(), dir.path(), StubRunner::new(None));

    let err = manager.ensure(&res).await.unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch(_)));
    assert!(!manager.local_path(&res).exists());
  }

  #[tokio::test]
  async fn apply_all_continues_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    let resources = vec![
      resource(TweakKind::Reg, "disable-game-dvr.reg", b"a"),
      resource(TweakKind::Bat, "raise-fps.bat", b"b"),
      resource(TweakKind::Reg, "reclaim-ram.reg", b"c"),
    ];

    let runner = StubRunner::new(Some("raise-fps"));
    let manager = ResourceManager::new("http://unused.invalid", dir.path(), runner.clone());

    // Pre-place every artifact so no download happens.
    for (res, body) in resources.iter().zip([b"a", b"b", b"c"]) {
      let path = manager.local_path(res);
      tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
      tokio::fs::write(path, body).await.unwrap();
    }

    let report = manager.apply_all(&resources).await;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.applied, 2);
    assert_eq!(report.failed, vec!["raise-fps".to_string()]);

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].0, "regedit");
    assert_eq!(calls[1].0, "cmd");
    assert!(calls.iter().all(|(_, _, elevated)| *elevated));
  }

  #[tokio::test]
  async fn statuses_reflect_local_presence() {
    let dir = tempfile::tempdir().unwrap();
    let present = resource(TweakKind::Reg, "unpark-cores.reg", b"x");
    let absent = resource(TweakKind::Reg, "ping-optimization.reg", b"y");

    let manager =
      ResourceManager::new("http://unused.invalid", dir.path(), StubRunner::new(None));

    let path = manager.local_path(&present);
    tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    tokio::fs::write(path, b"x").await.unwrap();

    let statuses = manager.statuses(&[present, absent]).await;
    assert!(statuses[0].present);
    assert!(!statuses[1].present);
  }
}
