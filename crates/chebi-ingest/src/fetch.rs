//! Source fetcher: mirrors the remote flat files into a staging directory.
//!
//! Each file is streamed into `<name>.part` and renamed once the body is
//! complete, so a file that exists under its final name is always whole.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use chebi_core::{PipelineConfig, Table};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::{Error, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── Retry policy ────────────────────────────────────────────────────────────

/// Exponential backoff between download attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts per file, including the first one.
  pub max_attempts: u32,
  pub base_delay:   Duration,
  pub max_delay:    Duration,
}

impl RetryPolicy {
  pub fn new(max_attempts: u32) -> Self {
    Self { max_attempts: max_attempts.max(1), ..Self::default() }
  }

  /// Delay before retry number `retry` (0-based).
  pub fn delay(&self, retry: u32) -> Duration {
    let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 1,
      base_delay:   Duration::from_millis(500),
      max_delay:    Duration::from_secs(30),
    }
  }
}

// ─── Fetcher ─────────────────────────────────────────────────────────────────

/// Names of the files a fetch downloaded and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
  pub downloaded: Vec<String>,
  pub skipped:    Vec<String>,
}

#[derive(Clone)]
pub struct Fetcher {
  client:        Client,
  base_url:      String,
  force_refresh: bool,
  retry:         RetryPolicy,
}

impl Fetcher {
  pub fn new(client: Client, base_url: impl Into<String>) -> Self {
    Self {
      client,
      base_url: base_url.into(),
      force_refresh: false,
      retry: RetryPolicy::default(),
    }
  }

  /// A fetcher with its own client, configured from `config`.
  pub fn from_config(config: &PipelineConfig) -> Result<Self> {
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self::new(client, config.base_url.clone()).force_refresh(config.force_refresh))
  }

  pub fn force_refresh(mut self, force: bool) -> Self {
    self.force_refresh = force;
    self
  }

  pub fn retry(mut self, policy: RetryPolicy) -> Self {
    self.retry = policy;
    self
  }

  fn url(&self, file: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), file)
  }

  /// Download every file of `files` into `staging_dir`.
  ///
  /// The first file that cannot be downloaded aborts the whole fetch.
  pub async fn fetch_all(&self, files: &[(Table, String)], staging_dir: &Path) -> Result<FetchReport> {
    tokio::fs::create_dir_all(staging_dir)
      .await
      .map_err(|e| Error::io(staging_dir, e))?;

    let mut report = FetchReport::default();
    for (table, file) in files {
      let dest = staging_dir.join(file);
      if !self.force_refresh && tokio::fs::try_exists(&dest).await.unwrap_or(false) {
        debug!(%table, file = %file, "already staged, skipping");
        report.skipped.push(file.clone());
        continue;
      }

      self.fetch_one(file, &dest).await?;
      info!(%table, file = %file, "downloaded");
      report.downloaded.push(file.clone());
    }
    Ok(report)
  }

  async fn fetch_one(&self, file: &str, dest: &Path) -> Result<()> {
    let url = self.url(file);
    let part = part_path(dest);

    let mut retry = 0;
    loop {
      match self.download(&url, &part).await {
        Ok(()) => break,
        Err(e) => {
          let _ = tokio::fs::remove_file(&part).await;
          if retry + 1 >= self.retry.max_attempts {
            return Err(Error::Download { file: file.to_owned(), source: e });
          }
          let delay = self.retry.delay(retry);
          warn!(file, error = %e, ?delay, "download failed, retrying");
          tokio::time::sleep(delay).await;
          retry += 1;
        }
      }
    }

    tokio::fs::rename(&part, dest).await.map_err(|e| Error::io(dest, e))
  }

  async fn download(&self, url: &str, part: &Path) -> Result<(), BoxError> {
    let mut resp = self.client.get(url).send().await?.error_for_status()?;
    let mut out = tokio::fs::File::create(part).await?;
    while let Some(chunk) = resp.chunk().await? {
      out.write_all(&chunk).await?;
    }
    out.flush().await?;
    Ok(())
  }
}

fn part_path(dest: &Path) -> PathBuf {
  let mut name = dest.as_os_str().to_owned();
  name.push(".part");
  PathBuf::from(name)
}
