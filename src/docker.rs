use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::digest::ContentDigest;
use crate::error::{AppError, Result};
use crate::mirror::RegistryClient;

/// Registry client backed by the `docker` command line: pull, tag, push.
/// The pushed digest is extracted from the push output here so the
/// orchestrator only ever sees a structured value.
pub struct DockerCli {
    binary: String,
    digest_pattern: Regex,
}

impl DockerCli {
    pub fn new(binary: String) -> Result<Self> {
        Ok(Self {
            binary,
            digest_pattern: Regex::new(r"digest: (sha256:[a-f0-9]{64})")?,
        })
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("Running {} {}", self.binary, args.join(" "));
        let output = Command::new(&self.binary).args(args).output().await?;
        if !output.status.success() {
            return Err(AppError::Transfer(format!(
                "{} {} failed: {}",
                self.binary,
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RegistryClient for DockerCli {
    async fn pull(&self, reference: &str) -> Result<()> {
        self.run(&["pull", reference]).await?;
        Ok(())
    }

    async fn tag(&self, source: &str, destination: &str) -> Result<()> {
        self.run(&["tag", source, destination]).await?;
        Ok(())
    }

    async fn push(&self, destination: &str) -> Result<ContentDigest> {
        let output = self.run(&["push", destination]).await?;
        let captures = self.digest_pattern.captures(&output).ok_or_else(|| {
            AppError::Transfer(format!("no digest in push output for {}", destination))
        })?;
        captures[1]
            .parse::<ContentDigest>()
            .map_err(|e| AppError::Transfer(e.to_string()))
    }
}
