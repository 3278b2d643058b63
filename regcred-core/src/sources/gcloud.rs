//! Token source backed by the gcloud SDK.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;

use super::{SourceError, TokenSource};
use crate::store::Secret;

/// Arguments asking the SDK for a freshly-refreshed access token in a
/// machine-readable format.
pub const CONFIG_HELPER_ARGS: &[&str] = &[
    "config",
    "config-helper",
    "--force-auth-refresh",
    "--format=value(credential.access_token)",
];

/// Runs an external SDK command and returns its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> std::io::Result<Vec<u8>>;
}

/// The real runner: spawns the `gcloud` binary and waits for it.
pub struct SdkCommand {
    program: String,
}

impl SdkCommand {
    pub fn new() -> Self {
        Self {
            program: "gcloud".to_string(),
        }
    }

    /// Use a different binary name or path, e.g. for a vendored SDK.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SdkCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SdkCommand {
    async fn run(&self, args: &[&str]) -> std::io::Result<Vec<u8>> {
        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(std::io::Error::other(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

/// Resolves a token by shelling out to the SDK. Shelling out is the only
/// supported way to obtain the SDK's own access token.
pub struct GcloudSource {
    runner: Arc<dyn CommandRunner>,
}

impl GcloudSource {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl TokenSource for GcloudSource {
    async fn fetch(&self) -> Result<Secret, SourceError> {
        let stdout = self
            .runner
            .run(CONFIG_HELPER_ARGS)
            .await
            .map_err(SourceError::ExternalTool)?;

        let token = String::from_utf8_lossy(&stdout).trim().to_string();
        if token.is_empty() {
            return Err(SourceError::EmptyToken);
        }
        Ok(Secret::new(token))
    }
}
