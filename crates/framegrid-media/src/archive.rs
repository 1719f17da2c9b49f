// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password-protected archives via the system `zip` tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use framegrid_core::{AdapterType, ArchivePackager, GridError, HealthStatus, PluginAdapter};

fn archive_err(message: impl Into<String>, source: Option<std::io::Error>) -> GridError {
    GridError::Archive {
        message: message.into(),
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }
}

/// Arguments for a store-only (`-0`), flat (`-j`), encrypted archive.
pub(crate) fn zip_args(files: &[PathBuf], dest: &Path, password: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-q", "-0", "-j", "-P", password]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(dest.as_os_str().to_owned());
    args.extend(files.iter().map(|f| f.as_os_str().to_owned()));
    args
}

/// Packs files with `zip -0 -P`. Media is already compressed, so entries are
/// stored as-is.
#[derive(Debug, Default)]
pub struct ZipPackager;

impl ZipPackager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PluginAdapter for ZipPackager {
    fn name(&self) -> &str {
        "zip"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Archive
    }

    async fn health_check(&self) -> Result<HealthStatus, GridError> {
        Ok(match which::which("zip") {
            Ok(_) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy("zip not found in PATH".to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), GridError> {
        Ok(())
    }
}

#[async_trait]
impl ArchivePackager for ZipPackager {
    async fn package_encrypted(
        &self,
        files: &[PathBuf],
        dest: &Path,
        password: &str,
    ) -> Result<(), GridError> {
        if files.is_empty() {
            return Err(archive_err("nothing to archive", None));
        }
        if password.is_empty() {
            return Err(archive_err("archive password must not be empty", None));
        }

        // zip appends to an existing archive instead of replacing it.
        match tokio::fs::remove_file(dest).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(archive_err(
                    format!("cannot replace {}", dest.display()),
                    Some(e),
                ));
            }
        }

        which::which("zip").map_err(|e| GridError::Archive {
            message: "zip not found in PATH".to_string(),
            source: Some(Box::new(e)),
        })?;

        let output = Command::new("zip")
            .args(zip_args(files, dest, password))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| archive_err("failed to run zip", Some(e)))?;

        if !output.status.success() {
            return Err(archive_err(
                format!(
                    "zip exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                None,
            ));
        }

        info!(dest = %dest.display(), files = files.len(), "created encrypted archive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_store_flat_and_encrypt() {
        let files = vec![PathBuf::from("/w/a.mp4"), PathBuf::from("/w/a.jpg")];
        let args = zip_args(&files, Path::new("/w/a.zip"), "secret");
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            ["-q", "-0", "-j", "-P", "secret", "/w/a.zip", "/w/a.mp4", "/w/a.jpg"]
        );
    }

    #[tokio::test]
    async fn rejects_empty_inputs() {
        let zip = ZipPackager::new();
        let err = zip
            .package_encrypted(&[], Path::new("/tmp/x.zip"), "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::Archive { .. }));

        let err = zip
            .package_encrypted(&[PathBuf::from("a")], Path::new("/tmp/x.zip"), "")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[tokio::test]
    async fn replaces_an_existing_archive_when_zip_is_available() {
        if which::which("zip").is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let payload = dir.path().join("clip.bin");
        std::fs::write(&payload, b"payload").unwrap();
        let dest = dir.path().join("clip.zip");
        std::fs::write(&dest, b"stale, not a zip").unwrap();

        ZipPackager::new()
            .package_encrypted(&[payload], &dest, "pw")
            .await
            .unwrap();

        let bytes = std::fs::read(&dest).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }
}
