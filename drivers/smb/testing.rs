//! In-memory doubles for the mount and write capabilities

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{LocalShareWriter, ShareConfig, ShareMounter, ShareWriter};
use crate::error::RelayError;

pub(crate) fn share_config() -> ShareConfig {
    ShareConfig {
        server_address: "192.168.12.20".to_string(),
        username: "photo".to_string(),
        password: "s3cret".to_string(),
        share_name: "photos".to_string(),
        base_path: "/uploads".to_string(),
    }
}

/// "Mounts" by handing out a fixed directory and counts every invocation
pub(crate) struct RecordingMounter {
    share_root: PathBuf,
    mounts: AtomicUsize,
    unmounts: AtomicUsize,
    probes: AtomicUsize,
    mount_error: Option<String>,
    unmount_error: Option<String>,
    probe_error: Option<String>,
    delay: Duration,
}

impl RecordingMounter {
    pub fn new(share_root: &Path) -> Self {
        Self {
            share_root: share_root.to_path_buf(),
            mounts: AtomicUsize::new(0),
            unmounts: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            mount_error: None,
            unmount_error: None,
            probe_error: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_mount_error(mut self, msg: &str) -> Self {
        self.mount_error = Some(msg.to_string());
        self
    }

    pub fn with_unmount_error(mut self, msg: &str) -> Self {
        self.unmount_error = Some(msg.to_string());
        self
    }

    pub fn with_probe_error(mut self, msg: &str) -> Self {
        self.probe_error = Some(msg.to_string());
        self
    }

    /// Mount and probe sleep this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }

    pub fn unmount_count(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> usize {
        self.mount_count() + self.unmount_count() + self.probe_count()
    }
}

#[async_trait]
impl ShareMounter for RecordingMounter {
    async fn mount(&self, _config: &ShareConfig, _mount_point: &Path) -> Result<PathBuf, RelayError> {
        self.mounts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(msg) = &self.mount_error {
            return Err(RelayError::Mount(msg.clone()));
        }
        tokio::fs::create_dir_all(&self.share_root)
            .await
            .map_err(|e| RelayError::Mount(e.to_string()))?;
        Ok(self.share_root.clone())
    }

    async fn unmount(&self, _mount_point: &Path) -> Result<(), RelayError> {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        match &self.unmount_error {
            Some(msg) => Err(RelayError::Mount(msg.clone())),
            None => Ok(()),
        }
    }

    async fn probe(&self, _config: &ShareConfig) -> Result<(), RelayError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.probe_error {
            Some(msg) => Err(RelayError::Mount(msg.clone())),
            None => Ok(()),
        }
    }
}

/// Real local writes with injected faults
#[derive(Default)]
pub(crate) struct FaultyWriter {
    inner: LocalShareWriter,
    /// 0-based indexes of write calls that fail
    failing_writes: HashSet<usize>,
    fail_all_writes: bool,
    fail_folder: bool,
    writes: AtomicUsize,
}

impl FaultyWriter {
    pub fn failing_writes(indexes: &[usize]) -> Self {
        Self {
            failing_writes: indexes.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn failing_all_writes() -> Self {
        Self {
            fail_all_writes: true,
            ..Default::default()
        }
    }

    pub fn failing_folder() -> Self {
        Self {
            fail_folder: true,
            ..Default::default()
        }
    }

    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShareWriter for FaultyWriter {
    async fn ensure_folder(&self, root: &Path, base_path: &str, folder_name: &str) -> Result<PathBuf, RelayError> {
        if self.fail_folder {
            return Err(RelayError::FolderCreate {
                folder: folder_name.to_string(),
                reason: "Permission denied (injected)".to_string(),
            });
        }
        self.inner.ensure_folder(root, base_path, folder_name).await
    }

    async fn write_file(
        &self,
        root: &Path,
        base_path: &str,
        folder_name: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, RelayError> {
        let index = self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_all_writes || self.failing_writes.contains(&index) {
            return Err(RelayError::Write {
                name: file_name.to_string(),
                reason: "No space left on device (injected)".to_string(),
            });
        }
        self.inner
            .write_file(root, base_path, folder_name, file_name, bytes)
            .await
    }
}
