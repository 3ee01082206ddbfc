//! Local directory backend / 本地目录模式
//!
//! Each share maps to `<root>/<server>/<share>`; nothing is mounted. Used for
//! development machines without CIFS tooling.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{ShareConfig, ShareMounter};
use crate::error::RelayError;

pub struct LocalDirMounter {
    root: PathBuf,
}

impl LocalDirMounter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn share_dir(&self, config: &ShareConfig) -> PathBuf {
        self.root
            .join(config.server_address.trim())
            .join(config.share_name.trim())
    }
}

#[async_trait]
impl ShareMounter for LocalDirMounter {
    async fn mount(&self, config: &ShareConfig, _mount_point: &Path) -> Result<PathBuf, RelayError> {
        let dir = self.share_dir(config);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| RelayError::Mount(format!("cannot prepare {:?}: {}", dir, e)))?;
        tracing::debug!("Local share {} -> {:?}", config.source(), dir);
        Ok(dir)
    }

    async fn unmount(&self, _mount_point: &Path) -> Result<(), RelayError> {
        Ok(())
    }

    async fn probe(&self, config: &ShareConfig) -> Result<(), RelayError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {
                tracing::debug!("Local probe of {} ok", config.source());
                Ok(())
            }
            Ok(_) => Err(RelayError::Mount(format!("{:?} is not a directory", self.root))),
            Err(e) => Err(RelayError::Mount(format!("{:?}: {}", self.root, e))),
        }
    }
}
