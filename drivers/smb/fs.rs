//! Folder creation and file writes inside a mounted share / 挂载共享内的目录与文件写入

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::RelayError;
use crate::utils::safe_segments;

/// Filesystem side of the relay, seam for fault injection / 写入能力
#[async_trait]
pub trait ShareWriter: Send + Sync {
    async fn ensure_folder(&self, root: &Path, base_path: &str, folder_name: &str) -> Result<PathBuf, RelayError>;

    async fn write_file(
        &self,
        root: &Path,
        base_path: &str,
        folder_name: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, RelayError>;
}

/// Plain tokio::fs writes against the mounted root
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalShareWriter;

#[async_trait]
impl ShareWriter for LocalShareWriter {
    async fn ensure_folder(&self, root: &Path, base_path: &str, folder_name: &str) -> Result<PathBuf, RelayError> {
        ensure_folder(root, base_path, folder_name).await
    }

    async fn write_file(
        &self,
        root: &Path,
        base_path: &str,
        folder_name: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, RelayError> {
        write_file(root, base_path, folder_name, file_name, bytes).await
    }
}

/// `root/base/folder`, validated before any filesystem access
fn resolve_folder(root: &Path, base_path: &str, folder_name: &str) -> Result<PathBuf, RelayError> {
    let base = safe_segments(base_path)?;
    let folder = safe_segments(folder_name)?;
    if folder.is_empty() {
        return Err(RelayError::InvalidPath("folder name is empty".to_string()));
    }

    let mut dir = root.to_path_buf();
    dir.extend(base);
    dir.extend(folder);
    Ok(dir)
}

/// Create the destination folder; an existing folder is success / 确保目标目录存在
pub async fn ensure_folder(root: &Path, base_path: &str, folder_name: &str) -> Result<PathBuf, RelayError> {
    let dir = resolve_folder(root, base_path, folder_name)?;

    // create_dir_all tolerates concurrent creators of the same folder
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| RelayError::FolderCreate {
            folder: folder_name.to_string(),
            reason: e.to_string(),
        })?;

    tracing::debug!("Folder ready: {:?}", dir);
    Ok(dir)
}

/// Write a whole file into the destination folder / 写入完整文件
///
/// Data goes to a per-call `.<name>.<token>.part` file first and is renamed into
/// place, so a failed write never leaves a truncated file under the final name.
/// An existing file under the final name is a `Write` error, never replaced.
pub async fn write_file(
    root: &Path,
    base_path: &str,
    folder_name: &str,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, RelayError> {
    let dir = resolve_folder(root, base_path, folder_name)?;
    let name_parts = safe_segments(file_name)?;
    if name_parts.len() != 1 || name_parts[0] != file_name {
        return Err(RelayError::InvalidPath(format!(
            "{:?} is not a plain file name",
            file_name
        )));
    }

    let target = dir.join(file_name);
    let token = uuid::Uuid::new_v4().simple().to_string();
    let partial = dir.join(format!(".{}.{}.part", file_name, &token[..8]));
    let write_err = |e: std::io::Error| RelayError::Write {
        name: file_name.to_string(),
        reason: e.to_string(),
    };

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&partial)
        .await
        .map_err(write_err)?;

    let result = async {
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        if tokio::fs::try_exists(&target).await? {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "a file with this name already exists",
            ));
        }
        tokio::fs::rename(&partial, &target).await
    }
    .await;

    if let Err(e) = result {
        tokio::fs::remove_file(&partial).await.ok();
        return Err(write_err(e));
    }

    tracing::debug!("Wrote {} bytes to {:?}", bytes.len(), target);
    Ok(target)
}
