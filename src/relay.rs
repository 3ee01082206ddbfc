//! Upload relay and connection test / 上传中继与连接测试
//!
//! One batch = one mount session: the destination folder is ensured once, then
//! every file is written in order. A failing file is recorded and the batch
//! carries on; only mount and folder failures abort it.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::drivers::smb::{bounded, with_mounted_share, MountOptions, ShareConfig, ShareMounter, ShareWriter};
use crate::error::RelayError;
use crate::folder_name::FolderNameFormat;
use crate::models::{ConnectionTestResult, UploadBatchResult, UploadItem};
use crate::utils::{is_allowed_extension, normalize_base_path, safe_segments, sanitize_file_name, timestamped_name};

/// Per-process relay limits, read-only after startup / 中继参数
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub mount: MountOptions,
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
    pub default_folder_format: FolderNameFormat,
}

impl RelaySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mount: MountOptions::from_config(&config.smb),
            max_file_size: config.upload.max_file_size,
            allowed_extensions: config.upload.allowed_extensions.clone(),
            default_folder_format: config.upload.default_folder_format,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.mount.timeout
    }
}

/// Batch progress, for logs / 批次状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Received,
    FolderEnsuring,
    WritingFiles(usize),
    Completed,
    Failed,
}

impl std::fmt::Display for BatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStage::Received => write!(f, "received"),
            BatchStage::FolderEnsuring => write!(f, "folder-ensuring"),
            BatchStage::WritingFiles(i) => write!(f, "writing-files({})", i),
            BatchStage::Completed => write!(f, "completed"),
            BatchStage::Failed => write!(f, "failed"),
        }
    }
}

enum Prepared {
    Write { original: String, name: String, item: UploadItem },
    Reject { original: String, reason: String },
}

/// Decide per item whether it may reach the writer / 预检每个文件
fn screen(settings: &RelaySettings, item: UploadItem) -> Prepared {
    let original = item.original_name.clone();
    if let Some(reason) = item.rejected.clone() {
        return Prepared::Reject { original, reason };
    }
    if item.bytes.len() as u64 > settings.max_file_size {
        let err = RelayError::FileTooLarge {
            name: original.clone(),
            size: item.bytes.len() as u64,
            limit: settings.max_file_size,
        };
        return Prepared::Reject { original, reason: err.to_string() };
    }
    let Some(name) = sanitize_file_name(&original) else {
        let err = RelayError::InvalidPath(format!("{:?} is not a usable file name", original));
        return Prepared::Reject { original, reason: err.to_string() };
    };
    if !is_allowed_extension(&name, &settings.allowed_extensions) {
        return Prepared::Reject {
            original,
            reason: format!("{} is not an accepted file type", name),
        };
    }
    Prepared::Write { original, name, item }
}

/// Millisecond stamp, strictly increasing within one batch
fn next_stamp(last: &mut i64) -> i64 {
    let stamp = Utc::now().timestamp_millis().max(*last + 1);
    *last = stamp;
    stamp
}

/// Relay one batch to the share / 中继一个批次
///
/// `Err` means the batch aborted before any write (bad path, mount, folder).
/// `Ok` carries per-file outcomes; the caller decides the status from them.
pub async fn relay_batch(
    mounter: Arc<dyn ShareMounter>,
    writer: Arc<dyn ShareWriter>,
    settings: &RelaySettings,
    config: &ShareConfig,
    folder_name: &str,
    items: Vec<UploadItem>,
) -> Result<UploadBatchResult, RelayError> {
    tracing::info!(
        "Upload batch for {}: {} file(s) into {:?} [{}]",
        config.source(),
        items.len(),
        folder_name,
        BatchStage::Received
    );

    // Path checks run before anything external happens
    let base_path = normalize_base_path(&config.base_path)?;
    if safe_segments(folder_name)?.is_empty() {
        return Err(RelayError::InvalidPath("folder name is empty".to_string()));
    }
    let folder_path = config.display_path(&[folder_name]);

    let prepared: Vec<Prepared> = items.into_iter().map(|item| screen(settings, item)).collect();

    if !prepared.iter().any(|p| matches!(p, Prepared::Write { .. })) {
        let mut result = UploadBatchResult {
            folder_path,
            ..Default::default()
        };
        for p in prepared {
            if let Prepared::Reject { original, reason } = p {
                result.record_failure(&original, reason);
            }
        }
        tracing::warn!("Upload batch for {}: nothing left to write, share not mounted", config.source());
        return Ok(result);
    }

    let source = config.source();
    let folder_name = folder_name.to_string();
    let scoped = with_mounted_share(mounter, config, &settings.mount, move |root| async move {
        let mut result = UploadBatchResult {
            folder_path,
            ..Default::default()
        };
        let mut stage = BatchStage::FolderEnsuring;
        tracing::debug!("[{}] {:?}", stage, folder_name);
        if let Err(e) = writer.ensure_folder(&root, &base_path, &folder_name).await {
            tracing::error!("[{}] folder {:?}: {}", BatchStage::Failed, folder_name, e);
            return Err(e);
        }

        let total = prepared.len();
        let mut last_stamp = 0;
        for (i, p) in prepared.into_iter().enumerate() {
            stage = BatchStage::WritingFiles(i);
            match p {
                Prepared::Reject { original, reason } => {
                    tracing::warn!("[{}] {} rejected: {}", stage, original, reason);
                    result.record_failure(&original, reason);
                }
                Prepared::Write { original, name, item } => {
                    let stored = timestamped_name(next_stamp(&mut last_stamp), &name);
                    match writer
                        .write_file(&root, &base_path, &folder_name, &stored, &item.bytes)
                        .await
                    {
                        Ok(_) => {
                            tracing::info!("[{}] {}/{} {} -> {}", stage, i + 1, total, original, stored);
                            result.record_success(format!("{}\\{}", result.folder_path, stored));
                        }
                        Err(e) => {
                            tracing::warn!("[{}] {}/{} {} failed: {}", stage, i + 1, total, original, e);
                            result.record_failure(&original, e);
                        }
                    }
                }
            }
        }

        tracing::info!(
            "[{}] {} stored, {} failed",
            BatchStage::Completed,
            result.succeeded_paths.len(),
            result.failed_items.len()
        );
        Ok(result)
    })
    .await?;

    let mut result = scoped.value?;
    if let Some(warning) = scoped.warning {
        tracing::warn!(
            "Upload batch for {} into {} finished, but {}",
            source,
            result.folder_path,
            warning
        );
        result.unmount_warning = Some(warning);
    }
    Ok(result)
}

/// Advisory reachability check; every failure becomes `success: false` / 测试连接
pub async fn test_connection(
    mounter: &dyn ShareMounter,
    config: &ShareConfig,
    timeout: Duration,
) -> ConnectionTestResult {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        return ConnectionTestResult::failed(format!(
            "missing required field(s): {}",
            missing.join(", ")
        ));
    }
    if let Err(e) = config.validate() {
        return ConnectionTestResult::failed(e.to_string());
    }

    let target = config.display_path(&[]);
    match bounded("probe", timeout, mounter.probe(config)).await {
        Ok(()) => {
            tracing::info!("Connection test to {} succeeded", config.source());
            ConnectionTestResult::ok(format!("connected to {}", target))
        }
        Err(e) => {
            tracing::warn!("Connection test to {} failed: {}", config.source(), e);
            ConnectionTestResult::failed(format!("cannot reach {}: {}", target, e))
        }
    }
}
