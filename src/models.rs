use bytes::Bytes;
use serde::Serialize;

use crate::error::UnmountWarning;

/// Default per-file limit: 50 MiB / 单文件默认上限
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// One file part of an upload batch / 上传批次中的单个文件
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub original_name: String,
    pub bytes: Bytes,
    /// Set by the HTTP layer when the part was refused before reaching the writer
    pub rejected: Option<String>,
}

impl UploadItem {
    pub fn new(original_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes: bytes.into(),
            rejected: None,
        }
    }

    pub fn rejected(original_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes: Bytes::new(),
            rejected: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailedItem {
    pub name: String,
    #[serde(rename = "errorMessage")]
    pub error: String,
}

/// Outcome of one upload batch / 批量上传结果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBatchResult {
    pub succeeded_paths: Vec<String>,
    pub failed_items: Vec<FailedItem>,
    pub folder_path: String,
    /// Release problem after the writes; logged, never sent to clients
    #[serde(skip)]
    pub unmount_warning: Option<UnmountWarning>,
}

impl UploadBatchResult {
    pub fn record_success(&mut self, path: String) {
        self.succeeded_paths.push(path);
    }

    pub fn record_failure(&mut self, name: &str, error: impl ToString) {
        self.failed_items.push(FailedItem {
            name: name.to_string(),
            error: error.to_string(),
        });
    }
}

/// Result of a connection probe / 连接测试结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}

impl ConnectionTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}
