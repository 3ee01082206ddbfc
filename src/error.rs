//! Relay error taxonomy / 中继错误类型
//!
//! Every variant maps to an HTTP status and renders as `{success:false, message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Malformed client input, nothing external was touched / 客户端输入错误
    #[error("{0}")]
    BadRequest(String),

    /// Path traversal or otherwise unsafe path / 非法路径
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("file {name} is too large ({size} bytes, limit {limit} bytes)")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// Whole request body over the configured limit / 请求体过大
    #[error("request is larger than the {limit} byte limit")]
    RequestTooLarge { limit: u64 },

    /// Mount utility answered with an error / 挂载失败
    #[error("mount failed: {0}")]
    Mount(String),

    /// External process did not answer in time / 外部命令超时
    #[error("{operation} timed out after {limit:?}")]
    MountTimeout { operation: &'static str, limit: Duration },

    #[error("cannot create folder {folder}: {reason}")]
    FolderCreate { folder: String, reason: String },

    #[error("cannot write {name}: {reason}")]
    Write { name: String, reason: String },

    /// Upload task ended without a result / 任务异常终止
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) | RelayError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            RelayError::FileTooLarge { .. } | RelayError::RequestTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            RelayError::Mount(_)
            | RelayError::MountTimeout { .. }
            | RelayError::FolderCreate { .. }
            | RelayError::Write { .. }
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Timeouts are the only failures worth retrying; an answered error is a config problem.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::MountTimeout { .. })
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(json!({
                "success": false,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Unmount failed after the work finished / 卸载失败（非致命）
///
/// Never changes the outcome of the operation; surfaced so leaked mounts can be found.
#[derive(Debug, Clone)]
pub struct UnmountWarning {
    pub mount_point: PathBuf,
    pub message: String,
}

impl std::fmt::Display for UnmountWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unmount of {:?} failed: {}", self.mount_point, self.message)
    }
}
