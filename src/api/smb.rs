//! SMB relay endpoints / SMB 中继接口

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::BytesMut;
use chrono::Local;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::drivers::smb::ShareConfig;
use crate::error::RelayError;
use crate::folder_name::{generate_folder_name, FolderNameFormat};
use crate::models::{ConnectionTestResult, UploadItem};
use crate::relay;
use crate::state::AppState;

/// Parsed multipart upload / 解析后的上传表单
#[derive(Default)]
struct UploadForm {
    config: Option<ShareConfig>,
    folder_name: Option<String>,
    folder_format: Option<String>,
    items: Vec<UploadItem>,
}

/// A body cut off by the request limit is 413, anything else is malformed
fn multipart_error(e: MultipartError, max_request_size: u64) -> RelayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Upload rejected: body over the {} byte request limit", max_request_size);
        return RelayError::RequestTooLarge { limit: max_request_size };
    }
    RelayError::BadRequest(format!("malformed multipart body: {}", e.body_text()))
}

/// Read every part; files over `max_file_size` are drained and marked rejected
async fn read_form(
    multipart: &mut Multipart,
    max_file_size: u64,
    max_request_size: u64,
) -> Result<UploadForm, RelayError> {
    let mut form = UploadForm::default();
    let bad_multipart = |e: MultipartError| multipart_error(e, max_request_size);

    while let Some(mut field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "config" => {
                let text = field.text().await.map_err(bad_multipart)?;
                let config = serde_json::from_str::<ShareConfig>(&text)
                    .map_err(|e| RelayError::BadRequest(format!("config is not valid JSON: {}", e)))?;
                form.config = Some(config);
            }
            "folderName" => {
                let text = field.text().await.map_err(bad_multipart)?;
                form.folder_name = Some(text.trim().to_string()).filter(|s| !s.is_empty());
            }
            "folderFormat" => {
                let text = field.text().await.map_err(bad_multipart)?;
                form.folder_format = Some(text.trim().to_string()).filter(|s| !s.is_empty());
            }
            "files" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let mut data = BytesMut::new();
                let mut size: u64 = 0;

                while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
                    size += chunk.len() as u64;
                    if size <= max_file_size {
                        data.extend_from_slice(&chunk);
                    } else if !data.is_empty() {
                        data = BytesMut::new();
                    }
                }

                if size > max_file_size {
                    let err = RelayError::FileTooLarge {
                        name: file_name.clone(),
                        size,
                        limit: max_file_size,
                    };
                    tracing::warn!("{}", err);
                    form.items.push(UploadItem::rejected(file_name, err.to_string()));
                } else {
                    form.items.push(UploadItem::new(file_name, data.freeze()));
                }
            }
            other => {
                tracing::debug!("Ignoring multipart field {:?}", other);
            }
        }
    }

    Ok(form)
}

/// POST /api/smb/upload - 批量上传照片到共享
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RelayError> {
    let mut multipart = multipart.map_err(|e| RelayError::BadRequest(e.body_text()))?;
    let form = read_form(&mut multipart, state.settings.max_file_size, state.max_request_size).await?;

    let config = form
        .config
        .ok_or_else(|| RelayError::BadRequest("missing config field".to_string()))?;
    config.validate()?;
    if form.items.is_empty() {
        return Err(RelayError::BadRequest("no files were sent".to_string()));
    }

    let folder_name = match form.folder_name {
        Some(name) => name,
        None => {
            let format = form
                .folder_format
                .as_deref()
                .map(FolderNameFormat::from)
                .unwrap_or(state.settings.default_folder_format);
            generate_folder_name(format, &Local::now().naive_local())
        }
    };

    // Own task: a client disconnect must not cancel the batch while the share is mounted
    let task_state = state.clone();
    let items = form.items;
    let batch = tokio::spawn(async move {
        relay::relay_batch(
            task_state.mounter.clone(),
            task_state.writer.clone(),
            &task_state.settings,
            &config,
            &folder_name,
            items,
        )
        .await
    })
    .await
    .map_err(|e| RelayError::Internal(format!("upload task ended unexpectedly: {}", e)))??;

    let stored = batch.succeeded_paths.len();
    let total = stored + batch.failed_items.len();

    if stored == 0 {
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": "no file could be uploaded",
                "failed": batch.failed_items,
            })),
        )
            .into_response());
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("{} of {} file(s) uploaded to {}", stored, total, batch.folder_path),
        "paths": batch.succeeded_paths,
        "folderPath": batch.folder_path,
        "failed": batch.failed_items,
    }))
    .into_response())
}

/// POST /api/smb/test-connection - 测试共享连接
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ShareConfig>, JsonRejection>,
) -> Result<Json<ConnectionTestResult>, RelayError> {
    let Json(config) = payload.map_err(|e| RelayError::BadRequest(e.body_text()))?;
    let result = relay::test_connection(state.mounter.as_ref(), &config, state.settings.timeout()).await;
    Ok(Json(result))
}

/// GET /api/smb/folder-formats - 文件夹命名格式列表
pub async fn folder_formats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let now = Local::now().naive_local();
    let formats: Vec<Value> = FolderNameFormat::ALL
        .iter()
        .map(|format| {
            json!({
                "key": format.key(),
                "label": format.label(),
                "example": generate_folder_name(*format, &now),
                "default": *format == state.settings.default_folder_format,
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "message": "ok",
        "formats": formats,
    }))
}
