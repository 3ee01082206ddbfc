use std::sync::Arc;

use crate::config::{AppConfig, SmbBackend};
use crate::drivers::smb::{CifsMounter, LocalDirMounter, LocalShareWriter, ShareMounter, ShareWriter};
use crate::relay::RelaySettings;

/// Shared application state / 应用共享状态
pub struct AppState {
    pub mounter: Arc<dyn ShareMounter>,
    pub writer: Arc<dyn ShareWriter>,
    pub settings: RelaySettings,
    /// Whole-request body limit / 请求体上限
    pub max_request_size: u64,
}

impl AppState {
    /// Build state with the mounter selected by `smb.backend` / 按配置选择挂载方式
    pub fn from_config(config: &AppConfig) -> Self {
        let mounter: Arc<dyn ShareMounter> = match config.smb.backend {
            SmbBackend::Cifs => Arc::new(CifsMounter::new(&config.smb)),
            SmbBackend::Local => Arc::new(LocalDirMounter::new(&config.smb.local_root)),
        };
        Self::with_capabilities(config, mounter, Arc::new(LocalShareWriter))
    }

    pub fn with_capabilities(
        config: &AppConfig,
        mounter: Arc<dyn ShareMounter>,
        writer: Arc<dyn ShareWriter>,
    ) -> Self {
        Self {
            mounter,
            writer,
            settings: RelaySettings::from_config(config),
            max_request_size: config.upload.max_request_size,
        }
    }
}
