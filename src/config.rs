//! Application configuration module / 应用配置模块
//!
//! Loaded once at startup from config.json (created with defaults on first run),
//! then overridden by HOST / PORT / ALLOWED_ORIGINS. Share credentials are never
//! part of it; they arrive with each request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::folder_name::FolderNameFormat;
use crate::models::DEFAULT_MAX_FILE_SIZE;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
    pub smb: SmbConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Origins allowed to call the API; empty or "*" means any / 允许跨域的来源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Upload limits / 上传限制
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Per-file limit in bytes / 单文件大小上限
    pub max_file_size: u64,
    /// Whole request body limit in bytes / 请求体上限
    pub max_request_size: u64,
    /// Accepted extensions, empty = all / 允许的扩展名
    pub allowed_extensions: Vec<String>,
    /// Used when the client sends no folderName / 默认文件夹格式
    pub default_folder_format: FolderNameFormat,
}

/// Which mounter backs the relay / 挂载方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmbBackend {
    /// mount -t cifs / umount / smbclient
    Cifs,
    /// Plain directories under `local_root`, for development / 本地目录（开发用）
    Local,
}

/// SMB tooling configuration / SMB 工具配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmbConfig {
    pub backend: SmbBackend,
    /// Parent directory of per-session mount points / 挂载点父目录
    pub mount_root: String,
    /// Bound on every external process call / 外部命令超时（秒）
    pub timeout_secs: u64,
    /// Extra attempts after a mount timeout, 0 = single attempt / 超时重试次数
    pub mount_retries: u32,
    pub retry_delay_ms: u64,
    pub mount_program: String,
    pub umount_program: String,
    pub smbclient_program: String,
    /// Passed as `vers=` when set / SMB 协议版本
    pub protocol_version: Option<String>,
    /// Root used by the local backend / 本地模式根目录
    pub local_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3131,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3131".to_string(),
                "http://127.0.0.1:3131".to_string(),
            ],
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_request_size: 10 * DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: [
                ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tiff", ".tif", ".svg",
                ".ico", ".heic", ".heif",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            default_folder_format: FolderNameFormat::default(),
        }
    }
}

impl Default for SmbConfig {
    fn default() -> Self {
        Self {
            backend: SmbBackend::Cifs,
            mount_root: "/tmp/smb_mounts".to_string(),
            timeout_secs: 30,
            mount_retries: 0,
            retry_delay_ms: 1000,
            mount_program: "mount".to_string(),
            umount_program: "umount".to_string(),
            smbclient_program: "smbclient".to_string(),
            protocol_version: None,
            local_root: "data/shares".to_string(),
        }
    }
}

impl SmbConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl AppConfig {
    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Apply HOST / PORT / ALLOWED_ORIGINS / 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self, vars: impl Fn(&str) -> Option<String>) {
        if let Some(host) = vars("HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }
        if let Some(port) = vars("PORT") {
            match port.trim().parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT value {:?}", port),
            }
        }
        if let Some(origins) = vars("ALLOWED_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    let mut config = if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        config
    } else {
        let config = AppConfig::default();
        save_config(config_path, &config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        config
    };

    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config_path: &Path, config: &AppConfig) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}
