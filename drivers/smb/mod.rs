//! SMB/CIFS share relay (system native tooling) / SMB/CIFS 网络共享中继（系统原生支持）
//!
//! - `mount`: scoped mount sessions over a [`ShareMounter`]
//! - `cifs`: mount.cifs / umount / smbclient
//! - `local`: plain directories, no mounting
//! - `fs`: folder creation and file writes inside a mounted share

mod cifs;
mod fs;
mod local;
mod mount;
#[cfg(test)]
pub(crate) mod testing;

pub use cifs::CifsMounter;
pub use fs::{ensure_folder, write_file, LocalShareWriter, ShareWriter};
pub use local::LocalDirMounter;
pub use mount::{
    bounded, unique_mount_point, with_mounted_share, MountOptions, MountSession, MountState, Scoped,
    ShareMounter,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::utils::{normalize_base_path, unc_path};

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$|^[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("static regex")
});

static SHARE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-]+$").expect("static regex"));

/// Connection settings for one share, supplied per request / 共享连接配置（每次请求提供）
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShareConfig {
    /// 服务器地址 (例如: 192.168.1.100)
    pub server_address: String,
    pub username: String,
    pub password: String,
    /// 共享名称 (例如: photos)
    pub share_name: String,
    /// 共享内的根目录，默认为 "/"
    pub base_path: String,
}

impl std::fmt::Debug for ShareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareConfig")
            .field("server_address", &self.server_address)
            .field("username", &self.username)
            .field("password", &"***")
            .field("share_name", &self.share_name)
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl ShareConfig {
    /// Names of required fields that are empty / 缺失的必填字段
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.server_address.trim().is_empty() {
            missing.push("serverAddress");
        }
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        if self.share_name.trim().is_empty() {
            missing.push("shareName");
        }
        missing
    }

    /// Check presence and shape of every field; never touches the network / 校验配置
    pub fn validate(&self) -> Result<(), RelayError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(RelayError::BadRequest(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }
        if !ADDRESS_RE.is_match(self.server_address.trim()) {
            return Err(RelayError::BadRequest(
                "serverAddress must be an IPv4 address or a host name".to_string(),
            ));
        }
        if self.username.chars().count() > 64 {
            return Err(RelayError::BadRequest(
                "username must be 1-64 characters".to_string(),
            ));
        }
        if !SHARE_NAME_RE.is_match(self.share_name.trim()) {
            return Err(RelayError::BadRequest(
                "shareName may only contain letters, digits, _ and -".to_string(),
            ));
        }
        normalize_base_path(&self.base_path)?;
        Ok(())
    }

    /// CIFS source `//server/share` / 挂载源
    pub fn source(&self) -> String {
        format!("//{}/{}", self.server_address.trim(), self.share_name.trim())
    }

    /// `\\server\share\base\<segments>` as shown to users / 展示用 UNC 路径
    pub fn display_path(&self, segments: &[&str]) -> String {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push(self.base_path.as_str());
        all.extend_from_slice(segments);
        unc_path(self.server_address.trim(), self.share_name.trim(), &all)
    }
}
