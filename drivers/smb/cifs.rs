//! mount.cifs / umount / smbclient backed mounter (Linux) / 系统 CIFS 挂载实现
//!
//! Credentials never appear on a command line: they are written to an owner-only
//! temporary file that lives exactly as long as the child process.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tempfile::NamedTempFile;
use tokio::process::Command;

use super::{ShareConfig, ShareMounter};
use crate::config::SmbConfig;
use crate::error::RelayError;

pub struct CifsMounter {
    mount_program: String,
    umount_program: String,
    smbclient_program: String,
    protocol_version: Option<String>,
}

impl CifsMounter {
    pub fn new(config: &SmbConfig) -> Self {
        Self {
            mount_program: config.mount_program.clone(),
            umount_program: config.umount_program.clone(),
            smbclient_program: config.smbclient_program.clone(),
            protocol_version: config.protocol_version.clone().filter(|v| !v.trim().is_empty()),
        }
    }

    /// `-o` value for mount.cifs / 挂载选项
    fn mount_options(&self, credentials: &Path) -> String {
        let mut options = format!("credentials={}", credentials.display());
        #[cfg(unix)]
        {
            let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
            options.push_str(&format!(",uid={},gid={}", uid, gid));
        }
        if let Some(vers) = &self.protocol_version {
            options.push_str(&format!(",vers={}", vers.trim()));
        }
        options
    }

    /// smbclient speaks protocol names, not dialect numbers
    fn smbclient_protocol(&self) -> Option<&'static str> {
        let vers = self.protocol_version.as_deref()?.trim();
        Some(match vers {
            "1.0" => "NT1",
            v if v.starts_with('2') => "SMB2",
            _ => "SMB3",
        })
    }
}

/// Owner-only temporary file holding `contents` / 仅所有者可读的凭据文件
fn credentials_file(contents: &str) -> Result<NamedTempFile, RelayError> {
    let io_err = |e: std::io::Error| RelayError::Mount(format!("cannot write credentials file: {}", e));

    let mut file = tempfile::Builder::new()
        .prefix(".smbcred")
        .tempfile()
        .map_err(io_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
    }

    file.write_all(contents.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(file)
}

/// Run a utility to completion; non-zero exit becomes `Mount` with its diagnostic
async fn run(program: &str, args: &[&str]) -> Result<Output, RelayError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| RelayError::Mount(format!("failed to run {}: {}", program, e)))?;

    if output.status.success() {
        return Ok(output);
    }

    Err(RelayError::Mount(diagnostic(program, &output)))
}

fn diagnostic(program: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if !stderr.trim().is_empty() { stderr } else { stdout };
    let text = text.trim();
    if text.is_empty() {
        format!("{} exited with {}", program, output.status)
    } else {
        text.to_string()
    }
}

#[async_trait]
impl ShareMounter for CifsMounter {
    async fn mount(&self, config: &ShareConfig, mount_point: &Path) -> Result<PathBuf, RelayError> {
        let source = config.source();
        let credentials = credentials_file(&format!(
            "username={}\npassword={}\n",
            config.username.trim(),
            config.password
        ))?;
        let options = self.mount_options(credentials.path());
        let target = mount_point.to_string_lossy();

        tracing::debug!("{} -t cifs {} {} -o <options>", self.mount_program, source, target);
        run(
            &self.mount_program,
            &["-t", "cifs", source.as_str(), &*target, "-o", options.as_str()],
        )
        .await?;

        tracing::info!("CIFS mounted: {} -> {:?}", source, mount_point);
        Ok(mount_point.to_path_buf())
    }

    async fn unmount(&self, mount_point: &Path) -> Result<(), RelayError> {
        let target = mount_point.to_string_lossy();
        run(&self.umount_program, &[&*target]).await?;
        tracing::info!("CIFS unmounted: {:?}", mount_point);
        Ok(())
    }

    async fn probe(&self, config: &ShareConfig) -> Result<(), RelayError> {
        let source = config.source();
        let credentials = credentials_file(&format!(
            "username = {}\npassword = {}\n",
            config.username.trim(),
            config.password
        ))?;
        let auth_file = credentials.path().to_string_lossy().to_string();

        let mut args = vec![source.as_str(), "-A", auth_file.as_str(), "-c", "ls"];
        if let Some(protocol) = self.smbclient_protocol() {
            args.extend(["-m", protocol]);
        }

        tracing::debug!("Probing {} with {}", source, self.smbclient_program);
        run(&self.smbclient_program, &args).await?;
        Ok(())
    }
}
