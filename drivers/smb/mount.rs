//! Scoped share mounts / 作用域挂载会话
//!
//! A [`MountSession`] owns one uniquely named mount point for the length of one
//! operation. Release runs on every exit path: explicitly through
//! [`MountSession::close`], or from `Drop` when the session is abandoned.

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::ShareConfig;
use crate::config::SmbConfig;
use crate::error::{RelayError, UnmountWarning};

/// External mount tooling, swappable for tests and local development / 外部挂载能力
#[async_trait]
pub trait ShareMounter: Send + Sync {
    /// Mount the share at `mount_point`; returns the local root of the share.
    async fn mount(&self, config: &ShareConfig, mount_point: &Path) -> Result<PathBuf, RelayError>;

    async fn unmount(&self, mount_point: &Path) -> Result<(), RelayError>;

    /// Read-only reachability check, no mount / 只读探测
    async fn probe(&self, config: &ShareConfig) -> Result<(), RelayError>;
}

#[derive(Debug, Clone)]
pub struct MountOptions {
    pub mount_root: PathBuf,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl MountOptions {
    pub fn from_config(config: &SmbConfig) -> Self {
        Self {
            mount_root: PathBuf::from(&config.mount_root),
            timeout: config.timeout(),
            retries: config.mount_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

/// Run one external call under a deadline / 带超时执行外部调用
pub async fn bounded<T, Fut>(operation: &'static str, limit: Duration, fut: Fut) -> Result<T, RelayError>
where
    Fut: Future<Output = Result<T, RelayError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::MountTimeout {
            operation,
            limit,
        }),
    }
}

/// `<root>/<server>_<share>_<nanos>_<token>`, distinct across concurrent sessions / 生成唯一挂载点
pub fn unique_mount_point(root: &Path, config: &ShareConfig) -> PathBuf {
    let label: String = format!("{}_{}", config.server_address.trim(), config.share_name.trim())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let token = uuid::Uuid::new_v4().simple().to_string();
    root.join(format!("{}_{}_{}", label, nanos, &token[..8]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Mounted,
    Failed,
}

/// One mount-point lifecycle / 一次挂载的生命周期
pub struct MountSession {
    mounter: Arc<dyn ShareMounter>,
    mount_point: PathBuf,
    root: PathBuf,
    state: MountState,
    options: MountOptions,
}

impl MountSession {
    pub fn new(mounter: Arc<dyn ShareMounter>, config: &ShareConfig, options: &MountOptions) -> Self {
        let mount_point = unique_mount_point(&options.mount_root, config);
        Self {
            mounter,
            root: mount_point.clone(),
            mount_point,
            state: MountState::Unmounted,
            options: options.clone(),
        }
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Local path where the share's content is reachable / 共享内容的本地根路径
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the mount point and mount into it / 创建挂载点并挂载
    pub async fn mount(&mut self, config: &ShareConfig) -> Result<(), RelayError> {
        if let Err(e) = tokio::fs::create_dir_all(&self.mount_point).await {
            self.state = MountState::Failed;
            return Err(RelayError::Mount(format!(
                "cannot create mount point {:?}: {}",
                self.mount_point, e
            )));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = bounded(
                "mount",
                self.options.timeout,
                self.mounter.mount(config, &self.mount_point),
            )
            .await;

            match result {
                Ok(root) => {
                    tracing::info!(
                        "Mounted {} at {:?} (attempt {})",
                        config.source(),
                        self.mount_point,
                        attempt
                    );
                    self.root = root;
                    self.state = MountState::Mounted;
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt <= self.options.retries => {
                    tracing::warn!(
                        "Mount of {} failed (attempt {}/{}): {}, retrying in {:?}...",
                        config.source(),
                        attempt,
                        self.options.retries + 1,
                        e,
                        self.options.retry_delay
                    );
                    self.discard_partial_mount().await;
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(e) => {
                    tracing::error!("Mount of {} failed: {}", config.source(), e);
                    if e.is_transient() {
                        self.discard_partial_mount().await;
                    }
                    self.state = MountState::Failed;
                    if let Err(rm) = tokio::fs::remove_dir(&self.mount_point).await {
                        tracing::warn!("Cannot remove mount point {:?}: {}", self.mount_point, rm);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// A killed mount process may still have attached the share
    async fn discard_partial_mount(&self) {
        if let Err(e) = bounded(
            "unmount",
            self.options.timeout,
            self.mounter.unmount(&self.mount_point),
        )
        .await
        {
            tracing::debug!("Cleanup unmount of {:?}: {}", self.mount_point, e);
        }
    }

    /// Unmount and remove the mount point / 卸载并删除挂载点
    pub async fn close(mut self) -> Option<UnmountWarning> {
        if self.state != MountState::Mounted {
            return None;
        }
        let warning = release(self.mounter.as_ref(), &self.mount_point, self.options.timeout).await;
        self.state = MountState::Unmounted;
        warning
    }
}

impl Drop for MountSession {
    fn drop(&mut self) {
        if self.state != MountState::Mounted {
            return;
        }
        // Abandoned while mounted (panic or cancelled future): finish the release in the background
        let mounter = self.mounter.clone();
        let mount_point = self.mount_point.clone();
        let timeout = self.options.timeout;
        tracing::warn!("Mount session {:?} dropped while mounted, scheduling unmount", mount_point);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release(mounter.as_ref(), &mount_point, timeout).await;
                });
            }
            Err(_) => {
                tracing::error!("No runtime to unmount {:?}, mount leaked", mount_point);
            }
        }
    }
}

async fn release(
    mounter: &dyn ShareMounter,
    mount_point: &Path,
    timeout: Duration,
) -> Option<UnmountWarning> {
    if let Err(e) = bounded("unmount", timeout, mounter.unmount(mount_point)).await {
        // Still mounted: removing the directory now could reach into the share
        let warning = UnmountWarning {
            mount_point: mount_point.to_path_buf(),
            message: e.to_string(),
        };
        tracing::warn!("{}", warning);
        return Some(warning);
    }

    if let Err(e) = tokio::fs::remove_dir(mount_point).await {
        let warning = UnmountWarning {
            mount_point: mount_point.to_path_buf(),
            message: format!("unmounted but directory not removed: {}", e),
        };
        tracing::warn!("{}", warning);
        return Some(warning);
    }

    tracing::debug!("Unmounted and removed {:?}", mount_point);
    None
}

/// Value produced inside a mount scope, plus any release warning / 作用域结果
#[derive(Debug)]
pub struct Scoped<T> {
    pub value: T,
    pub warning: Option<UnmountWarning>,
}

/// Mount, run `f` against the share root, always unmount / 挂载后执行并保证卸载
pub async fn with_mounted_share<F, Fut, T>(
    mounter: Arc<dyn ShareMounter>,
    config: &ShareConfig,
    options: &MountOptions,
    f: F,
) -> Result<Scoped<T>, RelayError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = T>,
{
    let mut session = MountSession::new(mounter, config, options);
    session.mount(config).await?;

    let value = f(session.root().to_path_buf()).await;
    let warning = session.close().await;

    Ok(Scoped { value, warning })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::smb::testing::{share_config, RecordingMounter};

    fn options(root: &Path) -> MountOptions {
        MountOptions {
            mount_root: root.to_path_buf(),
            timeout: Duration::from_secs(5),
            retries: 0,
            retry_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_unique_mount_points() {
        let config = share_config();
        let root = Path::new("/tmp/smb_mounts");
        let a = unique_mount_point(root, &config);
        let b = unique_mount_point(root, &config);
        assert_ne!(a, b);
        assert!(a.starts_with(root));
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("192_168_12_20_photos_"));
    }

    #[tokio::test]
    async fn test_scope_mounts_and_releases() {
        let mounts = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let mounter = Arc::new(RecordingMounter::new(share.path()));

        let scoped = with_mounted_share(mounter.clone(), &share_config(), &options(mounts.path()), |root| async move {
            root
        })
        .await
        .unwrap();

        assert_eq!(scoped.value, share.path());
        assert!(scoped.warning.is_none());
        assert_eq!(mounter.mount_count(), 1);
        assert_eq!(mounter.unmount_count(), 1);
        // mount point directory removed
        assert_eq!(std::fs::read_dir(mounts.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_release_runs_when_work_fails() {
        let mounts = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let mounter = Arc::new(RecordingMounter::new(share.path()));

        let scoped = with_mounted_share(mounter.clone(), &share_config(), &options(mounts.path()), |_| async {
            Err::<(), _>(RelayError::FolderCreate {
                folder: "x".into(),
                reason: "denied".into(),
            })
        })
        .await
        .unwrap();

        assert!(scoped.value.is_err());
        assert_eq!(mounter.mount_count(), mounter.unmount_count());
    }

    #[tokio::test]
    async fn test_mount_failure_leaves_nothing_behind() {
        let mounts = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let mounter = Arc::new(
            RecordingMounter::new(share.path()).with_mount_error("mount error(13): Permission denied"),
        );

        let result = with_mounted_share(mounter.clone(), &share_config(), &options(mounts.path()), |_| async {}).await;

        match result {
            Err(RelayError::Mount(msg)) => assert!(msg.contains("Permission denied")),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
        assert_eq!(mounter.mount_count(), 1);
        assert_eq!(mounter.unmount_count(), 0);
        assert_eq!(std::fs::read_dir(mounts.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_answered_errors_are_not_retried() {
        let mounts = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let mounter = Arc::new(RecordingMounter::new(share.path()).with_mount_error("bad credentials"));
        let mut opts = options(mounts.path());
        opts.retries = 3;

        let result = with_mounted_share(mounter.clone(), &share_config(), &opts, |_| async {}).await;
        assert!(result.is_err());
        assert_eq!(mounter.mount_count(), 1);
    }

    #[tokio::test]
    async fn test_mount_timeout() {
        let mounts = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let mounter = Arc::new(RecordingMounter::new(share.path()).with_delay(Duration::from_millis(500)));
        let mut opts = options(mounts.path());
        opts.timeout = Duration::from_millis(50);
        opts.retries = 1;

        let result = with_mounted_share(mounter.clone(), &share_config(), &opts, |_| async {}).await;

        assert!(matches!(result, Err(RelayError::MountTimeout { operation: "mount", .. })));
        // one retry, and every timed-out attempt is followed by a cleanup unmount
        assert_eq!(mounter.mount_count(), 2);
        assert_eq!(mounter.unmount_count(), 2);
        assert_eq!(std::fs::read_dir(mounts.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unmount_failure_is_a_warning() {
        let mounts = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let mounter = Arc::new(RecordingMounter::new(share.path()).with_unmount_error("target is busy"));

        let scoped = with_mounted_share(mounter.clone(), &share_config(), &options(mounts.path()), |_| async { 42 })
            .await
            .unwrap();

        assert_eq!(scoped.value, 42);
        let warning = scoped.warning.expect("warning");
        assert!(warning.message.contains("target is busy"));
        // still-mounted directory is left for inspection
        assert!(warning.mount_point.exists());
    }

    #[tokio::test]
    async fn test_dropped_session_is_released() {
        let mounts = tempfile::tempdir().unwrap();
        let share = tempfile::tempdir().unwrap();
        let mounter = Arc::new(RecordingMounter::new(share.path()));

        let mut session = MountSession::new(mounter.clone(), &share_config(), &options(mounts.path()));
        session.mount(&share_config()).await.unwrap();
        assert_eq!(session.state(), MountState::Mounted);
        drop(session);

        for _ in 0..50 {
            if mounter.unmount_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(mounter.unmount_count(), 1);
    }
}
