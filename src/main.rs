use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smb_photo_relay::{api, config, config::SmbBackend, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smb_photo_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config()
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);

    // Create mount root if not exists / 创建挂载点父目录
    let (root, label) = match app_config.smb.backend {
        SmbBackend::Cifs => (&app_config.smb.mount_root, "mount root"),
        SmbBackend::Local => (&app_config.smb.local_root, "local share root"),
    };
    std::fs::create_dir_all(root).with_context(|| format!("Failed to create {} {:?}", label, root))?;
    tracing::info!(
        "SMB backend: {:?}, {}: {:?}, timeout: {}s",
        app_config.smb.backend,
        label,
        root,
        app_config.smb.timeout_secs
    );

    let state = Arc::new(AppState::from_config(&app_config));
    let app = api::router(state, &app_config.cors);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
