use anyhow::Result;
use resumable_axum::DEFAULT_BODY_LIMIT;
use resumable_core::{LocalFsStore, ResumableConfig, ResumableEngine, ENV_PREFIX};

fn env(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ResumableConfig::from_env();
    let store = match env("STORAGE_ROOT") {
        Some(root) => LocalFsStore::new(root),
        None => LocalFsStore::current_dir()?,
    };

    tracing::info!(
        root = %store.root().display(),
        temp_folder = %config.temp_folder,
        upload_folder = %config.upload_folder,
        "Configured local storage"
    );

    let engine = ResumableEngine::new(store, config);

    let host = env("HTTP__HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let port = env("HTTP__PORT").unwrap_or_else(|| "3030".to_string());
    let path = env("HTTP__PATH").unwrap_or_else(|| "/upload".to_string());
    let addr = format!("{host}:{port}");

    // 0 lifts the limit
    let body_limit = match env("HTTP__BODY_LIMIT") {
        Some(raw) => Some(raw.trim().parse::<usize>()?).filter(|limit| *limit > 0),
        None => Some(DEFAULT_BODY_LIMIT),
    };

    println!("[resumable] listening on http://{addr}{path}");

    resumable_axum::axum(engine)
        .with_body_limit(body_limit)
        .use_uploads(&path)
        .listen(addr)
        .await?;

    Ok(())
}
