use std::{fs, fs::File, path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use msgat_attachments::{
    DownloadDenied, DownloadRoute, FileTypeGroup, FilterRegistry, OptionScope, OptionsStore,
    FILE_TYPES_HOOK,
};
use msgat_config::AppConfig;
use msgat_database::{CreateAttachmentRequest, CreateMessageRequest};
use msgat_runtime::{self, BackendServices};
use serde_json::json;
use sqlx::Row;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(temp_dir: &TempDir, database_url: String, max_connections: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = max_connections;
    config.storage.upload_dir = temp_dir.path().join("uploads");
    config
}

async fn initialise(config: &AppConfig) -> Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_runs_migrations_and_creates_upload_dir() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(&temp_dir, sqlite_url(&db_path), 4);

    let services = initialise(&config).await?;
    let table: String = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'attachments'",
    )
    .fetch_one(&services.db_pool)
    .await?;

    assert_eq!("attachments", table);
    assert!(config.storage.upload_dir.is_dir());
    assert_eq!(services.option_scope, OptionScope::Site);
    assert_eq!(services.plugin_options.max_size_mb(), 5);

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_reads_options_for_configured_scope() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/options.db");
    let mut config = build_config(&temp_dir, sqlite_url(&db_path), 2);

    let services = initialise(&config).await?;
    services
        .options_store
        .save_option(OptionScope::Site.option_name(), &json!({ "max-size": 1 }))
        .await?;
    services
        .options_store
        .save_option(OptionScope::Network.option_name(), &json!({ "max-size": 50 }))
        .await?;

    // Saved options are only picked up by the next start.
    assert_eq!(services.plugin_options.max_size_mb(), 5);
    drop(services);

    let site = initialise(&config).await?;
    assert_eq!(site.plugin_options.max_size_mb(), 1);
    drop(site);

    config.options.network_wide = true;
    let network = initialise(&config).await?;
    assert_eq!(network.option_scope, OptionScope::Network);
    assert_eq!(network.plugin_options.max_size_mb(), 50);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_wires_access_gateway_and_hooks() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/access.db");
    let config = build_config(&temp_dir, sqlite_url(&db_path), 2);

    let hooks = Arc::new(FilterRegistry::new());
    hooks.add_filter(FILE_TYPES_HOOK, |mut groups: Vec<FileTypeGroup>| {
        groups.push(FileTypeGroup::new("vector", "Vector", &["svg"]));
        groups
    });
    let services = BackendServices::initialise_with_hooks(&config, hooks).await?;
    assert_eq!(services.classifier.classify("SVG"), "vector");

    fs::write(config.storage.upload_dir.join("diagram.svg"), b"<svg/>")?;
    let thread_id = services.threads.create(&[1, 2]).await?;
    let message = services
        .messages
        .create(&CreateMessageRequest {
            thread_id,
            sender_id: 1,
            ..Default::default()
        })
        .await?;
    let attachment = services
        .attachments
        .create(&CreateAttachmentRequest::upload("image/svg+xml", "diagram.svg"))
        .await?;
    services
        .attachments
        .link_to_message(attachment.id, message.id)
        .await?;

    let route = DownloadRoute::new(thread_id, attachment.id);
    let opened = services.access.open(route, 2).await;
    assert!(matches!(opened, Ok(ref file) if file.length == 6));
    assert!(matches!(
        services.access.open(route, 3).await,
        Err(DownloadDenied::Unauthorized)
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_enables_sqlite_foreign_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/foreign_keys.db");
    let config = build_config(&temp_dir, sqlite_url(&db_path), 2);

    let services = initialise(&config).await?;

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&services.db_pool)
        .await?;
    assert_eq!(1, enabled, "foreign key enforcement must be enabled");

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_applies_max_connections_setting() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/max_conn.db");
    let max_connections = 3;
    let config = build_config(&temp_dir, sqlite_url(&db_path), max_connections);

    let services = initialise(&config).await?;
    assert_eq!(
        max_connections,
        services.db_pool.options().get_max_connections()
    );

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ensure_sqlite_path_noops_for_memory_database() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(&temp_dir, "sqlite://:memory:".into(), 1);
    let services = initialise(&config).await?;

    let databases = sqlx::query("PRAGMA database_list")
        .fetch_all(&services.db_pool)
        .await?;
    let main_db = databases
        .into_iter()
        .find(|row| {
            row.try_get::<String, _>("name")
                .map(|name| name == "main")
                .unwrap_or(false)
        })
        .context("expected main in PRAGMA database_list")?;
    let file: String = main_db.try_get("file")?;
    assert!(
        file.is_empty(),
        "in-memory sqlite database should not create filesystem entries"
    );

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_propagates_database_failures() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let blocker = temp_dir.path().join("not-a-directory");
    File::create(&blocker)?;

    let config = build_config(&temp_dir, sqlite_url(&blocker.join("msgat.db")), 1);
    let error = match BackendServices::initialise(&config).await {
        Ok(_) => panic!("expected initialisation to fail below a regular file"),
        Err(error) => error,
    };
    assert!(
        format!("{error:#}").contains("failed to initialise database"),
        "database errors should propagate with context"
    );

    Ok(())
}

#[test]
fn telemetry_init_tracing_sets_global_subscriber() {
    msgat_runtime::telemetry::init_tracing().expect("first initialisation should succeed");

    let second = msgat_runtime::telemetry::init_tracing();
    assert!(
        second.is_err(),
        "initialising telemetry twice should fail with global subscriber already set"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[cfg_attr(not(unix), ignore = "requires Unix signal handling")]
async fn shutdown_signal_completes_on_ctrl_c_notification() -> Result<()> {
    let shutdown_task = tokio::spawn(async { msgat_runtime::shutdown_signal().await });

    sleep(Duration::from_millis(50)).await;
    #[cfg(unix)]
    unsafe {
        libc::raise(libc::SIGINT);
    }

    timeout(Duration::from_secs(2), shutdown_task).await??;
    Ok(())
}
