use std::sync::Arc;

use anyhow::{Context, Result};
use msgat_attachments::{AccessGateway, FileTypeClassifier, FilterRegistry, OptionScope, PluginOptions};
use msgat_config::AppConfig;
use msgat_database::{
    initialize_database, AttachmentRepository, MessageRepository, OptionsRepository,
    SessionRepository, ThreadRepository,
};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Every long-lived service, built once per process
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub threads: Arc<ThreadRepository>,
    pub messages: Arc<MessageRepository>,
    pub attachments: Arc<AttachmentRepository>,
    pub sessions: Arc<SessionRepository>,
    pub options_store: Arc<OptionsRepository>,
    pub option_scope: OptionScope,
    /// Options as loaded at startup; never re-read while running
    pub plugin_options: PluginOptions,
    pub classifier: Arc<FileTypeClassifier>,
    pub access: AccessGateway,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        Self::initialise_with_hooks(config, Arc::new(FilterRegistry::new())).await
    }

    /// Like [`BackendServices::initialise`], with file-type filters registered by the caller
    pub async fn initialise_with_hooks(
        config: &AppConfig,
        hooks: Arc<FilterRegistry>,
    ) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let upload_dir = &config.storage.upload_dir;
        tokio::fs::create_dir_all(upload_dir)
            .await
            .with_context(|| format!("failed to create upload directory {}", upload_dir.display()))?;

        let threads = Arc::new(ThreadRepository::new(db_pool.clone()));
        let messages = Arc::new(MessageRepository::new(db_pool.clone()));
        let attachments = Arc::new(AttachmentRepository::new(db_pool.clone(), upload_dir));
        let ttl = i64::try_from(config.auth.session_ttl_seconds).unwrap_or(i64::MAX);
        let sessions = Arc::new(SessionRepository::new(db_pool.clone(), ttl));
        let options_store = Arc::new(OptionsRepository::new(db_pool.clone()));

        let option_scope = OptionScope::from_network_wide(config.options.network_wide);
        let plugin_options = options_store
            .load_plugin_options(option_scope)
            .await
            .context("failed to load plugin options")?;
        info!(
            scope = ?option_scope,
            file_types = ?plugin_options.file_types(),
            max_size_mb = plugin_options.max_size_mb(),
            "plugin options loaded"
        );

        let classifier = Arc::new(FileTypeClassifier::new(hooks));
        let access = AccessGateway::new(threads.clone(), messages.clone(), attachments.clone());

        Ok(Self {
            db_pool,
            threads,
            messages,
            attachments,
            sessions,
            options_store,
            option_scope,
            plugin_options,
            classifier,
            access,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
