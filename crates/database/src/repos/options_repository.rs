//! Persistent key-value option storage.

use async_trait::async_trait;
use msgat_attachments::{OptionScope, OptionsStore, PluginOptions, StoreResult};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::types::{DatabaseError, DatabaseResult};

#[derive(Clone)]
pub struct OptionsRepository {
    pool: SqlitePool,
}

impl OptionsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, name: &str) -> DatabaseResult<Option<Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM options WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        raw.map(|raw| serde_json::from_str(&raw).map_err(Into::into))
            .transpose()
    }

    pub async fn set(&self, name: &str, value: &Value) -> DatabaseResult<()> {
        let encoded = serde_json::to_string(value)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO options (name, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(name)
        .bind(&encoded)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(name, "option saved");
        Ok(())
    }

    /// Load the plugin options for `scope`, merged over the defaults.
    ///
    /// A row that cannot be decoded counts as nothing saved.
    pub async fn load_plugin_options(&self, scope: OptionScope) -> DatabaseResult<PluginOptions> {
        let name = scope.option_name();
        let saved = match self.get(name).await {
            Ok(saved) => saved,
            Err(DatabaseError::SerializationError(error)) => {
                warn!(name, %error, "ignoring undecodable plugin options");
                None
            }
            Err(other) => return Err(other),
        };
        Ok(PluginOptions::merge(saved.as_ref()))
    }

    pub async fn save_plugin_options(
        &self,
        scope: OptionScope,
        options: &PluginOptions,
    ) -> DatabaseResult<()> {
        self.set(scope.option_name(), &options.to_value()).await
    }
}

#[async_trait]
impl OptionsStore for OptionsRepository {
    async fn load_option(&self, name: &str) -> StoreResult<Option<Value>> {
        Ok(self.get(name).await?)
    }

    async fn save_option(&self, name: &str, value: &Value) -> StoreResult<()> {
        Ok(self.set(name, value).await?)
    }
}
