//! Plugin options: the persisted key-value settings blob merged over defaults.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Allowed upload extensions
pub const OPTION_FILE_TYPES: &str = "file-types";
/// Maximum size per file, in megabytes
pub const OPTION_MAX_SIZE: &str = "max-size";
/// Whether the upload form stylesheet is served
pub const OPTION_LOAD_CSS: &str = "load-css";

/// Which option row holds the settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionScope {
    /// Settings for a single site
    #[default]
    Site,
    /// Settings shared by every site of a network installation
    Network,
}

impl OptionScope {
    pub fn from_network_wide(network_wide: bool) -> Self {
        if network_wide {
            Self::Network
        } else {
            Self::Site
        }
    }

    /// Name of the option row in the options store
    pub fn option_name(self) -> &'static str {
        match self {
            Self::Site => "msgat_plugin_options",
            Self::Network => "msgat_site_plugin_options",
        }
    }
}

const DEFAULT_FILE_TYPES: &[&str] = &["png", "jpg", "jpeg", "pdf", "zip", "rar"];
const DEFAULT_MAX_SIZE_MB: u64 = 5;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Settings held in memory for the lifetime of the process.
///
/// Saved keys always win over defaults and keys this crate does not know
/// about are kept untouched, so a blob written by a newer admin screen
/// survives a round trip.
///
/// ```
/// use msgat_attachments::PluginOptions;
/// use serde_json::json;
///
/// let options = PluginOptions::merge(Some(&json!({ "max-size": 10 })));
/// assert_eq!(options.max_size_mb(), 10);
/// assert!(options.load_css());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginOptions {
    values: Map<String, Value>,
}

impl Default for PluginOptions {
    fn default() -> Self {
        let mut values = Map::new();
        values.insert(OPTION_FILE_TYPES.to_string(), json!(DEFAULT_FILE_TYPES));
        values.insert(OPTION_MAX_SIZE.to_string(), json!(DEFAULT_MAX_SIZE_MB));
        values.insert(OPTION_LOAD_CSS.to_string(), json!(true));
        Self { values }
    }
}

impl PluginOptions {
    /// Merge a saved blob over the compiled-in defaults.
    ///
    /// Anything that is not a JSON object counts as "nothing saved".
    pub fn merge(saved: Option<&Value>) -> Self {
        Self::default().merged_with(saved)
    }

    /// Overlay `saved` on top of these options
    pub fn merged_with(&self, saved: Option<&Value>) -> Self {
        let mut values = self.values.clone();
        if let Some(Value::Object(saved)) = saved {
            for (key, value) in saved {
                values.insert(key.clone(), value.clone());
            }
        }
        Self { values }
    }

    /// Raw value for `key`, looked up case-insensitively
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.values.get(&key.to_lowercase())
    }

    /// The options as a JSON object, suitable for persisting
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Allowed upload extensions, lowercased.
    ///
    /// Accepts a JSON array or a comma-separated string; anything else allows nothing.
    pub fn file_types(&self) -> Vec<String> {
        match self.option(OPTION_FILE_TYPES) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(normalise_extension)
                .filter(|ext| !ext.is_empty())
                .collect(),
            Some(Value::String(list)) => list
                .split(',')
                .map(normalise_extension)
                .filter(|ext| !ext.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Maximum size per file in megabytes. Unreadable values fall back to the default.
    pub fn max_size_mb(&self) -> u64 {
        match self.option(OPTION_MAX_SIZE) {
            Some(Value::Number(number)) => number
                .as_u64()
                .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
                .unwrap_or(DEFAULT_MAX_SIZE_MB),
            Some(Value::String(text)) => text.trim().parse().unwrap_or(DEFAULT_MAX_SIZE_MB),
            _ => DEFAULT_MAX_SIZE_MB,
        }
    }

    /// Maximum size per file in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb().saturating_mul(BYTES_PER_MB)
    }

    /// Whether the upload form stylesheet should be loaded
    pub fn load_css(&self) -> bool {
        match self.option(OPTION_LOAD_CSS) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(text)) => {
                matches!(text.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
            }
            _ => false,
        }
    }
}

fn normalise_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}
