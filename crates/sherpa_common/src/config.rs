//! Configuration for the Sherpa daemon and CLI.
//!
//! Loaded from `/etc/sherpa/config.toml`, then `/var/lib/sherpa/config.toml`,
//! falling back to built-in defaults. `SHERPA_CONFIG` overrides the search
//! path entirely. Every field has a default so a partial file is fine.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::service::ServiceCategory;

pub const CONFIG_PATH: &str = "/etc/sherpa/config.toml";
pub const STATE_CONFIG_PATH: &str = "/var/lib/sherpa/config.toml";
pub const CONFIG_ENV: &str = "SHERPA_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// When true, remembers stage and profile per `userId` between
    /// requests. Off by default; history replay is authoritative.
    #[serde(default)]
    pub profile_cache: bool,
}

fn default_bind_address() -> String {
    "127.0.0.1:7878".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            profile_cache: false,
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Named credential groups. Values are either the literal key or an
    /// `env:VAR_NAME` indirection resolved at startup.
    #[serde(default)]
    pub groups: BTreeMap<String, String>,
    /// Per-category preference order over group names. Categories with no
    /// entry fall back to scanning every group.
    #[serde(default)]
    pub preferences: BTreeMap<ServiceCategory, Vec<String>>,
}

impl CredentialsConfig {
    /// Groups with indirections resolved. Groups whose env var is unset
    /// or whose value is empty are dropped here, once, with a warning.
    pub fn resolved_groups(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (name, raw) in &self.groups {
            match resolve_key(raw) {
                Some(key) => {
                    out.insert(name.clone(), key);
                }
                None => {
                    warn!("[!]  Credential group '{}' has no usable key, skipping", name);
                }
            }
        }
        out
    }

    pub fn preference_order(&self, category: ServiceCategory) -> &[String] {
        self.preferences
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Resolve one configured key. `env:NAME` reads the environment at call
/// time; anything else is taken literally. Empty results resolve to `None`.
pub fn resolve_key(raw: &str) -> Option<String> {
    let value = match raw.strip_prefix("env:") {
        Some(var) => std::env::var(var).ok()?,
        None => raw.to_string(),
    };
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model identifiers in fallback order, best first.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Extra attempts granted to the last model in the chain.
    #[serde(default = "default_last_retries")]
    pub last_retries: u32,
    /// Base backoff between those attempts; attempt n waits n times this.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_chat_timeout_secs")]
    pub request_timeout_secs: u64,
    /// System persona prepended to every model call.
    #[serde(default = "default_persona")]
    pub persona: String,
}

fn default_models() -> Vec<String> {
    vec![
        "gemini-1.5-pro".to_string(),
        "gemini-1.5-flash".to_string(),
        "gemini-1.5-flash-8b".to_string(),
    ]
}

fn default_last_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_chat_timeout_secs() -> u64 {
    30
}

fn default_persona() -> String {
    "You are Sherpa, a friendly and practical travel planning assistant. \
     You help people pick destinations, shape budgets and build day-by-day \
     itineraries. Be concise, concrete and warm."
        .to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            last_retries: default_last_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_secs: default_chat_timeout_secs(),
            persona: default_persona(),
        }
    }
}

// ============================================================================
// Enrichment
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_enrichment_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Sent to the free providers that require identification.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_enrichment_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!(
        "sherpa/{} (+https://github.com/sherpa-travel/sherpa)",
        env!("CARGO_PKG_VERSION")
    )
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_enrichment_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Error count per category, accumulated since startup, that trips
    /// the error alert.
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u64,
    /// Fallback share of successful calls that trips the ratio alert.
    #[serde(default = "default_fallback_ratio")]
    pub fallback_ratio: f64,
    /// Successful calls required before the ratio alert can fire.
    #[serde(default = "default_min_sample")]
    pub min_sample: u64,
}

fn default_error_threshold() -> u64 {
    5
}

fn default_fallback_ratio() -> f64 {
    0.9
}

fn default_min_sample() -> u64 {
    10
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            error_threshold: default_error_threshold(),
            fallback_ratio: default_fallback_ratio(),
            min_sample: default_min_sample(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load from the standard locations, or defaults when nothing parses.
    /// The daemon must come up even with no config present at all.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return match Self::load_from_path(Path::new(&path)) {
                Ok(config) => {
                    info!("[*]  Loaded config from {} ({})", path, CONFIG_ENV);
                    config
                }
                Err(e) => {
                    warn!("[!]  Failed to load {} from {}: {}", CONFIG_ENV, path, e);
                    Self::default()
                }
            };
        }

        for path in [CONFIG_PATH, STATE_CONFIG_PATH] {
            if Path::new(path).exists() {
                match Self::load_from_path(Path::new(path)) {
                    Ok(config) => {
                        info!("[*]  Loaded config from {}", path);
                        return config;
                    }
                    Err(e) => warn!("[!]  Failed to parse {}: {}", path, e),
                }
            }
        }

        info!("[*]  No config file found, using defaults");
        Self::default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_complete() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "127.0.0.1:7878");
        assert!(!config.server.profile_cache);
        assert_eq!(config.chat.models.len(), 3);
        assert_eq!(config.chat.models[0], "gemini-1.5-pro");
        assert_eq!(config.alerts.error_threshold, 5);
        assert_eq!(config.alerts.min_sample, 10);
        assert!(config.credentials.groups.is_empty());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind_address = "0.0.0.0:9000"

            [alerts]
            error_threshold = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.alerts.error_threshold, 3);
        assert_eq!(config.alerts.min_sample, 10);
        assert_eq!(config.chat.last_retries, 2);
    }

    #[test]
    fn preferences_parse_kebab_case_categories() {
        let config: Config = toml::from_str(
            r#"
            [credentials.groups]
            primary = "literal-key-1"
            secondary = "literal-key-2"

            [credentials.preferences]
            "model-generation" = ["primary", "secondary"]
            mapping = ["secondary"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config
                .credentials
                .preference_order(ServiceCategory::ModelGeneration),
            &["primary".to_string(), "secondary".to_string()]
        );
        assert_eq!(
            config.credentials.preference_order(ServiceCategory::Mapping),
            &["secondary".to_string()]
        );
        assert!(config
            .credentials
            .preference_order(ServiceCategory::Translation)
            .is_empty());
    }

    #[test]
    fn env_indirection_resolves_at_call_time() {
        std::env::set_var("SHERPA_TEST_KEY_A", "resolved-value");
        assert_eq!(
            resolve_key("env:SHERPA_TEST_KEY_A").as_deref(),
            Some("resolved-value")
        );
        assert_eq!(resolve_key("env:SHERPA_TEST_KEY_MISSING"), None);
        assert_eq!(resolve_key("plain-key").as_deref(), Some("plain-key"));
        assert_eq!(resolve_key(""), None);
        assert_eq!(resolve_key("   "), None);
    }

    #[test]
    fn unresolvable_groups_are_dropped() {
        let mut credentials = CredentialsConfig::default();
        credentials
            .groups
            .insert("good".to_string(), "key-123".to_string());
        credentials
            .groups
            .insert("bad".to_string(), "env:SHERPA_TEST_KEY_UNSET".to_string());

        let resolved = credentials.resolved_groups();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.get("good").map(String::as_str), Some("key-123"));
    }

    #[test]
    fn load_from_path_reads_a_real_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_address = \"127.0.0.1:9999\"").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9999");
    }
}
