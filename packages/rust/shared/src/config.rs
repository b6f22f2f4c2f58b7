//! Application configuration for drivedocs.
//!
//! User config lives at `~/.drivedocs/drivedocs.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DriveDocsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "drivedocs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".drivedocs";

// ---------------------------------------------------------------------------
// Config structs (matching drivedocs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Google Drive settings.
    #[serde(default)]
    pub drive: DriveConfig,

    /// Keyword extraction backend settings.
    #[serde(default)]
    pub keywords: KeywordsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory for per-record JSON files when `--out` is not given.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Folder to process when none is passed on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            folder_id: None,
        }
    }
}

fn default_output_dir() -> String {
    "drivedocs-out".into()
}

/// `[drive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Path to the cached OAuth token file (authorized-user JSON).
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Base URL of the Google APIs host.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_drive_timeout")]
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            api_base: default_api_base(),
            timeout_secs: default_drive_timeout(),
        }
    }
}

fn default_token_path() -> String {
    "~/.drivedocs/token.json".into()
}
fn default_api_base() -> String {
    "https://www.googleapis.com".into()
}
fn default_drive_timeout() -> u64 {
    30
}

/// `[keywords]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Azure OpenAI resource endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Chat model deployment name.
    #[serde(default = "default_deployment")]
    pub deployment: String,

    /// Azure OpenAI REST API version.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Document text longer than this is truncated before prompting.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_keywords_timeout")]
    pub timeout_secs: u64,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            deployment: default_deployment(),
            api_version: default_api_version(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_input_chars: default_max_input_chars(),
            timeout_secs: default_keywords_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://example.openai.azure.com/".into()
}
fn default_deployment() -> String {
    "gpt-4o-mini".into()
}
fn default_api_version() -> String {
    "2024-05-01-preview".into()
}
fn default_api_key_env() -> String {
    "AZURE_OPENAI_API_KEY".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_input_chars() -> usize {
    12_000
}
fn default_keywords_timeout() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.drivedocs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DriveDocsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.drivedocs/drivedocs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DriveDocsError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DriveDocsError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DriveDocsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DriveDocsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DriveDocsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Read the keyword API key from the env var named by `api_key_env`.
pub fn resolve_api_key(config: &KeywordsConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DriveDocsError::config(format!(
            "keyword API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("token_path"));
        assert!(toml_str.contains("AZURE_OPENAI_API_KEY"));
        assert!(!toml_str.contains("folder_id"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.drive.timeout_secs, 30);
        assert_eq!(parsed.keywords.deployment, "gpt-4o-mini");
        assert_eq!(parsed.keywords.max_input_chars, 12_000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
folder_id = "1a_6_folder"

[keywords]
endpoint = "https://hr-tags.openai.azure.com/"
api_key_env = "ADMIN_KEY"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.folder_id.as_deref(), Some("1a_6_folder"));
        assert_eq!(config.defaults.output_dir, "drivedocs-out");
        assert_eq!(config.keywords.api_key_env, "ADMIN_KEY");
        assert_eq!(config.keywords.api_version, "2024-05-01-preview");
        assert_eq!(config.drive.api_base, "https://www.googleapis.com");
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/tmp/token.json"), PathBuf::from("/tmp/token.json"));
        assert_eq!(expand_home("token.json"), PathBuf::from("token.json"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/t.json"), home.join("t.json"));
        }
    }

    #[test]
    fn api_key_validation() {
        let mut config = KeywordsConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.api_key_env = "DD_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
