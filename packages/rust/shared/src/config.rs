//! Application configuration for Scriptwright.
//!
//! User config lives at `~/.scriptwright/scriptwright.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file; the config names the
//! environment variables that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScriptwrightError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "scriptwright.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".scriptwright";

// ---------------------------------------------------------------------------
// Config structs (matching scriptwright.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini generation settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Stack Overflow evidence-search settings. Absent = source inactive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stackoverflow: Option<StackOverflowConfig>,

    /// Other-site evidence sources. Absent = source inactive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_sources: Option<OtherSourcesConfig>,

    /// HTML-to-PDF rendering service.
    #[serde(default)]
    pub renderer: RendererConfig,
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model to use for generation.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    "models/gemini-1.5-flash-latest".into()
}

/// `[stackoverflow]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackOverflowConfig {
    /// Free-text search query.
    pub search_query: String,

    /// Tags the question must carry.
    #[serde(default)]
    pub search_tags: Vec<String>,

    /// How many top-ranked questions go into the evidence document.
    #[serde(default = "default_number_of_questions")]
    pub number_of_questions: usize,

    /// Return the raw search results without generating a script.
    #[serde(default)]
    pub only_search_questions: bool,

    /// Persist the evidence document to storage.
    #[serde(default)]
    pub export_pdf: bool,

    /// Env var holding the Stack Exchange access token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Env var holding the Stack Exchange app key.
    #[serde(default = "default_se_key_env")]
    pub key_env: String,
}

fn default_number_of_questions() -> usize {
    10
}
fn default_access_token_env() -> String {
    "STACKEXCHANGE_ACCESS_TOKEN".into()
}
fn default_se_key_env() -> String {
    "STACKEXCHANGE_KEY".into()
}

/// `[other_sources]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtherSourcesConfig {
    /// Page URLs converted to evidence documents, in order.
    #[serde(default)]
    pub urls: Vec<String>,
}

/// `[renderer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// HTTP endpoint of the HTML-to-PDF rendering service.
    #[serde(default = "default_renderer_endpoint")]
    pub endpoint: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            endpoint: default_renderer_endpoint(),
        }
    }
}

fn default_renderer_endpoint() -> String {
    "http://localhost:3000/convert/html".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.scriptwright/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScriptwrightError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.scriptwright/scriptwright.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ScriptwrightError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ScriptwrightError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScriptwrightError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScriptwrightError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScriptwrightError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a named env var, failing with a config error when unset or empty.
pub fn env_credential(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ScriptwrightError::config(format!(
            "credential not found. Set the {var_name} environment variable."
        ))),
    }
}
