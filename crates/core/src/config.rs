use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub codenotify: CodenotifyConfig,
    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Public base URL, used to build links to run logs.
    pub external_url: Url,
    pub logs_root_dir: PathBuf,
    /// Parent directory for ephemeral checkouts. Defaults to the system temp dir.
    #[serde(default)]
    pub workspace_root_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub app: GitHubAppConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubAppConfig {
    pub id: u64,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub private_key: String,
    /// When set, webhook deliveries must carry a valid `X-Hub-Signature-256`.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodenotifyConfig {
    pub bin_path: PathBuf,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_subscriber_threshold")]
    pub subscriber_threshold: u32,
}

fn default_filename() -> String { "CODENOTIFY".to_string() }

fn default_subscriber_threshold() -> u32 { 10 }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitConfig {
    #[serde(default = "default_git_bin_path")]
    pub bin_path: PathBuf,
}

impl Default for GitConfig {
    fn default() -> Self { Self { bin_path: default_git_bin_path() } }
}

fn default_git_bin_path() -> PathBuf { PathBuf::from("git") }
