use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{LazyLock, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

pub const DEFAULT_CLIENTS_FILE: &str = "clients.json";
pub const DEFAULT_OUTPUT_FILE: &str = "version_list.json";
pub const DEFAULT_COMMUNITY_DIR: &str = "community";
pub const DEFAULT_COMMUNITY_OUTPUT_DIR: &str = "community_version_lists";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "clienthash";
pub const DEFAULT_INSTALLER_TOOL: &str = "unzip";
pub const DEFAULT_APPIMAGE_EXTRACT_DIR: &str = "squashfs-root";
pub const DEFAULT_TOKEN_ENV: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Run configuration, read from `clienthash.toml`.
///
/// Every field is optional; [`Config::resolve`] fills in the defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// JSON document listing the default client set.
    /// Default: clients.json
    pub clients_file: Option<String>,

    /// Where the report for the default client set is written.
    /// Default: version_list.json
    pub output_file: Option<String>,

    /// Directory holding one JSON document per community client set.
    /// Default: community
    pub community_dir: Option<String>,

    /// Directory receiving one report per community client set.
    /// Default: community_version_lists
    pub community_output_dir: Option<String>,

    /// Base URL of the releases API.
    /// Default: https://api.github.com
    pub api_url: Option<String>,

    /// Environment variables consulted, in order, for the API bearer token.
    /// Default: ["GH_TOKEN", "GITHUB_TOKEN"]
    pub token_env: Option<Vec<String>>,

    /// User agent sent with every request.
    /// Default: clienthash
    pub user_agent: Option<String>,

    /// Proxy used for every request.
    pub proxy: Option<String>,

    /// Archive tool used to pull a single member out of installer executables.
    /// Default: unzip
    pub installer_tool: Option<String>,

    /// Directory an AppImage extracts itself into.
    /// Default: squashfs-root
    pub appimage_extract_dir: Option<String>,
}

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match env::var("CLIENTHASH_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => PathBuf::from("clienthash.toml"),
    })
});

impl Config {
    pub fn default_config() -> Self {
        Self {
            clients_file: Some(DEFAULT_CLIENTS_FILE.to_string()),
            output_file: Some(DEFAULT_OUTPUT_FILE.to_string()),
            community_dir: Some(DEFAULT_COMMUNITY_DIR.to_string()),
            community_output_dir: Some(DEFAULT_COMMUNITY_OUTPUT_DIR.to_string()),
            api_url: Some(DEFAULT_API_URL.to_string()),
            token_env: Some(DEFAULT_TOKEN_ENV.iter().map(|s| s.to_string()).collect()),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            proxy: None,
            installer_tool: Some(DEFAULT_INSTALLER_TOOL.to_string()),
            appimage_extract_dir: Some(DEFAULT_APPIMAGE_EXTRACT_DIR.to_string()),
        }
    }

    /// Loads the configuration from [`CONFIG_PATH`].
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();
        Self::load(&config_path)
    }

    /// Loads the configuration from `path`, falling back to the defaults when the file
    /// does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("config file {} not found, using defaults", path.display());
                Self::default_config()
            }
            Err(err) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        };

        config.resolve()?;

        Ok(config)
    }

    pub fn resolve(&mut self) -> Result<()> {
        if self.clients_file.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::MissingValue("clients_file"));
        }
        if self.api_url.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::MissingValue("api_url"));
        }

        self.clients_file
            .get_or_insert_with(|| DEFAULT_CLIENTS_FILE.to_string());
        self.output_file
            .get_or_insert_with(|| DEFAULT_OUTPUT_FILE.to_string());
        self.community_dir
            .get_or_insert_with(|| DEFAULT_COMMUNITY_DIR.to_string());
        self.community_output_dir
            .get_or_insert_with(|| DEFAULT_COMMUNITY_OUTPUT_DIR.to_string());
        self.token_env
            .get_or_insert_with(|| DEFAULT_TOKEN_ENV.iter().map(|s| s.to_string()).collect());
        self.user_agent
            .get_or_insert_with(|| DEFAULT_USER_AGENT.to_string());
        self.installer_tool
            .get_or_insert_with(|| DEFAULT_INSTALLER_TOOL.to_string());
        self.appimage_extract_dir
            .get_or_insert_with(|| DEFAULT_APPIMAGE_EXTRACT_DIR.to_string());

        let api_url = self
            .api_url
            .get_or_insert_with(|| DEFAULT_API_URL.to_string());
        let trimmed = api_url.trim_end_matches('/').len();
        api_url.truncate(trimmed);

        Ok(())
    }

    pub fn clients_file(&self) -> PathBuf {
        PathBuf::from(self.clients_file.as_deref().unwrap_or(DEFAULT_CLIENTS_FILE))
    }

    pub fn output_file(&self) -> PathBuf {
        PathBuf::from(self.output_file.as_deref().unwrap_or(DEFAULT_OUTPUT_FILE))
    }

    pub fn community_dir(&self) -> PathBuf {
        PathBuf::from(
            self.community_dir
                .as_deref()
                .unwrap_or(DEFAULT_COMMUNITY_DIR),
        )
    }

    pub fn community_output_dir(&self) -> PathBuf {
        PathBuf::from(
            self.community_output_dir
                .as_deref()
                .unwrap_or(DEFAULT_COMMUNITY_OUTPUT_DIR),
        )
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn installer_tool(&self) -> &str {
        self.installer_tool
            .as_deref()
            .unwrap_or(DEFAULT_INSTALLER_TOOL)
    }

    pub fn appimage_extract_dir(&self) -> &str {
        self.appimage_extract_dir
            .as_deref()
            .unwrap_or(DEFAULT_APPIMAGE_EXTRACT_DIR)
    }

    /// Reads the API bearer token from the first configured environment variable that
    /// holds a non-empty value.
    pub fn token(&self) -> Option<String> {
        let default_vars: Vec<String> = DEFAULT_TOKEN_ENV.iter().map(|s| s.to_string()).collect();
        self.token_env
            .as_ref()
            .unwrap_or(&default_vars)
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.trim().is_empty())
    }
}
