//! Shared state threaded through a generation run.

use std::sync::Arc;

use clienthash_config::config::Config;
use clienthash_events::{EventSinkHandle, HashEvent, LogLevel};
use clienthash_extract::ExtractOptions;

/// Resolved configuration, credential and event sink for one run.
///
/// Cheap to clone; clones share the same sink.
#[derive(Clone)]
pub struct HashContext {
    config: Arc<Config>,
    events: EventSinkHandle,
    token: Option<String>,
}

impl HashContext {
    /// Builds a context, reading the bearer credential from the configured environment
    /// variables.
    pub fn new(config: Config, events: EventSinkHandle) -> Self {
        let token = config.token();
        Self {
            config: Arc::new(config),
            events,
            token,
        }
    }

    /// Replaces the credential picked up from the environment.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.events
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            installer_tool: self.config.installer_tool().to_string(),
            appimage_extract_dir: self.config.appimage_extract_dir().to_string(),
        }
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.events.emit(HashEvent::Log {
            level,
            message: message.into(),
        });
    }
}
