use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000/save-result";
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_MIRROR_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Client progress log; `None` uses the state directory.
    pub log_file: Option<PathBuf>,
    /// Log written by `serve`; `None` uses its own file in the state directory.
    pub server_log_file: Option<PathBuf>,
    /// Ingestion endpoint the client mirrors results to.
    pub server_url: String,
    /// Address the ingestion server listens on.
    pub bind: String,
    pub mirror: bool,
    pub mirror_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: None,
            server_log_file: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            mirror: true,
            mirror_timeout_secs: DEFAULT_MIRROR_TIMEOUT_SECS,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_file: Option<PathBuf>,
    pub server_log_file: Option<PathBuf>,
    pub server_url: Option<String>,
    pub bind: Option<String>,
    pub no_mirror: bool,
}

impl Config {
    pub fn apply_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(ref log_file) = overrides.log_file {
            self.log_file = Some(log_file.clone());
        }
        if let Some(ref log_file) = overrides.server_log_file {
            self.server_log_file = Some(log_file.clone());
        }
        if let Some(ref url) = overrides.server_url {
            self.server_url = url.clone();
        }
        if let Some(ref bind) = overrides.bind {
            self.bind = bind.clone();
        }
        if overrides.no_mirror {
            self.mirror = false;
        }
        self
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(AppDirs::progress_log_path)
    }

    /// Never the client's default log, so a mirrored result is not counted twice.
    pub fn server_log_path(&self) -> PathBuf {
        self.server_log_file
            .clone()
            .unwrap_or_else(AppDirs::server_log_path)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|e| {
                warn!("ignoring unreadable config {}: {}", self.path.display(), e);
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn full_file_is_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            br#"{
                "log_file": "/data/client.csv",
                "server_log_file": "/data/server.csv",
                "server_url": "http://dash.local/save-result",
                "bind": "0.0.0.0:9000",
                "mirror": false,
                "mirror_timeout_secs": 2
            }"#,
        )
        .unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.log_path(), PathBuf::from("/data/client.csv"));
        assert_eq!(cfg.server_log_path(), PathBuf::from("/data/server.csv"));
        assert_eq!(cfg.server_url, "http://dash.local/save-result");
        assert_eq!(cfg.bind, "0.0.0.0:9000");
        assert!(!cfg.mirror);
        assert_eq!(cfg.mirror_timeout_secs, 2);
    }

    #[test]
    fn client_and_server_default_logs_differ() {
        let cfg = Config::default();
        assert_ne!(cfg.log_path(), cfg.server_log_path());
    }

    #[test]
    fn missing_or_broken_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "bind": "0.0.0.0:8080" }"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.bind, "0.0.0.0:8080");
        assert_eq!(cfg.server_url, DEFAULT_SERVER_URL);
        assert!(cfg.mirror);
    }

    #[test]
    fn overrides_take_precedence() {
        let cfg = Config::default().apply_overrides(&Overrides {
            log_file: Some(PathBuf::from("/tmp/x.csv")),
            server_log_file: Some(PathBuf::from("/tmp/server.csv")),
            server_url: Some("http://example.test/save-result".into()),
            bind: None,
            no_mirror: true,
        });
        assert_eq!(cfg.log_path(), PathBuf::from("/tmp/x.csv"));
        assert_eq!(cfg.server_log_path(), PathBuf::from("/tmp/server.csv"));
        assert_eq!(cfg.server_url, "http://example.test/save-result");
        assert_eq!(cfg.bind, DEFAULT_BIND);
        assert!(!cfg.mirror);
    }
}
