use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_NAME: &str = "typometer";
pub const PROGRESS_FILE: &str = "typing_progress.csv";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/typometer`, falling back to the platform data dir.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    /// Default progress log shared by the client and the server.
    pub fn progress_log_path() -> PathBuf {
        Self::state_dir()
            .map(|d| d.join(PROGRESS_FILE))
            .unwrap_or_else(|| PathBuf::from(PROGRESS_FILE))
    }

    /// Default log of the ingestion server, kept apart from the client's log.
    pub fn server_log_path() -> PathBuf {
        Self::state_dir()
            .map(|d| d.join("server").join(PROGRESS_FILE))
            .unwrap_or_else(|| PathBuf::from("server").join(PROGRESS_FILE))
    }

    /// Where the TUI writes its diagnostics.
    pub fn client_log_path() -> PathBuf {
        Self::state_dir()
            .map(|d| d.join("client.log"))
            .unwrap_or_else(|| PathBuf::from("typometer-client.log"))
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("typometer_config.json"))
    }
}
