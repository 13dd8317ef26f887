// Library surface shared by the binary, the server and integration tests.
// Bin-only types (App, the ratatui widget) stay in main.rs.
pub mod app_dirs;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod mirror;
pub mod progress_log;
pub mod report;
pub mod runtime;
pub mod scoring;
pub mod server;
pub mod session;
pub mod texts;
pub mod util;

/// Display clock interval while a session is running.
pub const TICK_RATE_MS: u64 = 100;
