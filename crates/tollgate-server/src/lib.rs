pub mod app;
pub mod config;
pub mod observability;

pub use app::{AppState, build_app, build_state, router, start_cleanup_task};
pub use config::AppConfig;
