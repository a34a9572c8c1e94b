pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, load_settings, ConfigError, CONFIG_ENV};
pub use schema::{
    FailurePolicy, PatcherSettings, PolicySettings, Settings, ValidationError, ValidationIssue,
};
