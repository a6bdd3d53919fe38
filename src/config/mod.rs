pub mod loader;
pub mod schema;

pub use loader::{discover, load_from_path, load_from_str, ConfigError, DEFAULT_SETTINGS_FILE};
pub use schema::{Settings, ValidationError, ValidationIssue};
