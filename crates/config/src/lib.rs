//! Configuration: schema, multi-format loader with `${ENV_VAR}`
//! substitution, and startup validation.

mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::ConfigurationError,
    loader::{discover_and_load, find_config_file, load_config},
    schema::{CategoryConfig, OpsdeskConfig, RepliesConfig, TelegramConfig},
};
