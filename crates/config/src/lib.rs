//! Configuration loading, validation, and env substitution.
//!
//! Config files: `quotabot.toml`, `quotabot.yaml`, or `quotabot.json`
//! Searched in `./` then `~/.config/quotabot/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all
//! string values. Well-known environment variables (`MICROSOFT_APP_ID`,
//! `PURESPECTRUM_TOKEN`, ...) override file values after loading.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{clear_config_dir, config_dir, discover_and_load, load_config, set_config_dir},
    schema::{EventsConfig, PureSpectrumConfig, QuotabotConfig, ServerConfig, TeamsConfig},
};
