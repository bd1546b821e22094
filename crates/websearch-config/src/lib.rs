//! Configuration system for the web search plugin.
//!
//! Provides TOML-based configuration with:
//! - Per-provider options (`[provider.google.options]`, `[provider.openai.options]`)
//! - OAuth client flavors in preference order (`[oauth]`, `[oauth.flavor.<name>]`)
//! - Overridable upstream endpoints (`[endpoints]`)
//! - Config file layering (XDG user config + project-local overrides)
//!
//! Credentials are consumed from the host auth store ([`auth_store`]) and
//! turned into usable [`Credentials`] by the [`resolver`], with
//! environment-variable fallback for API keys.

pub mod auth_store;
pub mod discovery;
pub mod error;
pub mod resolver;
pub mod types;

pub use auth_store::{AuthSource, AuthStore, StaticAuth, auth_store_path};
pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use resolver::{
    Credentials, EnvSource, OAuthCredentials, ProcessEnv, SecretSource, resolve_credentials,
};
pub use types::*;
