//! Configuration types and path resolution for notifly.
//!
//! Settings are TOML at the platform's XDG config path
//! (e.g. `~/.config/notifly/config.toml` on Linux), optionally overlaid by a
//! project `notifly.toml`. The task store defaults to the XDG data directory
//! (`~/.local/share/notifly/`).

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;

impl Config {
    /// Load config with precedence: environment > project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        config.apply_env_overrides(|var| std::env::var(var).ok());
        Ok(config)
    }

    /// Effective configuration as TOML, for `notifly config show`.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
