//! Configuration options.

use configory::{EventHandler, Manager as ConfigManager, Options as ConfigOptions};
use serde::Deserialize;
use tracing::error;

use crate::Error;

/// # on-shutdown
///
/// The configuration file uses the TOML format and is looked up at
/// `${XDG_CONFIG_HOME:-$HOME/.config}/on-shutdown/on-shutdown.toml`. It is
/// optional, all fields fall back to their defaults.
#[derive(Deserialize, Default, PartialEq, Eq, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// This section documents the `[inhibitor]` table.
    pub inhibitor: Inhibitor,
}

impl Config {
    /// Read the configuration file once.
    pub fn load() -> Result<Self, Error> {
        let options = ConfigOptions::new("on-shutdown");
        let manager = ConfigManager::with_options(&options, ConfigEventHandler)?;

        // Parse config or fall back to the default.
        let config = manager
            .get::<&str, Config>(&[])
            .inspect_err(|err| error!("Config error: {err}"))
            .ok()
            .flatten()
            .unwrap_or_default();

        Ok(config)
    }
}

/// Inhibitor lock configuration.
#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Inhibitor {
    /// Requester identity shown by `systemd-inhibit --list`.
    pub who: String,
    /// Prefix of the inhibitor reason, followed by the command line.
    pub why_prefix: String,
}

impl Default for Inhibitor {
    fn default() -> Self {
        Self { who: String::from("on-shutdown"), why_prefix: String::from("Run on shutdown: ") }
    }
}

/// Event handler for configuration manager errors.
///
/// The file is only read once at startup, so syntax errors are the only
/// events that can reach it.
pub struct ConfigEventHandler;

impl EventHandler<()> for ConfigEventHandler {
    fn file_error(&self, _config: &configory::Config, err: configory::Error) {
        error!("Configuration file error: {err}");
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use super::*;

    #[test]
    fn load_from_config_home() {
        let home = env::temp_dir().join(format!("on-shutdown-config-{}", process::id()));
        let dir = home.join("on-shutdown");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("on-shutdown.toml");

        // Only this test touches the config location.
        unsafe { env::set_var("XDG_CONFIG_HOME", &home) };

        fs::write(&path, "[inhibitor]\nwho = \"backup\"\n").unwrap();
        let config = Config::load().unwrap();
        assert_eq!(config.inhibitor.who, "backup");

        // Syntax errors fall back to the defaults.
        fs::write(&path, "[inhibitor\nwho = ").unwrap();
        let config = Config::load().unwrap();
        assert_eq!(config, Config::default());

        fs::remove_dir_all(&home).unwrap();
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.inhibitor.who, "on-shutdown");
        assert_eq!(config.inhibitor.why_prefix, "Run on shutdown: ");
    }

    #[test]
    fn partial_table() {
        let config: Config = toml::from_str("[inhibitor]\nwho = \"backup\"\n").unwrap();
        assert_eq!(config.inhibitor.who, "backup");
        assert_eq!(config.inhibitor.why_prefix, "Run on shutdown: ");
    }

    #[test]
    fn unknown_field() {
        let config = toml::from_str::<Config>("[inhibitor]\nmode = \"block\"\n");
        assert!(config.is_err());
    }
}
