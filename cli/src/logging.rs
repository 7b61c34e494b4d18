//! Tracing / logging initialisation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: component_name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Parse `--log-level`: either a bare level or a full directive list such
    /// as `info,chainescrow-evm=debug`.
    pub fn from_flag(flag: &str, json: bool) -> Self {
        let mut config = Self {
            json,
            ..Self::default()
        };
        for part in flag.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((component, level)) => {
                    config.components.insert(component.to_string(), level.to_string());
                }
                None => config.level = part.to_string(),
            }
        }
        config
    }

    /// `EnvFilter` directive string, e.g. `"info,chainescrow_evm=debug"`.
    pub fn directives(&self) -> String {
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();
        let mut directives = self.level.clone();
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Initialise tracing with the given log config.
/// Should be called once at application startup.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level() {
        let c = LogConfig::from_flag("debug", false);
        assert_eq!(c.directives(), "debug");
    }

    #[test]
    fn component_overrides_are_normalised() {
        let c = LogConfig::from_flag("warn, chainescrow-evm=trace,tower_http=debug", true);
        assert_eq!(c.level, "warn");
        assert!(c.json);
        assert_eq!(c.directives(), "warn,chainescrow_evm=trace,tower_http=debug");
    }
}
