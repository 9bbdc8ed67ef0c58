//! Generator configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default name of the assembly generated proxy types live in
pub const DEFAULT_GENERATION_ASSEMBLY: &str = "DynamicProxyGenAssembly";

/// Configuration for [`ProxyGenerator`](crate::ProxyGenerator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Assembly generated code belongs to; internal types are only
    /// accessible if their assembly grants visibility to it
    pub generation_assembly: String,
    /// Namespace generated proxy types are placed in
    pub proxy_namespace: String,
    /// Emit a trace event for every interceptor step
    pub log_interceptor_steps: bool,
}

impl GeneratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With generation assembly name
    #[inline]
    #[must_use]
    pub fn with_generation_assembly(mut self, name: impl Into<String>) -> Self {
        self.generation_assembly = name.into();
        self
    }

    /// With proxy namespace
    #[inline]
    #[must_use]
    pub fn with_proxy_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.proxy_namespace = namespace.into();
        self
    }

    /// With interceptor step logging
    #[inline]
    #[must_use]
    pub fn with_interceptor_step_logging(mut self, enabled: bool) -> Self {
        self.log_interceptor_steps = enabled;
        self
    }

    /// Parse from TOML; missing keys take their defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed input
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] on malformed input
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            generation_assembly: DEFAULT_GENERATION_ASSEMBLY.to_string(),
            proxy_namespace: "Proxies".to_string(),
            log_interceptor_steps: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = GeneratorConfig::new();
        assert_eq!(config.generation_assembly, "DynamicProxyGenAssembly");
        assert_eq!(config.proxy_namespace, "Proxies");
        assert!(!config.log_interceptor_steps);
    }

    #[test]
    fn builder_methods() {
        let config = GeneratorConfig::new()
            .with_generation_assembly("Gen")
            .with_proxy_namespace("Generated.Proxies")
            .with_interceptor_step_logging(true);
        assert_eq!(config.generation_assembly, "Gen");
        assert_eq!(config.proxy_namespace, "Generated.Proxies");
        assert!(config.log_interceptor_steps);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GeneratorConfig::from_toml_str(r#"proxy_namespace = "Gen.Proxies""#).unwrap();
        assert_eq!(config.proxy_namespace, "Gen.Proxies");
        assert_eq!(config.generation_assembly, DEFAULT_GENERATION_ASSEMBLY);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            GeneratorConfig::from_toml_str("proxy_namespace = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            GeneratorConfig::load("/nonexistent/proxygen.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
