//! Configuration validator for memory-macro
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, LoggingConfig, MonitorConfig, RegistryConfig, ScannerConfig};

/// Log levels accepted by the `[logging]` section
pub const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scanner(&config.scanner)?;
        Self::validate_monitor(&config.monitor)?;
        Self::validate_registry(&config.registry)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
        if scanner.max_results == 0 {
            return Err(ConfigError::Invalid(
                "Maximum results must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_monitor(monitor: &MonitorConfig) -> Result<(), ConfigError> {
        if monitor.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Monitor interval must be at least 1 ms".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_registry(registry: &RegistryConfig) -> Result<(), ConfigError> {
        if registry.path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Address store path cannot be empty".to_string(),
            ));
        }

        if !(0..=2).contains(&registry.server_mode) {
            return Err(ConfigError::Invalid(format!(
                "Invalid server mode: {}. Must be 0 (MR), 1 (HR) or 2 (LR)",
                registry.server_mode
            )));
        }

        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, LOG_LEVELS
            )));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
