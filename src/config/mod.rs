//! Configuration module for memory-macro
//!
//! Provides TOML configuration loading, validation, and default settings
//! for the scanner, the address monitor and the address registry.

mod defaults;
mod loader;
mod validator;

pub use defaults::{default_config, ConfigDefaults};
pub use loader::{
    load_config, ConfigLoader, LoggingConfig, MonitorConfig, RegistryConfig, ScannerConfig,
};
pub use validator::{validate_config, ConfigValidator, LOG_LEVELS};

// Re-export the main configuration structure
pub use loader::Config;

// Configuration-related error type
pub use loader::ConfigError;

// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
