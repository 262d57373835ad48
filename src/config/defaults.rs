//! Default configuration values for memory-macro

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub monitor: MonitorDefaults,
    pub registry: RegistryDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub max_results: usize,
}

/// Default monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorDefaults {
    pub interval_ms: u64,
}

/// Default address registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryDefaults {
    pub path: String,
    pub server_mode: i32,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults { max_results: 100 },
        monitor: MonitorDefaults { interval_ms: 100 },
        registry: RegistryDefaults {
            path: "Config/addresses.json".to_string(),
            server_mode: 0,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
        },
    }
}
