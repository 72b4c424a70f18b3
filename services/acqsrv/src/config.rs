//! Service configuration.
//!
//! A yaml file merged with `ACQSRV_`-prefixed environment variables, e.g.
//! `ACQSRV_API__BIND_ADDRESS=0.0.0.0:8080` overrides `api.bind_address`.

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{AcqError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub api: ApiSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub engine: EngineSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Start the engine on boot instead of waiting for `POST /engine/start`.
    pub autostart: bool,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "acqsrv".to_string(),
        }
    }
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: "data/gridlink.db".to_string(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            autostart: true,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service: ServiceSection::default(),
            api: ApiSection::default(),
            database: DatabaseSection::default(),
            logging: LoggingSection::default(),
            engine: EngineSection::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from a yaml file (missing file falls back to defaults) merged
    /// with `ACQSRV_` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("ACQSRV_").split("__"))
            .extract()
            .map_err(|e| AcqError::ConfigError(e.to_string()))
    }
}
