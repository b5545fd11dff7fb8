use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub decision: DecisionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            enable_cors: false,
            request_timeout_secs: 10,
        }
    }
}

/// When artifacts are (re)read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Load once during startup; only an explicit reload re-reads files.
    Startup,
    /// Before each evaluation, reload artifacts whose file changed.
    OnChange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub dir: PathBuf,
    pub reload: ReloadPolicy,
    pub scaler: String,
    pub xgboost: String,
    pub random_forest: String,
    pub lightgbm: String,
    pub catboost: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("saved_models"),
            reload: ReloadPolicy::OnChange,
            scaler: "scaler.json".to_string(),
            xgboost: "xgb_model.json".to_string(),
            random_forest: "rf_model.json".to_string(),
            lightgbm: "lgbm_model.json".to_string(),
            catboost: "cat_model.json".to_string(),
        }
    }
}

/// Load thresholds (kWh) separating the three HVAC actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub high_load_kwh: f64,
    pub medium_load_kwh: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            high_load_kwh: 35.0,
            medium_load_kwh: 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// `RUST_LOG`, when set, takes precedence over `filter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: "info,hyper=warn,tower_http=info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("HVAC__").split("__"));
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.decision;
        if !d.high_load_kwh.is_finite() || !d.medium_load_kwh.is_finite() {
            anyhow::bail!("decision thresholds must be finite numbers");
        }
        if d.medium_load_kwh >= d.high_load_kwh {
            anyhow::bail!(
                "decision.medium_load_kwh ({}) must be below decision.high_load_kwh ({})",
                d.medium_load_kwh,
                d.high_load_kwh
            );
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.decision.high_load_kwh, 35.0);
        assert_eq!(cfg.decision.medium_load_kwh, 25.0);
        assert_eq!(cfg.models.reload, ReloadPolicy::OnChange);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut cfg = Config::default();
        cfg.decision.medium_load_kwh = 40.0;
        assert!(cfg.validate().is_err());

        cfg.decision.medium_load_kwh = 35.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig::default();
        let addr = server.socket_addr().unwrap();
        assert_eq!(addr.port(), 8501);
    }

    #[test]
    fn test_reload_policy_from_toml() {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string("[models]\nreload = \"startup\"\ndir = \"/srv/models\""))
            .extract()
            .unwrap();
        assert_eq!(cfg.models.reload, ReloadPolicy::Startup);
        assert_eq!(cfg.models.dir, PathBuf::from("/srv/models"));
        assert_eq!(cfg.models.scaler, "scaler.json");
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_logging_format_override() {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string("[logging]\nformat = \"pretty\""))
            .extract()
            .unwrap();
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
        assert!(cfg.logging.filter.starts_with("info"));
    }
}
