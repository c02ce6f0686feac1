use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variable holding the platform service bindings
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Connection string used as-is when non-empty (local runs)
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Select `mongodb_url_ssl` instead of `mongodb_url` from the binding
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    /// Database used when the connection string does not name one
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    /// Also echo each run's log to stdout
    #[serde(default)]
    pub print_log: bool,
}

fn default_port() -> u16 {
    3000
}

fn default_service_name() -> String {
    "timeseriesdatabase".to_string()
}

fn default_collection_name() -> String {
    "nodeMongo".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

fn default_static_dir() -> String {
    "./static".to_string()
}

fn default_templates_dir() -> String {
    "./templates".to_string()
}

/// Errors raised while resolving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("VCAP_SERVICES is not set and no connection url is configured")]
    MissingServices,

    #[error("failed to parse VCAP_SERVICES: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("service '{0}' is not bound")]
    ServiceNotBound(String),

    #[error("service '{0}' has no credentials")]
    MissingCredentials(String),

    #[error("credentials have no '{0}' field")]
    MissingUrl(&'static str),

    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// One entry of a service's binding array
#[derive(Debug, Deserialize)]
struct ServiceBinding {
    #[serde(default)]
    credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(default)]
    mongodb_url: Option<String>,
    #[serde(default)]
    mongodb_url_ssl: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay `VCAP_APP_PORT` and `SERVICE_NAME` from the given lookup
    ///
    /// Pass `|key| std::env::var(key).ok()` to read the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("VCAP_APP_PORT").filter(|p| !p.trim().is_empty()) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }

        if let Some(name) = lookup("SERVICE_NAME") {
            if !name.is_empty() {
                self.service_name = name;
            }
        }

        Ok(())
    }

    /// Resolve the database connection string
    ///
    /// A non-empty `url` wins. Otherwise `vcap_services` must hold the
    /// platform binding JSON: `{ "<service>": [ { "credentials": { ... } } ] }`.
    pub fn connection_url(&self, vcap_services: Option<&str>) -> Result<String, ConfigError> {
        if !self.url.is_empty() {
            return Ok(self.url.clone());
        }

        let raw = vcap_services.ok_or(ConfigError::MissingServices)?;

        // Only the requested service has to match our binding shape
        let services: HashMap<String, serde_json::Value> = serde_json::from_str(raw)?;
        let entry = services
            .get(&self.service_name)
            .cloned()
            .ok_or_else(|| ConfigError::ServiceNotBound(self.service_name.clone()))?;

        let bindings: Vec<ServiceBinding> = serde_json::from_value(entry)?;
        let binding = bindings
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::ServiceNotBound(self.service_name.clone()))?;

        let credentials = binding
            .credentials
            .ok_or_else(|| ConfigError::MissingCredentials(self.service_name.clone()))?;

        if self.use_ssl {
            credentials
                .mongodb_url_ssl
                .ok_or(ConfigError::MissingUrl("mongodb_url_ssl"))
        } else {
            credentials
                .mongodb_url
                .ok_or(ConfigError::MissingUrl("mongodb_url"))
        }
    }

    pub fn index_path(&self) -> String {
        format!("{}/index.html", self.static_dir)
    }

    pub fn template_path(&self, name: &str) -> String {
        format!("{}/{}", self.templates_dir, name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            port: default_port(),
            service_name: default_service_name(),
            use_ssl: false,
            collection_name: default_collection_name(),
            database: default_database(),
            static_dir: default_static_dir(),
            templates_dir: default_templates_dir(),
            print_log: false,
        }
    }
}
