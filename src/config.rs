use crate::prelude::*;

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub controller: Controller,

    #[serde(default)]
    pub influx: Influx,

    #[serde(default)]
    pub datalog: Datalog,

    #[serde(default)]
    pub http: Http,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Controller {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Controller {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub device: String,
    #[serde(default = "Config::default_baud_rate")]
    pub baud_rate: u32,

    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub read_timeout: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub poll_interval: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub reconnect_delay: Option<Duration>,

    pub max_failures: Option<u32>,
}
impl Controller {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout.unwrap_or(Duration::from_secs(5))
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.unwrap_or(Duration::from_secs(30))
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay.unwrap_or(Duration::from_secs(10))
    }

    /// 0 means keep trying forever.
    pub fn max_failures(&self) -> u32 {
        self.max_failures.unwrap_or(0)
    }
} // }}}

// Influx {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Influx {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub url: String,
    pub token: String,
    #[serde(default = "Config::default_influx_org")]
    pub org: String,
    pub bucket: String,
}
impl Default for Influx {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            token: String::new(),
            org: Config::default_influx_org(),
            bucket: String::new(),
        }
    }
}
impl Influx {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
} // }}}

// Datalog {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Datalog {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    #[serde(default = "Config::default_datalog_directory")]
    pub directory: String,
}
impl Default for Datalog {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: Config::default_datalog_directory(),
        }
    }
}
impl Datalog {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }
} // }}}

// Http {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Http {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    #[serde(default = "Config::default_http_bind")]
    pub bind: String,

    #[serde(default)]
    pub values: Vec<NamedValue>,
}
impl Default for Http {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: Config::default_http_bind(),
            values: Vec::new(),
        }
    }
}
impl Http {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn bind(&self) -> &str {
        &self.bind
    }

    pub fn values(&self) -> &[NamedValue] {
        &self.values
    }
}

/// A named value served by `/api/values`, taken either from a sensor
/// channel or from a rate output.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct NamedValue {
    pub name: String,
    pub sensor: Option<usize>,
    pub rate: Option<usize>,
} // }}}

pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl Clone for ConfigWrapper {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        let config = Config::new(file)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    // config is never mutated while locked, so a poisoned lock still
    // holds a consistent value
    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn controller(&self) -> Controller {
        self.lock().controller.clone()
    }

    pub fn influx(&self) -> Influx {
        self.lock().influx.clone()
    }

    pub fn datalog(&self) -> Datalog {
        self.lock().datalog.clone()
    }

    pub fn http(&self) -> Http {
        self.lock().http.clone()
    }

    pub fn loglevel(&self) -> String {
        self.lock().loglevel.clone()
    }

    pub fn log_summary(&self) {
        self.lock().log_summary()
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn log_summary(&self) {
        let c = &self.controller;
        info!("Configuration loaded successfully:");
        info!("  Controller: {}", if c.enabled { "enabled" } else { "disabled" });
        info!("    Device: {}", c.device);
        info!("    Baud Rate: {}", c.baud_rate);
        info!("    Read Timeout: {}s", c.read_timeout().as_secs());
        info!("    Poll Interval: {}s", c.poll_interval().as_secs());
        info!("    Reconnect Delay: {}s", c.reconnect_delay().as_secs());
        info!("    Max Failures: {}", c.max_failures());

        info!("  InfluxDB: {}", if self.influx.enabled { "enabled" } else { "disabled" });
        if self.influx.enabled {
            info!("    URL: {}", self.influx.url);
            info!("    Org: {}", self.influx.org);
            info!("    Bucket: {}", self.influx.bucket);
        }

        info!("  Datalog: {}", if self.datalog.enabled { "enabled" } else { "disabled" });
        if self.datalog.enabled {
            info!("    Directory: {}", self.datalog.directory);
        }

        info!("  HTTP: {}", if self.http.enabled { "enabled" } else { "disabled" });
        if self.http.enabled {
            info!("    Bind: {}", self.http.bind);
            info!("    Named values: {}", self.http.values.len());
        }

        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<()> {
        let c = &self.controller;
        if c.enabled {
            if c.device.is_empty() {
                bail!("controller.device cannot be empty");
            }
            if c.baud_rate == 0 {
                bail!("controller.baud_rate must be positive");
            }
            if c.poll_interval().is_zero() {
                bail!("controller.poll_interval must be at least 1 second");
            }
            if c.read_timeout().is_zero() {
                bail!("controller.read_timeout must be at least 1 second");
            }
        }

        if self.influx.enabled {
            if let Err(e) = url::Url::parse(&self.influx.url) {
                return Err(anyhow!("config.rs:Invalid InfluxDB URL: {}", e));
            }
            if self.influx.bucket.is_empty() {
                return Err(anyhow!("config.rs:InfluxDB bucket cannot be empty"));
            }
            if self.influx.token.is_empty() {
                return Err(anyhow!("config.rs:InfluxDB token cannot be empty"));
            }
        }

        if self.http.enabled {
            if let Err(e) = self.http.bind.parse::<std::net::SocketAddr>() {
                return Err(anyhow!("config.rs:Invalid HTTP bind address {}: {}", self.http.bind, e));
            }
            for (i, value) in self.http.values.iter().enumerate() {
                if value.name.is_empty() {
                    bail!("http.values[{}].name cannot be empty", i);
                }
                if value.sensor.is_some() == value.rate.is_some() {
                    bail!("http.values[{}] must set exactly one of sensor or rate", i);
                }
            }
        }

        Ok(())
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_baud_rate() -> u32 {
        115200
    }

    fn default_influx_org() -> String {
        "solar".to_string()
    }

    fn default_datalog_directory() -> String {
        ".".to_string()
    }

    fn default_http_bind() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
