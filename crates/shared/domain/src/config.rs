use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Local configuration of the service (`server.toml` plus `TOPO__*` overrides).
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub readiness: ReadinessConfig,
    pub discovery: DiscoveryConfig,
    pub remote: RemoteSourceConfig,
    pub auth: AuthToggle,
    pub audit: AuditConfig,
    /// Filled in at bootstrap from the pushed configuration.
    pub database: DatabaseConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Service identity and HTTP bind address.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub address: IpAddr,
    pub port: u16,
    /// Stable instance id; generated at startup when absent.
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub console: bool,
    pub level: String,
    /// Extra directives such as `topo_classification=debug,tower_http=info`.
    pub filter: Option<String>,
    /// Rolling file output is enabled when a directory is set.
    pub directory: Option<PathBuf>,
    pub rotation: LogRotation,
    pub max_files: usize,
    pub json: bool,
}

/// Attempt budget of the startup readiness gate.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub attempts: u32,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    pub tags: Vec<String>,
}

/// Where the pushed configuration blob is delivered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteSourceConfig {
    pub path: PathBuf,
    pub poll_interval_ms: u64,
}

/// Process-wide authorization toggle.
#[derive(Default, Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AuthToggle {
    pub enabled: bool,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// A failed pre-mutation snapshot aborts the mutation.
    #[default]
    Strict,
    /// A failed pre-mutation snapshot is logged and the record is marked incomplete.
    BestEffort,
}

#[derive(Default, Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub capture_policy: CapturePolicy,
}

/// Storage engine connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub health_check_attempts: u32,
}

/// The configuration blob pushed by the configuration center.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Kept raw: it is only interpreted when authorization is enabled.
    #[serde(rename = "authServer", default)]
    pub auth_server: Option<serde_json::Value>,
}

/// Authorization server client settings (`authServer` block).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthServerConfig {
    pub address: Vec<String>,
    pub app_code: String,
    pub app_secret: String,
    pub grants: Vec<GrantConfig>,
}

/// Actions an operator may perform, e.g. `{ operator = "admin", actions = ["*"] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrantConfig {
    pub operator: String,
    pub actions: Vec<String>,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "topo-classification".to_owned(),
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 60004,
            instance_id: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console: true,
            level: "info".to_owned(),
            filter: None,
            directory: None,
            rotation: LogRotation::Daily,
            max_files: 10,
            json: false,
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self { attempts: 60, interval_ms: 1000 }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { enabled: true, tags: Vec::new() }
    }
}

impl Default for RemoteSourceConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("remote.toml"), poll_interval_ms: 500 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mem://".to_owned(),
            namespace: "topo".to_owned(),
            database: "cmdb".to_owned(),
            health_check_attempts: 3,
        }
    }
}
