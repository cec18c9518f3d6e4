//! Process registration, pushed configuration and storage hand-out.
//!
//! The [`Backbone`] is the service's link to its surroundings: it announces the instance
//! in a [`DiscoveryRegistry`], feeds the pushed configuration blob into a
//! [`ConfigCell`] and, once that configuration is present, opens the storage handle and
//! exposes the `authServer` block.

use crate::config::parse_toml;
use crate::readiness::ConfigCell;
use crate::safe_nanoid;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use topo_database::{Database, DatabaseError};
use topo_domain::config::{ApiConfig, AuthServerConfig, RemoteConfig};
use tracing::{debug, info, instrument, warn};

#[topo_derive::topo_error]
pub enum BackboneError {
    #[error("Registration failed{}: {message}", format_context(.context))]
    Registration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Configuration provider error{}: {message}", format_context(.context))]
    Provider { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Storage unavailable{}: {source}", format_context(.context))]
    Storage { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Security configuration is invalid{}: {source}", format_context(.context))]
    Security { source: serde_json::Error, context: Option<Cow<'static, str>> },
}

/// Identity of this process as announced to discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub ip: IpAddr,
    pub port: u16,
    pub instance_id: String,
    pub tags: Vec<String>,
}

impl ServerInfo {
    /// Uses the configured instance id or generates one.
    #[must_use]
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            name: config.server.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            ip: config.server.address,
            port: config.server.port,
            instance_id: config.server.instance_id.clone().unwrap_or_else(|| safe_nanoid!()),
            tags: config.discovery.tags.clone(),
        }
    }

    #[must_use]
    pub const fn endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// In-process service registry keyed by instance id.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRegistry {
    instances: Arc<RwLock<FxHashMap<String, ServerInfo>>>,
}

impl DiscoveryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// [`BackboneError::Registration`] when the instance id is already taken.
    pub fn register(&self, info: ServerInfo) -> Result<(), BackboneError> {
        let mut instances = self.instances.write();
        if instances.contains_key(&info.instance_id) {
            return Err(BackboneError::Registration {
                message: "instance id already registered".into(),
                context: Some(info.instance_id.into()),
            });
        }
        info!(name = %info.name, instance = %info.instance_id, endpoint = %info.endpoint(), "Instance registered");
        instances.insert(info.instance_id.clone(), info);
        Ok(())
    }

    /// Returns whether the instance was registered.
    pub fn deregister(&self, instance_id: &str) -> bool {
        self.instances.write().remove(instance_id).is_some()
    }

    /// Registered instances of the service `name`.
    #[must_use]
    pub fn instances(&self, name: &str) -> Vec<ServerInfo> {
        self.instances.read().values().filter(|info| info.name == name).cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, instance_id: &str) -> bool {
        self.instances.read().contains_key(instance_id)
    }
}

/// Watches the pushed configuration file and republishes it whenever its contents change.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    interval: Duration,
    cell: ConfigCell<RemoteConfig>,
    last: Option<String>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, interval: Duration, cell: ConfigCell<RemoteConfig>) -> Self {
        Self { path: path.into(), interval, cell, last: None }
    }

    /// Reads the file once. Returns `true` when a new value was published.
    ///
    /// A missing file means nothing was pushed yet; unparsable contents are logged and
    /// skipped so that a later, corrected push still gets through.
    pub async fn poll_once(&mut self) -> bool {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %self.path.display(), %err, "No pushed configuration yet");
                return false;
            }
        };
        if self.last.as_deref() == Some(contents.as_str()) {
            return false;
        }

        let parsed = parse_toml::<RemoteConfig>(&contents);
        self.last = Some(contents);
        match parsed {
            Ok(remote) => {
                info!(path = %self.path.display(), "Pushed configuration received");
                self.cell.publish(remote);
                true
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "Ignoring malformed pushed configuration");
                false
            }
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            self.poll_once().await;
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
        debug!(path = %self.path.display(), "Configuration provider stopped");
    }
}

#[derive(Debug)]
pub struct Backbone {
    info: ServerInfo,
    registry: DiscoveryRegistry,
    cell: ConfigCell<RemoteConfig>,
    cancel: CancellationToken,
    provider: Option<JoinHandle<()>>,
}

impl Backbone {
    /// A backbone without a provider; configuration arrives through [`Self::push`].
    #[must_use]
    pub fn new(info: ServerInfo, registry: DiscoveryRegistry) -> Self {
        Self { info, registry, cell: ConfigCell::new(), cancel: CancellationToken::new(), provider: None }
    }

    /// Registers the instance (when discovery is enabled) and spawns the file provider.
    ///
    /// Must be called from within a Tokio runtime. The provider stops with `cancel`.
    ///
    /// # Errors
    /// [`BackboneError::Registration`] on a duplicate instance;
    /// [`BackboneError::Provider`] outside a runtime.
    #[instrument(skip_all, fields(instance = %info.instance_id))]
    pub fn start(
        config: &ApiConfig,
        info: ServerInfo,
        registry: DiscoveryRegistry,
        cancel: &CancellationToken,
    ) -> Result<Self, BackboneError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|err| BackboneError::Provider {
            message: err.to_string().into(),
            context: Some("no runtime".into()),
        })?;

        if config.discovery.enabled {
            registry.register(info.clone())?;
        } else {
            info!("Discovery disabled, instance not registered");
        }

        let mut backbone = Self::new(info, registry);
        backbone.cancel = cancel.child_token();
        let provider = FileConfigProvider::new(
            &config.remote.path,
            Duration::from_millis(config.remote.poll_interval_ms.max(1)),
            backbone.cell.clone(),
        );
        backbone.provider = Some(runtime.spawn(provider.run(backbone.cancel.clone())));

        Ok(backbone)
    }

    #[must_use]
    pub const fn config_cell(&self) -> &ConfigCell<RemoteConfig> {
        &self.cell
    }

    /// Publishes `remote` as if it had been pushed.
    pub fn push(&self, remote: RemoteConfig) {
        self.cell.publish(remote);
    }

    /// Opens the storage engine described by the pushed `database` section.
    ///
    /// # Errors
    /// [`BackboneError::Provider`] before any configuration arrived;
    /// [`BackboneError::Storage`] when the engine cannot be reached.
    #[instrument(skip(self))]
    pub async fn storage(&self) -> Result<Database, BackboneError> {
        let remote = self.remote()?;
        Database::connect(&remote.database).await.context("pushed database section")
    }

    /// Parses the pushed `authServer` block, `None` when it is absent.
    ///
    /// # Errors
    /// [`BackboneError::Provider`] before any configuration arrived;
    /// [`BackboneError::Security`] when the block is malformed.
    pub fn security_config(&self) -> Result<Option<AuthServerConfig>, BackboneError> {
        let remote = self.remote()?;
        remote
            .auth_server
            .clone()
            .map(serde_json::from_value::<AuthServerConfig>)
            .transpose()
            .context("authServer")
    }

    /// Stops the provider and removes the instance from discovery.
    pub fn deregister(&self) {
        self.cancel.cancel();
        if self.registry.deregister(&self.info.instance_id) {
            info!(instance = %self.info.instance_id, "Instance deregistered");
        }
    }

    fn remote(&self) -> Result<Arc<RemoteConfig>, BackboneError> {
        self.cell.get().ok_or(BackboneError::Provider {
            message: "configuration not received".into(),
            context: None,
        })
    }
}

impl Drop for Backbone {
    fn drop(&mut self) {
        self.deregister();
        if let Some(provider) = self.provider.take() {
            provider.abort();
        }
    }
}
