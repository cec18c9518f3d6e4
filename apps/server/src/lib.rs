//! # Topology Classification Server
//!
//! Bootstrap coordinator of the classification service. Nothing is served until the
//! pushed configuration arrived and every collaborator is built:
//!
//! 1. announce the instance and start the configuration provider ([`Backbone`]);
//! 2. wait on the readiness gate;
//! 3. open storage from the pushed `database` section;
//! 4. select the gatekeeper from the `authServer` block and the `auth.enabled` toggle;
//! 5. build the feature slices through [`topo::init`];
//! 6. serve until the cancellation token fires.
//!
//! ## Example
//! ```no_run
//! use topo_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(60004)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

pub mod router;

use anyhow::Result;
use axum_server::Handle;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use topo::domain::config::ApiConfig;
use topo::features::iam::{Gatekeeper, IamError};
use topo::kernel::backbone::{Backbone, BackboneError, DiscoveryRegistry, ServerInfo};
use topo::kernel::readiness::ReadinessError;
use topo::kernel::server::{ApiState, ApiStateError};
use tracing::{error, info, instrument, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[topo_derive::topo_error]
pub enum BootstrapError {
    #[error("Backbone failed to start{}: {source}", format_context(.context))]
    Backbone { source: BackboneError, context: Option<Cow<'static, str>> },

    #[error("Configuration not ready{}: {source}", format_context(.context))]
    ConfigNotReady { source: ReadinessError, context: Option<Cow<'static, str>> },

    #[error("Storage unavailable{}: {message}", format_context(.context))]
    StorageUnavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Security gatekeeper failed{}: {source}", format_context(.context))]
    Security { source: IamError, context: Option<Cow<'static, str>> },

    #[error("Platform bootstrap failed{}: {source}", format_context(.context))]
    Slices { source: topo::InitError, context: Option<Cow<'static, str>> },

    #[error("API state incomplete{}: {source}", format_context(.context))]
    State { source: ApiStateError, context: Option<Cow<'static, str>> },
}

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
    cancel: Option<CancellationToken>,
    registry: Option<DiscoveryRegistry>,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    /// Token that aborts the readiness wait and stops the server; OS signals cancel it too.
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Discovery registry to announce the instance in; a private one by default.
    pub fn registry(mut self, registry: DiscoveryRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Runs the bootstrap sequence up to, but not including, serving.
    ///
    /// # Errors
    /// * [`BootstrapError::Backbone`] when the instance cannot be registered.
    /// * [`BootstrapError::ConfigNotReady`] when no configuration arrived within the
    ///   `[readiness]` budget, or the wait was cancelled.
    /// * [`BootstrapError::StorageUnavailable`] when the pushed database is unreachable.
    /// * [`BootstrapError::Security`] when authorization is enabled but its configuration
    ///   is missing or invalid.
    #[instrument(skip_all, fields(name = %self.cfg.server.name, port = self.cfg.server.port))]
    pub async fn build(self) -> Result<Server, BootstrapError> {
        let mut cfg = self.cfg;
        let cancel = self.cancel.unwrap_or_else(CancellationToken::new);

        // 1. Identity and backbone
        let info = ServerInfo::from_config(&cfg);
        info!(instance = %info.instance_id, endpoint = %info.endpoint(), "Initializing server");
        let registry = self.registry.unwrap_or_else(DiscoveryRegistry::new);
        let backbone = Backbone::start(&cfg, info, registry, &cancel)?;

        // 2. Readiness gate
        let remote = backbone
            .config_cell()
            .gate()
            .await_with(&cfg.readiness, &cancel)
            .await
            .context("waiting for pushed configuration")?;

        // 3. Storage
        let database = backbone.storage().await.map_err(|err| {
            BootstrapError::StorageUnavailable { message: err.to_string().into(), context: None }
        })?;
        cfg.database.clone_from(&remote.database);

        // 4. Security gatekeeper
        let security = match backbone.security_config() {
            Ok(security) => security,
            Err(err) if cfg.auth.enabled => {
                let source = IamError::InvalidConfig { message: err.to_string().into(), context: None };
                return Err(BootstrapError::Security { source, context: Some("authServer".into()) });
            }
            Err(err) => {
                warn!(%err, "Ignoring unparsable authServer block, authorization is disabled");
                None
            }
        };
        let gatekeeper = Gatekeeper::initialize(security.as_ref(), cfg.auth.enabled)?;

        // 5. Feature slices
        let slices = topo::init(&cfg, &database, gatekeeper)?;
        let state = ApiState::builder().config(cfg).db(database).register_slices(slices).build()?;

        info!("Bootstrap complete");
        Ok(Server { state, backbone, cancel })
    }
}

/// A fully initialized server instance ready to run.
///
/// This struct is returned by [`ServerBuilder::build`] and contains
/// all necessary runtime state.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
    backbone: Backbone,
    cancel: CancellationToken,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Serves until the cancellation token fires (SIGINT/SIGTERM or programmatic), then
    /// drains connections, deregisters the instance and returns.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured address.
    pub async fn run(self) -> Result<()> {
        use anyhow::Context as _;

        let Self { state, backbone, cancel } = self;
        let cfg = state.config.clone();
        let address = SocketAddr::new(cfg.server.address, cfg.server.port);

        let app = router::init(state.clone());
        let handle = Handle::<SocketAddr>::new();

        // Translate OS signals into cancellation
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = signal_cancel.cancelled() => {}
                res = shutdown_signal() => {
                    if let Err(e) = res {
                        error!("Error while waiting for shutdown signal: {e}");
                        return;
                    }
                    info!("Shutdown signal received");
                    signal_cancel.cancel();
                }
            }
        });

        let shutdown_handle = handle.clone();
        let shutdown_state = state.clone();
        let shutdown_cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_cancel.cancelled().await;
            shutdown_state.set_ready(false);
            info!("Starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        let ready_handle = handle.clone();
        let ready_state = state.clone();
        tokio::spawn(async move {
            if let Some(bound) = ready_handle.listening().await {
                ready_state.set_ready(true);
                info!("Serving on http://{bound}");
            }
        });

        info!(address = %address, "Starting HTTP server");
        let served = axum_server::bind(address)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("HTTP server failed");

        cancel.cancel();
        backbone.deregister();
        served?;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    use anyhow::Context as _;

    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res?,
        res = terminate => res?,
    }

    Ok(())
}
