//! # Database Infrastructure
//!
//! An in-process table engine playing the storage collaborator of the classification
//! service: classifications, model objects and the audit trail, each in its own
//! [`Table`] with per-operation atomicity.
//!
//! * **Builder pattern**: the connection URL and session are validated up front.
//! * **Health checks**: `init` probes the engine with exponential backoff before handing
//!   out a handle; an engine with a warm-up period reports itself as starting until
//!   the period elapsed.
//! * **Query evaluation**: [`Rows::select`] applies a [`Condition`], scope visibility,
//!   sort keys and pagination; unknown fields are rejected with
//!   [`DatabaseError::InvalidInput`].
//!
//! ```rust
//! use topo_database::{Database, DatabaseError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::builder().url("mem://").session("topo", "cmdb").init().await?;
//!     db.health()?;
//!     Ok(())
//! }
//! ```
//!
//! [`Condition`]: topo_domain::models::Condition

mod error;
mod query;
mod record;
mod table;

pub use crate::error::{DatabaseError, DatabaseErrorExt};
pub use crate::record::Record;
pub use crate::table::{Rows, Table};

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use topo_domain::config::DatabaseConfig;
use topo_domain::models::{AuditRecord, Classification, ObjectSummary};
use tracing::{info, instrument, warn};

const MEMORY_SCHEME: &str = "mem://";
const DEFAULT_HEALTH_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct DatabaseInner {
    pub classifications: Table<Classification>,
    pub objects: Table<ObjectSummary>,
    pub audit: Table<AuditRecord>,
    online: Arc<AtomicBool>,
    ready_at: Instant,
    ns: String,
    db: String,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        info!(ns = %self.ns, db = %self.db, "Database handle dropped");
    }
}

/// Cheaply cloneable handle to the engine.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Connects with the `[database]` section of the pushed configuration.
    ///
    /// # Errors
    /// See [`DatabaseBuilder::init`].
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        Self::builder()
            .url(&config.url)
            .session(&config.namespace, &config.database)
            .health_check_attempts(config.health_check_attempts)
            .init()
            .await
    }

    /// # Errors
    /// [`DatabaseError::Connection`] while the engine is still warming up or once it was
    /// shut down.
    pub fn health(&self) -> Result<(), DatabaseError> {
        let message = if !self.online.load(Ordering::Acquire) {
            "engine is shut down"
        } else if Instant::now() < self.ready_at {
            "engine is starting"
        } else {
            return Ok(());
        };
        Err(DatabaseError::Connection {
            message: message.into(),
            context: Some(format!("{}/{}", self.ns, self.db).into()),
        })
    }

    /// Takes the engine offline; every later operation fails with
    /// [`DatabaseError::Connection`].
    pub fn shutdown(&self) {
        if self.online.swap(false, Ordering::AcqRel) {
            warn!(ns = %self.ns, db = %self.db, "Database engine shut down");
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.ns
    }
}

impl Deref for Database {
    type Target = DatabaseInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
    health_check_attempts: Option<u32>,
    backoff: Option<Duration>,
    warm_up: Duration,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    pub fn health_check_attempts(mut self, attempts: u32) -> Self {
        self.health_check_attempts = Some(attempts.max(1));
        self
    }

    /// Delay before the first retry; doubled after every failed probe.
    pub fn backoff(mut self, delay: Duration) -> Self {
        self.backoff = Some(delay);
        self
    }

    /// Time the engine needs after start before it reports healthy.
    pub fn warm_up(mut self, warm_up: Duration) -> Self {
        self.warm_up = warm_up;
        self
    }

    /// Validates the parameters, starts the engine and waits until it reports healthy.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if the URL or session is missing.
    /// * [`DatabaseError::Connection`] for an unsupported engine or one that stays
    ///   unhealthy after the configured attempts.
    #[instrument(skip(self), fields(url = ?self.url, ns = ?self.ns, db = ?self.db))]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        let url = self.url.ok_or(DatabaseError::Validation {
            message: "URL is required".into(),
            context: None,
        })?;
        let (Some(ns), Some(db)) = (self.ns, self.db) else {
            return Err(DatabaseError::Validation {
                message: "namespace and database are required".into(),
                context: None,
            });
        };
        if !url.starts_with(MEMORY_SCHEME) {
            return Err(DatabaseError::Connection {
                message: "unsupported engine; only mem:// is available".into(),
                context: Some(url.into()),
            });
        }

        let online = Arc::new(AtomicBool::new(true));
        let database = Database {
            inner: Arc::new(DatabaseInner {
                classifications: Table::new(Arc::clone(&online)),
                objects: Table::new(Arc::clone(&online)),
                audit: Table::new(Arc::clone(&online)),
                online,
                ready_at: Instant::now() + self.warm_up,
                ns,
                db,
            }),
        };

        let attempts = self.health_check_attempts.unwrap_or(DEFAULT_HEALTH_ATTEMPTS);
        let mut delay = self.backoff.unwrap_or(INITIAL_BACKOFF);
        for attempt in 1..=attempts {
            match database.health() {
                Ok(()) => break,
                Err(err) if attempt == attempts => return Err(err).context("unhealthy after retries"),
                Err(err) => {
                    warn!(attempt, ?delay, %err, "Database not ready, retrying...");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }

        info!(namespace = %database.ns, database = %database.db, "Database engine ready");
        Ok(database)
    }
}
