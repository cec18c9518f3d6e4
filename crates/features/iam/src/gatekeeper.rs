use crate::IamError;
use async_trait::async_trait;
use fxhash::FxHashMap;
use std::fmt::Debug;
use std::sync::Arc;
use topo_domain::config::AuthServerConfig;
use topo_domain::permissions::ActionSet;
use tracing::info;

/// Operator entry matching every caller.
pub const ANY_OPERATOR: &str = "*";

/// Decides whether an operator may perform an action.
#[async_trait]
pub trait Authorizer: Debug + Send + Sync {
    async fn authorize(&self, operator: &str, action: ActionSet) -> Result<(), IamError>;
}

/// Client of the authorization server, evaluating the grants it was configured with.
#[derive(Debug, Clone)]
pub struct IamClient {
    address: Vec<String>,
    app_code: String,
    grants: FxHashMap<String, ActionSet>,
}

impl IamClient {
    /// # Errors
    /// [`IamError::InvalidConfig`] when no address is given, the app credentials are
    /// blank, or a grant names an unknown action or no operator.
    pub fn new(config: &AuthServerConfig) -> Result<Self, IamError> {
        let invalid = |message: String| IamError::InvalidConfig {
            message: message.into(),
            context: Some("authServer".into()),
        };

        if config.address.is_empty() || config.address.iter().any(|a| a.trim().is_empty()) {
            return Err(invalid("at least one non-blank address is required".to_owned()));
        }
        if config.app_code.trim().is_empty() || config.app_secret.trim().is_empty() {
            return Err(invalid("appCode and appSecret are required".to_owned()));
        }

        let mut grants = FxHashMap::default();
        for grant in &config.grants {
            let operator = grant.operator.trim();
            if operator.is_empty() {
                return Err(invalid("grant without operator".to_owned()));
            }
            let mut actions = ActionSet::empty();
            for action in &grant.actions {
                actions |= ActionSet::parse(action)
                    .ok_or_else(|| invalid(format!("unknown action '{action}' for '{operator}'")))?;
            }
            *grants.entry(operator.to_owned()).or_insert_with(ActionSet::empty) |= actions;
        }

        Ok(Self { address: config.address.clone(), app_code: config.app_code.clone(), grants })
    }

    /// Actions granted to `operator`, including wildcard grants.
    #[must_use]
    pub fn granted(&self, operator: &str) -> ActionSet {
        let direct = self.grants.get(operator).copied().unwrap_or_else(ActionSet::empty);
        let any = self.grants.get(ANY_OPERATOR).copied().unwrap_or_else(ActionSet::empty);
        direct | any
    }

    #[must_use]
    pub fn address(&self) -> &[String] {
        &self.address
    }
}

#[async_trait]
impl Authorizer for IamClient {
    async fn authorize(&self, operator: &str, action: ActionSet) -> Result<(), IamError> {
        if self.granted(operator).contains(action) {
            Ok(())
        } else {
            Err(IamError::Forbidden {
                message: format!("'{operator}' may not perform {action:?}").into(),
                context: Some(self.app_code.clone().into()),
            })
        }
    }
}

/// Permits everything; installed when authorization is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuthorizer;

#[async_trait]
impl Authorizer for NoopAuthorizer {
    async fn authorize(&self, _operator: &str, _action: ActionSet) -> Result<(), IamError> {
        Ok(())
    }
}

/// The authorizer chosen once at bootstrap.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    authorizer: Arc<dyn Authorizer>,
    enabled: bool,
}

impl Gatekeeper {
    /// Builds the [`IamClient`] when `enabled`, the [`NoopAuthorizer`] otherwise.
    ///
    /// # Errors
    /// [`IamError::InvalidConfig`] when enabled without a usable `authServer` block.
    pub fn initialize(config: Option<&AuthServerConfig>, enabled: bool) -> Result<Self, IamError> {
        if !enabled {
            info!("Authorization disabled, all operations are permitted");
            return Ok(Self::disabled());
        }

        let config = config.ok_or(IamError::InvalidConfig {
            message: "authorization enabled but no authServer block was pushed".into(),
            context: None,
        })?;
        let client = IamClient::new(config)?;
        info!(address = ?client.address(), "Authorization client initialized");

        Ok(Self::with(Arc::new(client)))
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self { authorizer: Arc::new(NoopAuthorizer), enabled: false }
    }

    /// Enforces `authorizer` for every operation.
    #[must_use]
    pub fn with(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer, enabled: true }
    }

    #[must_use]
    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_domain::config::GrantConfig;

    fn config(grants: Vec<GrantConfig>) -> AuthServerConfig {
        AuthServerConfig {
            address: vec!["127.0.0.1:8080".to_owned()],
            app_code: "cmdb".to_owned(),
            app_secret: "secret".to_owned(),
            grants,
        }
    }

    fn grant(operator: &str, actions: &[&str]) -> GrantConfig {
        GrantConfig {
            operator: operator.to_owned(),
            actions: actions.iter().map(|&a| a.to_owned()).collect(),
        }
    }

    #[test]
    fn disabled_gatekeeper_ignores_missing_config() {
        let gatekeeper = Gatekeeper::initialize(None, false).expect("disabled");
        assert!(!gatekeeper.is_enabled());

        assert!(Gatekeeper::with(Arc::new(NoopAuthorizer)).is_enabled());
    }

    #[test]
    fn enabled_gatekeeper_requires_valid_config() {
        assert!(matches!(Gatekeeper::initialize(None, true), Err(IamError::InvalidConfig { .. })));

        let mut blank = config(Vec::new());
        blank.app_secret = " ".to_owned();
        assert!(matches!(Gatekeeper::initialize(Some(&blank), true), Err(IamError::InvalidConfig { .. })));

        let mut no_address = config(Vec::new());
        no_address.address.clear();
        assert!(IamClient::new(&no_address).is_err());

        let bad_grant = config(vec![grant("alice", &["fly"])]);
        assert!(IamClient::new(&bad_grant).is_err());

        let gatekeeper = Gatekeeper::initialize(Some(&config(Vec::new())), true).expect("enabled");
        assert!(gatekeeper.is_enabled());
    }

    #[tokio::test]
    async fn grants_are_combined_with_wildcards() {
        let client =
            IamClient::new(&config(vec![grant("alice", &["update", "delete"]), grant("*", &["read"])]))
                .expect("client");

        assert_eq!(client.granted("alice"), ActionSet::FIND | ActionSet::UPDATE | ActionSet::DELETE);
        assert!(client.authorize("alice", ActionSet::DELETE).await.is_ok());
        assert!(client.authorize("bob", ActionSet::FIND).await.is_ok());
        assert!(matches!(
            client.authorize("bob", ActionSet::CREATE).await,
            Err(IamError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn noop_permits_everything() {
        assert!(NoopAuthorizer.authorize("anyone", ActionSet::ALL).await.is_ok());
    }
}
