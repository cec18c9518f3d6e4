use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_PREFIX: &str = "TOPO";
const DEFAULT_CONFIG_FILE: &str = "server";

#[topo_derive::topo_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads `T` from a file layered with environment overrides.
///
/// 1. **Base file**: `path` (extension optional, e.g. `server` resolves `server.toml`);
///    defaults to `server` in the working directory.
/// 2. **Environment**: `TOPO__SECTION__KEY` overrides `section.key`
///    (e.g. `TOPO__AUDIT__CAPTURE_POLICY=best_effort`).
///
/// # Errors
/// Fails when the file is missing or the merged tree does not deserialize into `T`.
///
/// ```rust
/// use topo_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), |p| p.as_ref().to_path_buf());
    info!(path = %path.display(), "Loading config");

    Config::builder()
        .add_source(File::from(path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}

/// Parses a TOML document, as delivered by the configuration push.
///
/// # Errors
/// Fails on malformed TOML or a shape mismatch with `T`.
pub fn parse_toml<T>(contents: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    Config::builder()
        .add_source(File::from_str(contents, FileFormat::Toml))
        .build()
        .context("Failed to parse pushed config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize pushed config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use topo_domain::config::{ApiConfig, CapturePolicy, RemoteConfig};

    #[test]
    fn loads_sections_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("tempfile");
        writeln!(
            file,
            "[server]\nname = \"topo-it\"\nport = 7001\n\n[audit]\ncapture_policy = \"best_effort\"\n"
        )
        .expect("write");

        let cfg: ApiConfig = load_config(Some(file.path())).expect("load");
        assert_eq!(cfg.server.name, "topo-it");
        assert_eq!(cfg.server.port, 7001);
        assert_eq!(cfg.audit.capture_policy, CapturePolicy::BestEffort);
        assert_eq!(cfg.readiness.attempts, 60);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load_config::<ApiConfig>(Some("does/not/exist.toml"));
        assert!(matches!(result, Err(ConfigError::Config { context: Some(_), .. })));
    }

    #[test]
    fn parses_pushed_blob_with_auth_server_block() {
        let blob = r#"
            [database]
            url = "mem://"
            namespace = "cmdb"

            [authServer]
            address = ["127.0.0.1:8080"]
            appCode = "cmdb"
            appSecret = "s3cret"
        "#;

        let remote: RemoteConfig = parse_toml(blob).expect("parse");
        assert_eq!(remote.database.namespace, "cmdb");
        assert_eq!(remote.database.database, "cmdb");
        let auth = remote.auth_server.expect("authServer");
        assert_eq!(auth["appCode"], "cmdb");
    }
}
