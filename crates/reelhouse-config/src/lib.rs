//! Configuration for reelhouse clients.
//!
//! TOML file + `REELHOUSE_*` environment, the OS-keyring token store, and
//! translation to `reelhouse_core::ClientConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use reelhouse_api::TokenStore;
use reelhouse_core::{ClientConfig, RealtimeSettings, SessionExpiryPolicy, TlsMode};

/// Keyring service name.
pub const KEYRING_SERVICE: &str = "reelhouse";
/// The one key the access token is stored under.
pub const TOKEN_KEY: &str = "access-token";

const ENV_PREFIX: &str = "REELHOUSE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("website_url is not configured")]
    MissingWebsiteUrl,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Site root, e.g. `https://stream.example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub realtime: RealtimeSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            ca_cert: None,
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSection {
    /// `unauthorized-or-server-fault` (401 or 500) or `unauthorized` (401 only).
    #[serde(default = "default_expiry")]
    pub expire_on: String,

    #[serde(default = "default_login_route")]
    pub login_route: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            expire_on: default_expiry(),
            login_route: default_login_route(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RealtimeSection {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Zero disables heart-beats.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_ms: default_heartbeat_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_expiry() -> String {
    "unauthorized-or-server-fault".into()
}
fn default_login_route() -> String {
    reelhouse_api::session::LOGIN_ROUTE.into()
}
fn default_reconnect_delay_ms() -> u64 {
    5_000
}
fn default_heartbeat_ms() -> u64 {
    10_000
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "reelhouse", "reelhouse").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("reelhouse");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then `path`, then `REELHOUSE_*` (`__` separates sections).
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and check a website URL: absolute `http` or `https`.
pub fn parse_website_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.trim().parse().map_err(|e| ConfigError::Validation {
        field: "website_url".into(),
        reason: format!("{e}: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "website_url".into(),
            reason: format!("expected an http(s) URL, got {raw}"),
        });
    }
    Ok(url)
}

pub fn parse_expiry_policy(raw: &str) -> Result<SessionExpiryPolicy, ConfigError> {
    match raw {
        "unauthorized-or-server-fault" => Ok(SessionExpiryPolicy::UnauthorizedOrServerFault),
        "unauthorized" => Ok(SessionExpiryPolicy::Unauthorized),
        other => Err(ConfigError::Validation {
            field: "session.expire_on".into(),
            reason: format!(
                "expected 'unauthorized-or-server-fault' or 'unauthorized', got '{other}'"
            ),
        }),
    }
}

/// Durations that must be positive: zero would spin or time out at once.
fn positive(field: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

/// Build the runtime `ClientConfig`.
pub fn to_client_config(cfg: &Config) -> Result<ClientConfig, ConfigError> {
    let raw = cfg
        .website_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or(ConfigError::MissingWebsiteUrl)?;
    let mut client = ClientConfig::new(parse_website_url(raw)?);

    client.timeout = Duration::from_secs(positive("defaults.timeout", cfg.defaults.timeout)?);
    client.tls = if cfg.defaults.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca) = cfg.defaults.ca_cert {
        TlsMode::CustomCa(ca.clone())
    } else {
        TlsMode::System
    };
    client.session_expiry = parse_expiry_policy(&cfg.session.expire_on)?;
    client.login_route.clone_from(&cfg.session.login_route);
    client.realtime = RealtimeSettings {
        reconnect_delay: Duration::from_millis(positive(
            "realtime.reconnect_delay_ms",
            cfg.realtime.reconnect_delay_ms,
        )?),
        heartbeat: Duration::from_millis(cfg.realtime.heartbeat_ms),
    };
    Ok(client)
}

// ── Keyring token store ─────────────────────────────────────────────

/// Access token persisted in the OS keyring under a fixed key.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
    key: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_key(KEYRING_SERVICE, TOKEN_KEY)
    }

    pub fn with_key(service: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            key: key.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, reelhouse_api::Error> {
        keyring::Entry::new(&self.service, &self.key)
            .map_err(|e| reelhouse_api::Error::TokenStore(e.to_string()))
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Option<SecretString> {
        let entry = self.entry().ok()?;
        match entry.get_password() {
            Ok(token) => Some(SecretString::from(token)),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!(error = %e, "keyring read failed");
                None
            }
        }
    }

    fn set(&self, token: &SecretString) -> Result<(), reelhouse_api::Error> {
        self.entry()?
            .set_password(token.expose_secret())
            .map_err(|e| reelhouse_api::Error::TokenStore(e.to_string()))
    }

    fn remove(&self) -> Result<(), reelhouse_api::Error> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(reelhouse_api::Error::TokenStore(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg.defaults, Defaults::default());
        assert_eq!(cfg.realtime.reconnect_delay_ms, 5_000);
        assert_eq!(cfg.session.login_route, "/login");
    }

    #[test]
    fn file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                website_url = "https://stream.example.com"

                [defaults]
                timeout = 10

                [realtime]
                heartbeat_ms = 0
                "#,
            )?;
            jail.set_env("REELHOUSE_DEFAULTS__TIMEOUT", "45");
            jail.set_env("REELHOUSE_SESSION__EXPIRE_ON", "unauthorized");

            let cfg = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(cfg.website_url.as_deref(), Some("https://stream.example.com"));
            assert_eq!(cfg.defaults.timeout, 45);
            assert_eq!(cfg.realtime.heartbeat_ms, 0);

            let client = to_client_config(&cfg).unwrap();
            assert_eq!(client.timeout, Duration::from_secs(45));
            assert_eq!(client.session_expiry, SessionExpiryPolicy::Unauthorized);
            assert_eq!(client.realtime.heartbeat, Duration::ZERO);
            Ok(())
        });
    }

    #[test]
    fn website_url_from_env_alone() {
        Jail::expect_with(|jail| {
            jail.set_env("REELHOUSE_WEBSITE_URL", "http://localhost:8080");
            let cfg = load_config_from(Path::new("nope.toml")).unwrap();
            let client = to_client_config(&cfg).unwrap();
            assert_eq!(client.website_url.as_str(), "http://localhost:8080/");
            Ok(())
        });
    }

    #[test]
    fn missing_or_bad_url_is_an_error() {
        assert!(matches!(
            to_client_config(&Config::default()),
            Err(ConfigError::MissingWebsiteUrl)
        ));

        let cfg = Config {
            website_url: Some("ftp://files.example.com".into()),
            ..Config::default()
        };
        assert!(matches!(
            to_client_config(&cfg),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn zero_timeout_or_reconnect_delay_rejected() {
        let base = Config {
            website_url: Some("https://stream.example.com".into()),
            ..Config::default()
        };

        let mut cfg = base.clone();
        cfg.defaults.timeout = 0;
        assert!(matches!(
            to_client_config(&cfg),
            Err(ConfigError::Validation { field, .. }) if field == "defaults.timeout"
        ));

        let mut cfg = base.clone();
        cfg.realtime.reconnect_delay_ms = 0;
        assert!(matches!(
            to_client_config(&cfg),
            Err(ConfigError::Validation { field, .. }) if field == "realtime.reconnect_delay_ms"
        ));

        // A zero heart-beat only switches heart-beats off.
        let mut cfg = base;
        cfg.realtime.heartbeat_ms = 0;
        assert!(to_client_config(&cfg).is_ok());
    }

    #[test]
    fn tls_selection() {
        let mut cfg = Config {
            website_url: Some("https://stream.example.com".into()),
            ..Config::default()
        };
        assert_eq!(to_client_config(&cfg).unwrap().tls, TlsMode::System);

        cfg.defaults.ca_cert = Some(PathBuf::from("/etc/ca.pem"));
        assert_eq!(
            to_client_config(&cfg).unwrap().tls,
            TlsMode::CustomCa(PathBuf::from("/etc/ca.pem"))
        );

        cfg.defaults.insecure = true;
        assert_eq!(
            to_client_config(&cfg).unwrap().tls,
            TlsMode::DangerAcceptInvalid
        );
    }

    #[test]
    fn unknown_expiry_policy_rejected() {
        let cfg = Config {
            website_url: Some("https://stream.example.com".into()),
            session: SessionSection {
                expire_on: "sometimes".into(),
                ..SessionSection::default()
            },
            ..Config::default()
        };
        assert!(to_client_config(&cfg).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            website_url: Some("https://stream.example.com".into()),
            ..Config::default()
        };
        save_config_to(&cfg, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("website_url = \"https://stream.example.com\""));

        let loaded: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .extract()
            .unwrap();
        assert_eq!(loaded, cfg);
    }
}
