use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Config ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Debug & logging
    pub log_level: String,
    pub logging_to_file: bool,
    pub log_dir: Option<String>,

    // Request identity
    pub session: SessionConfig,
    pub auth: AuthConfig,

    // Diagnostic context init params (ipKey, userKey, userSessionAttribute, usePrincipal)
    pub user_logging: BTreeMap<String, serde_yaml_ng::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8318,
            log_level: "info".to_string(),
            logging_to_file: false,
            log_dir: None,
            session: SessionConfig::default(),
            auth: AuthConfig::default(),
            user_logging: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load config from a YAML file.
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml_ng::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the `user-logging` section against the defaults.
    pub fn user_logging(&self) -> UserLoggingConfig {
        UserLoggingConfig::from_init_params(
            self.user_logging
                .iter()
                .filter_map(|(name, value)| Some((name.as_str(), init_param(value)?))),
        )
    }

    /// Set a `user-logging` init param as a string value.
    pub fn set_init_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.user_logging
            .insert(name.into(), serde_yaml_ng::Value::String(value.into()));
    }
}

/// String form of a scalar init param. Null and non-scalar values are absent.
fn init_param(value: &serde_yaml_ng::Value) -> Option<String> {
    use serde_yaml_ng::Value;

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => init_param(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

// ─── Sub-configs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Sessions untouched for this long are dropped.
    pub idle_timeout_secs: u64,
    pub max_sessions: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "LOGGATE_SESSION".to_string(),
            idle_timeout_secs: 1800,
            max_sessions: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens. No principal is ever established when unset.
    pub jwt_secret: Option<String>,
    pub jwt_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_ttl_secs: 3600,
        }
    }
}

// ─── User logging ──────────────────────────────────────────────────────────

pub const DEFAULT_IP_KEY: &str = "ip";
pub const DEFAULT_USER_KEY: &str = "username";
pub const DEFAULT_USER_SESSION_ATTRIBUTE: &str = "username";

pub const PARAM_IP_KEY: &str = "ipKey";
pub const PARAM_USER_KEY: &str = "userKey";
pub const PARAM_USER_SESSION_ATTRIBUTE: &str = "userSessionAttribute";
pub const PARAM_USE_PRINCIPAL: &str = "usePrincipal";

/// Settings for the user logging layer, fixed once resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserLoggingConfig {
    /// MDC key for the client address.
    pub ip_key: String,
    /// MDC key for the username.
    pub user_key: String,
    /// Session attribute holding the username. Ignored when `use_principal` is set.
    pub user_session_attribute: String,
    /// Read the username from the authenticated principal instead of the session.
    pub use_principal: bool,
}

impl Default for UserLoggingConfig {
    fn default() -> Self {
        Self {
            ip_key: DEFAULT_IP_KEY.to_string(),
            user_key: DEFAULT_USER_KEY.to_string(),
            user_session_attribute: DEFAULT_USER_SESSION_ATTRIBUTE.to_string(),
            use_principal: false,
        }
    }
}

/// Where the username comes from on each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameSource {
    Principal,
    SessionAttribute(String),
}

impl UserLoggingConfig {
    /// Build from named init parameters. Blank or missing values keep the
    /// default, unknown names are ignored, and nothing here ever fails.
    pub fn from_init_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (name, value) in params {
            let value = value.as_ref();
            match name.as_ref() {
                PARAM_IP_KEY => override_if_not_blank(&mut config.ip_key, value),
                PARAM_USER_KEY => override_if_not_blank(&mut config.user_key, value),
                PARAM_USER_SESSION_ATTRIBUTE => {
                    override_if_not_blank(&mut config.user_session_attribute, value)
                }
                PARAM_USE_PRINCIPAL => {
                    if let Some(flag) = parse_bool(value) {
                        config.use_principal = flag;
                    }
                }
                other => tracing::debug!(param = other, "Ignoring unknown user logging param"),
            }
        }
        config
    }

    pub fn username_source(&self) -> UsernameSource {
        if self.use_principal {
            UsernameSource::Principal
        } else {
            UsernameSource::SessionAttribute(self.user_session_attribute.clone())
        }
    }
}

fn override_if_not_blank(slot: &mut String, value: &str) {
    if !value.trim().is_empty() {
        *slot = value.to_string();
    }
}

/// Lenient boolean parsing: `true/on/yes/y/t` and `false/off/no/n/f`,
/// case-insensitive. Anything else is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "y" | "t" => Some(true),
        "false" | "off" | "no" | "n" | "f" => Some(false),
        _ => None,
    }
}
