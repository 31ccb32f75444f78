//! Configuration for the scoring client.
//!
//! Each value is resolved in the following order:
//! 1. Explicit option set on [`ScoringOptions`]
//! 2. Service binding (`VCAP_SERVICES`, first `pm-20` entry)
//! 3. Environment variable (`WML_*`)
//! 4. Built-in default (service path only)
//!
//! Empty strings count as unset at every level.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::retry::RetryConfig;
use crate::{Result, ScoringError};

/// Service path used when none is configured.
pub const DEFAULT_SERVICE_PATH: &str = "https://ibm-watson-ml.mybluemix.net";

/// Environment variable carrying the platform service bindings.
pub const SERVICE_BINDING_ENV: &str = "VCAP_SERVICES";

/// Service label of Watson Machine Learning in a binding payload.
const SERVICE_BINDING_LABEL: &str = "pm-20";

pub const SERVICE_PATH_ENV: &str = "WML_SERVICE_PATH";
pub const USERNAME_ENV: &str = "WML_USERNAME";
pub const PASSWORD_ENV: &str = "WML_PASSWORD";
pub const INSTANCE_ID_ENV: &str = "WML_INSTANCE_ID";
pub const MODEL_ID_ENV: &str = "WML_MODEL_ID";
pub const DEPLOYMENT_ID_ENV: &str = "WML_DEPLOYMENT_ID";
pub const MODEL_NAME_ENV: &str = "WML_MODEL_NAME";
pub const DEPLOYMENT_NAME_ENV: &str = "WML_DEPLOYMENT_NAME";

/// Explicit options for a [`ScoringClient`](crate::ScoringClient).
///
/// Every field is optional; unset values fall back to the service binding,
/// then the environment.
///
/// ```rust
/// # use wml_scoring::ScoringOptions;
/// let options = ScoringOptions::new()
///     .username("apikey")
///     .password("secret")
///     .instance_id("0f5c")
///     .model_name("churn-model")
///     .deployment_name("prod");
/// ```
#[derive(Clone, Default)]
pub struct ScoringOptions {
    pub service_path: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub instance_id: Option<String>,
    pub model_id: Option<String>,
    pub deployment_id: Option<String>,
    pub model_name: Option<String>,
    pub deployment_name: Option<String>,
    /// Token-rejection retry policy. Default: 3 attempts, no delay.
    pub retry: RetryConfig,
    /// Per-request HTTP timeout. Default: none.
    pub timeout: Option<Duration>,
}

impl ScoringOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_path(mut self, path: impl Into<String>) -> Self {
        self.service_path = Some(path.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    pub fn model_id(mut self, id: impl Into<String>) -> Self {
        self.model_id = Some(id.into());
        self
    }

    pub fn deployment_id(mut self, id: impl Into<String>) -> Self {
        self.deployment_id = Some(id.into());
        self
    }

    /// Look the model up by name on first use instead of by ID.
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    /// Restrict name lookup to the online deployment with this name.
    pub fn deployment_name(mut self, name: impl Into<String>) -> Self {
        self.deployment_name = Some(name.into());
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    ///
    /// `env` is consulted both for `WML_*` variables and for
    /// [`SERVICE_BINDING_ENV`].
    pub fn resolve_with<F>(&self, env: F) -> Result<ResolvedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let binding = match non_empty(env(SERVICE_BINDING_ENV)) {
            Some(raw) => BindingCredentials::from_payload(&raw)?,
            None => BindingCredentials::default(),
        };

        let lookup = |explicit: &Option<String>, bound: &Option<String>, var: &str| {
            non_empty(explicit.clone())
                .or_else(|| non_empty(bound.clone()))
                .or_else(|| non_empty(env(var)))
        };

        let service_path = lookup(&self.service_path, &binding.url, SERVICE_PATH_ENV)
            .unwrap_or_else(|| DEFAULT_SERVICE_PATH.to_string());
        let username = lookup(&self.username, &binding.username, USERNAME_ENV)
            .ok_or_else(|| ScoringError::missing("username"))?;
        let password = lookup(&self.password, &binding.password, PASSWORD_ENV)
            .ok_or_else(|| ScoringError::missing("password"))?;
        let instance_id = lookup(&self.instance_id, &binding.instance_id, INSTANCE_ID_ENV)
            .ok_or_else(|| ScoringError::missing("instance_id"))?;

        let unbound = None;
        let model_id = lookup(&self.model_id, &unbound, MODEL_ID_ENV);
        let deployment_id = lookup(&self.deployment_id, &unbound, DEPLOYMENT_ID_ENV);
        let model_name = lookup(&self.model_name, &unbound, MODEL_NAME_ENV);
        let deployment_name = lookup(&self.deployment_name, &unbound, DEPLOYMENT_NAME_ENV);

        let target = match (model_id, deployment_id, model_name) {
            (Some(model_id), Some(deployment_id), _) => ModelTarget::Ids {
                model_id,
                deployment_id,
            },
            (_, _, Some(model_name)) => ModelTarget::Name {
                model_name,
                deployment_name,
            },
            (None, _, None) => return Err(ScoringError::missing("model_id")),
            (Some(_), None, None) => return Err(ScoringError::missing("deployment_id")),
        };

        Ok(ResolvedConfig {
            service_path,
            username,
            password,
            instance_id,
            target,
            retry: self.retry.clone(),
            timeout: self.timeout,
        })
    }
}

impl fmt::Debug for ScoringOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringOptions")
            .field("service_path", &self.service_path)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("instance_id", &self.instance_id)
            .field("model_id", &self.model_id)
            .field("deployment_id", &self.deployment_id)
            .field("model_name", &self.model_name)
            .field("deployment_name", &self.deployment_name)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Which model/deployment to score against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelTarget {
    /// Identifiers known up front; the scoring URL is built at construction.
    Ids {
        model_id: String,
        deployment_id: String,
    },
    /// Identifiers looked up by name on first use.
    Name {
        model_name: String,
        deployment_name: Option<String>,
    },
}

/// Fully resolved, validated configuration.
#[derive(Clone)]
pub struct ResolvedConfig {
    /// Service base URL, as configured.
    pub service_path: String,
    pub username: String,
    pub password: String,
    pub instance_id: String,
    pub target: ModelTarget,
    pub retry: RetryConfig,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("service_path", &self.service_path)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("instance_id", &self.instance_id)
            .field("target", &self.target)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Credentials pulled from a service binding payload.
#[derive(Debug, Clone, Default, Deserialize)]
struct BindingCredentials {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    instance_id: Option<String>,
}

#[derive(Deserialize)]
struct ServiceBinding {
    #[serde(default)]
    credentials: Option<BindingCredentials>,
    #[serde(flatten)]
    inline: BindingCredentials,
}

impl BindingCredentials {
    /// Extract the first `pm-20` binding. Payloads without one yield no
    /// credentials; payloads that are not JSON are an error.
    fn from_payload(raw: &str) -> Result<Self> {
        let services: Value = serde_json::from_str(raw).map_err(|e| {
            ScoringError::Configuration(format!("failed to parse {SERVICE_BINDING_ENV}: {e}"))
        })?;

        let Some(entry) = services
            .get(SERVICE_BINDING_LABEL)
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
        else {
            return Ok(Self::default());
        };

        let binding: ServiceBinding = serde_json::from_value(entry.clone()).map_err(|e| {
            ScoringError::Configuration(format!("failed to parse {SERVICE_BINDING_ENV}: {e}"))
        })?;
        let Some(credentials) = binding.credentials else {
            return Ok(Self::default());
        };
        let inline = binding.inline;

        Ok(Self {
            url: credentials.url.or(inline.url),
            username: credentials.username.or(inline.username),
            password: credentials.password.or(inline.password),
            instance_id: credentials.instance_id.or(inline.instance_id),
        })
    }
}
