use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::provider_interface::ProviderError;
use crate::domain::value_objects::provider_kind::ProviderKind;

/// Typed provider configuration as written in `depsync.yaml`
///
/// ```yaml
/// providers:
///   - kind: git
///     name: hub
///     host: https://git.example.com/libs
///     query:
///       type: github
///       org_name: example
///   - kind: archive
///     name: prebuilt
///     host: https://files.example.com/packages
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Git(GitProviderConfig),
    #[serde(alias = "http")]
    Archive(ArchiveProviderConfig),
}

impl ProviderConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Git(config) => &config.name,
            Self::Archive(config) => &config.name,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Git(_) => ProviderKind::Git,
            Self::Archive(_) => ProviderKind::Archive,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct GitProviderConfig {
    #[validate(length(min = 1))]
    pub name: String,

    /// Base url under which `<name>.git` repositories live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default)]
    pub anonymous: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfig>,
}

impl GitProviderConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
            ..Default::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_query(mut self, query: QueryConfig) -> Self {
        self.query = Some(query);
        self
    }

    /// Validate the configuration and return the required host
    pub fn validated_host(&self) -> Result<String, ProviderError> {
        let host = required_host(&self.name, self.host.as_deref())?;
        self.validate()
            .map_err(|errors| validation_error(&self.name, &errors))?;
        if let Some(QueryConfig::Github(github)) = &self.query {
            github
                .validate()
                .map_err(|errors| validation_error(&self.name, &errors))?;
        }
        Ok(host)
    }
}

/// Remote listing backend of a git provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueryConfig {
    Github(GithubQueryConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct GithubQueryConfig {
    #[validate(length(min = 1))]
    pub org_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// API root, `https://api.github.com` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ArchiveProviderConfig {
    #[validate(length(min = 1))]
    pub name: String,

    /// Base url; packages live under `<host>/<platform>/<name>/<version>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub host: Option<String>,

    /// Platform folder, the current OS when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ArchiveProviderConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
            platform: None,
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn validated_host(&self) -> Result<String, ProviderError> {
        let host = required_host(&self.name, self.host.as_deref())?;
        self.validate()
            .map_err(|errors| validation_error(&self.name, &errors))?;
        Ok(host)
    }

    pub fn platform(&self) -> String {
        self.platform.clone().unwrap_or_else(current_platform)
    }
}

/// Platform folder name of the running OS
pub fn current_platform() -> String {
    if cfg!(windows) {
        "win32".to_string()
    } else {
        std::env::consts::OS.to_string()
    }
}

fn required_host(provider: &str, host: Option<&str>) -> Result<String, ProviderError> {
    match host.map(str::trim) {
        Some(host) if !host.is_empty() => Ok(host.trim_end_matches('/').to_string()),
        _ => Err(ProviderError::missing_param(provider, "host")),
    }
}

fn validation_error(provider: &str, errors: &ValidationErrors) -> ProviderError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    ProviderError::invalid_param(provider, fields.join(", "), errors.to_string())
}
