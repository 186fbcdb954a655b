use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::allow_list::DEFAULT_ORGANIZATION_DOMAIN;

/// Optional JSON settings file referenced by `MAILGUARD_CONFIG`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GuardSettings {
    /// Domain used for the default allow-list.
    #[serde(default, alias = "organizationDomain")]
    pub organization_domain: Option<String>,
    /// Comma separated allow-list, same syntax as
    /// `MAILGUARD_ALLOWED_RECIPIENTS`.
    #[serde(default, alias = "allowedRecipients")]
    pub allowed_recipients: Option<String>,
    /// Plugin identifiers disabled in addition to the built-in list.
    #[serde(default, alias = "disabledPlugins")]
    pub disabled_plugins: Vec<String>,
}

/// Inputs read once at activation.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub allowed_recipients: Option<String>,
    pub force: bool,
    pub site_identity: Option<String>,
    pub organization_domain: String,
    pub disabled_plugins: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            allowed_recipients: None,
            force: false,
            site_identity: None,
            organization_domain: DEFAULT_ORGANIZATION_DOMAIN.to_owned(),
            disabled_plugins: Vec::new(),
        }
    }
}

impl GuardConfig {
    pub fn from_env() -> Result<Self> {
        let settings = if let Ok(path) = env::var("MAILGUARD_CONFIG") {
            let content = fs::read_to_string(&path).with_context(|| {
                format!("Failed to read MAILGUARD_CONFIG '{}': file unreadable", path)
            })?;
            serde_json::from_str::<GuardSettings>(&content).with_context(|| {
                format!(
                    "Failed to parse MAILGUARD_CONFIG '{}': invalid JSON configuration",
                    path
                )
            })?
        } else {
            GuardSettings::default()
        };

        // A set but blank allow-list is kept so activation rejects it.
        let allowed_recipients =
            present_string("MAILGUARD_ALLOWED_RECIPIENTS")?.or(settings.allowed_recipients);
        let force = parse_bool_env("MAILGUARD_FORCE")?.unwrap_or(false);
        let site_identity = match optional_string("MAILGUARD_SITE_URL")? {
            Some(url) => Some(url),
            None => optional_string("SERVER_NAME")?,
        };
        let organization_domain = optional_string("MAILGUARD_ORGANIZATION_DOMAIN")?
            .or(settings.organization_domain)
            .unwrap_or_else(|| DEFAULT_ORGANIZATION_DOMAIN.to_owned());

        Ok(Self {
            allowed_recipients,
            force,
            site_identity,
            organization_domain,
            disabled_plugins: settings.disabled_plugins,
        })
    }
}

fn optional_string(var: &str) -> Result<Option<String>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow!("{} is not valid unicode: {}", var, err)),
    }
}

fn present_string(var: &str) -> Result<Option<String>> {
    match env::var(var) {
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow!("{} is not valid unicode: {}", var, err)),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
