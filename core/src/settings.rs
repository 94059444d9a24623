//! Per-button settings as persisted by the control surface

use crate::{ContextId, Credentials, DesiredProxyConfig, Error, LogicalProxyKind, Result};
use serde::{Deserialize, Serialize};

/// The proxy type field. The settings form stores it as
/// `[available_options, selected]`; older settings hold just the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyTypeField {
    Selection(Vec<String>, Option<String>),
    Bare(Option<String>),
}

impl Default for ProxyTypeField {
    fn default() -> Self {
        ProxyTypeField::Bare(None)
    }
}

impl ProxyTypeField {
    pub fn selected(&self) -> Option<&str> {
        let selected = match self {
            ProxyTypeField::Selection(_, selected) => selected.as_deref(),
            ProxyTypeField::Bare(selected) => selected.as_deref(),
        };
        selected.map(str::trim).filter(|s| !s.is_empty())
    }
}

impl From<LogicalProxyKind> for ProxyTypeField {
    fn from(kind: LogicalProxyKind) -> Self {
        ProxyTypeField::Bare(Some(kind.as_str().to_string()))
    }
}

/// Settings saved for one button
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    pub networkservice: String,
    pub proxy_type: ProxyTypeField,
    pub domain: String,
    pub port: String,
    pub username: String,
    pub password: String,
}

impl ActionSettings {
    pub fn kind(&self) -> Option<LogicalProxyKind> {
        self.proxy_type.selected().and_then(|s| s.parse().ok())
    }

    /// Build the monitoring target for this button. Every missing or
    /// unusable field is reported at once.
    pub fn desired_config(&self, context: &ContextId) -> Result<DesiredProxyConfig> {
        let network_service = self.networkservice.trim();
        let domain = self.domain.trim();
        let port = self.port.trim();
        let kind = self.kind();

        let mut missing = Vec::new();
        if network_service.is_empty() {
            missing.push("networkservice");
        }
        if kind.is_none() {
            missing.push("proxy_type");
        }
        if domain.is_empty() {
            missing.push("domain");
        }
        if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            missing.push("port");
        }

        match kind {
            Some(kind) if missing.is_empty() => Ok(DesiredProxyConfig::new(
                context.clone(),
                network_service,
                kind,
                domain,
                port,
            )),
            _ => Err(Error::IncompleteConfiguration(missing)),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(&self.username, &self.password)
    }
}
