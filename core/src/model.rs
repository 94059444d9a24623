//! Domain model types for Proxy Toggle

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one button instance on the control surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContextId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single proxy protocol the OS stores settings for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubProtocol {
    Http,
    Https,
    Socks,
}

impl SubProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubProtocol::Http => "http",
            SubProtocol::Https => "https",
            SubProtocol::Socks => "socks",
        }
    }
}

/// User-facing proxy category selected in a button's settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalProxyKind {
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "https")]
    Https,
    #[serde(rename = "socks")]
    Socks,
    #[serde(rename = "http(s)")]
    HttpAndHttps,
}

impl LogicalProxyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalProxyKind::Http => "http",
            LogicalProxyKind::Https => "https",
            LogicalProxyKind::Socks => "socks",
            LogicalProxyKind::HttpAndHttps => "http(s)",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LogicalProxyKind::Http => "HTTP",
            LogicalProxyKind::Https => "HTTPS",
            LogicalProxyKind::Socks => "SOCKS",
            LogicalProxyKind::HttpAndHttps => "HTTP + HTTPS",
        }
    }

    /// The OS-level protocols this kind is made of, in the order they are applied
    pub fn sub_protocols(&self) -> &'static [SubProtocol] {
        match self {
            LogicalProxyKind::Http => &[SubProtocol::Http],
            LogicalProxyKind::Https => &[SubProtocol::Https],
            LogicalProxyKind::Socks => &[SubProtocol::Socks],
            LogicalProxyKind::HttpAndHttps => &[SubProtocol::Http, SubProtocol::Https],
        }
    }

    pub fn is_combined(&self) -> bool {
        self.sub_protocols().len() > 1
    }
}

impl fmt::Display for LogicalProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalProxyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(LogicalProxyKind::Http),
            "https" => Ok(LogicalProxyKind::Https),
            "socks" => Ok(LogicalProxyKind::Socks),
            "http(s)" | "http+https" | "http_and_https" => Ok(LogicalProxyKind::HttpAndHttps),
            other => Err(Error::config(format!("Unknown proxy type '{}'", other))),
        }
    }
}

/// Proxy credentials, only ever held for the duration of a toggle
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Both parts must be non-empty, otherwise authentication stays off
    pub fn from_parts(username: &str, password: &str) -> Option<Self> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a button wants the OS proxy configuration to look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredProxyConfig {
    pub context: ContextId,
    pub network_service: String,
    pub kind: LogicalProxyKind,
    pub domain: String,
    pub port: String,
}

impl DesiredProxyConfig {
    pub fn new(
        context: impl Into<ContextId>,
        network_service: impl Into<String>,
        kind: LogicalProxyKind,
        domain: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            network_service: network_service.into(),
            kind,
            domain: domain.into(),
            port: port.into(),
        }
    }

    pub fn is_satisfied_by(&self, observed: &ObservedProxyState) -> bool {
        observed.enabled
            && observed.server.as_deref() == Some(self.domain.as_str())
            && observed.port.as_deref() == Some(self.port.as_str())
    }
}

/// Live proxy state as reported by the OS for one query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedProxyState {
    pub enabled: bool,
    /// `None` when the value could not be determined
    pub server: Option<String>,
    pub port: Option<String>,
}

impl ObservedProxyState {
    pub fn new(enabled: bool, server: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            enabled,
            server: Some(server.into()),
            port: Some(port.into()),
        }
    }

    /// Outcome of a combined HTTP/HTTPS query whose halves disagree
    pub fn indeterminate() -> Self {
        Self::default()
    }

    pub fn is_indeterminate(&self) -> bool {
        self.server.is_none() && self.port.is_none()
    }
}

/// Whether live state matches what a button asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciledStatus {
    Matched,
    Unmatched,
}

impl ReconciledStatus {
    pub fn evaluate(desired: &DesiredProxyConfig, observed: &ObservedProxyState) -> Self {
        if desired.is_satisfied_by(observed) {
            ReconciledStatus::Matched
        } else {
            ReconciledStatus::Unmatched
        }
    }

    pub fn visual_state(&self) -> VisualState {
        match self {
            ReconciledStatus::Matched => VisualState::Enabled,
            ReconciledStatus::Unmatched => VisualState::Disabled,
        }
    }
}

/// Button image state, numbered the way the surface numbers its states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualState {
    #[default]
    Disabled,
    Enabled,
}

impl VisualState {
    pub fn as_raw(&self) -> u32 {
        match self {
            VisualState::Disabled => 0,
            VisualState::Enabled => 1,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VisualState::Disabled => "Disabled",
            VisualState::Enabled => "Enabled",
        }
    }
}

impl TryFrom<u32> for VisualState {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(VisualState::Disabled),
            1 => Ok(VisualState::Enabled),
            other => Err(Error::InvalidVisualState(other)),
        }
    }
}

/// A network service known to the OS, in service order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkService {
    pub index: u32,
    pub name: String,
    pub hardware_port: String,
    pub device: String,
}
