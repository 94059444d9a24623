//! Proxy Toggle Core Library
//!
//! This crate keeps control-surface buttons in sync with the macOS network
//! proxy configuration and toggles proxies when a button is pressed.

pub mod config;
pub mod error;
pub mod model;
pub mod networksetup;
pub mod plugin;
pub mod reconcile;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod surface;
pub mod toggle;

#[cfg(test)]
pub(crate) mod testing;

pub use config::PluginConfig;
pub use error::{Error, Result};
pub use model::*;
pub use networksetup::{NetworksetupStore, ProxyConfigStore};
pub use plugin::ProxyTogglePlugin;
pub use reconcile::{MonitorHandle, ReconciliationLoop, TickOutcome};
pub use registry::MonitoringRegistry;
pub use resolver::ProxyTypeResolver;
pub use settings::{ActionSettings, ProxyTypeField};
pub use surface::{ControlSurface, JsonLinesSurface, SurfaceCommand, SurfaceEvent};
pub use toggle::{DebounceState, ToggleController};
