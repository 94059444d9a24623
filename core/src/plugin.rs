//! Surface event dispatch for the connect/disconnect button action

use crate::networksetup::ProxyConfigStore;
use crate::reconcile::{MonitorHandle, ReconciliationLoop};
use crate::surface::{ControlSurface, SurfaceEvent};
use crate::toggle::ToggleController;
use crate::{
    ActionSettings, ContextId, MonitoringRegistry, PluginConfig, ProxyTypeResolver, Result,
    VisualState,
};
use log::{debug, error, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Wires the registry, toggle controller and monitor to one surface
pub struct ProxyTogglePlugin {
    registry: Arc<MonitoringRegistry>,
    resolver: ProxyTypeResolver,
    controller: Arc<ToggleController>,
    surface: Arc<dyn ControlSurface>,
    poll_interval: Duration,
    default_network_service: Option<String>,
}

impl ProxyTogglePlugin {
    pub fn new(
        store: Arc<dyn ProxyConfigStore>,
        surface: Arc<dyn ControlSurface>,
        config: &PluginConfig,
    ) -> Self {
        let registry = Arc::new(MonitoringRegistry::new());
        let resolver = ProxyTypeResolver::new(store);
        let controller = Arc::new(ToggleController::new(
            resolver.clone(),
            registry.clone(),
            surface.clone(),
            config.debounce(),
        ));

        Self {
            registry,
            resolver,
            controller,
            surface,
            poll_interval: config.poll_interval(),
            default_network_service: config.default_network_service().map(str::to_string),
        }
    }

    pub fn registry(&self) -> &Arc<MonitoringRegistry> {
        &self.registry
    }

    /// Build a reconciliation loop over this plugin's registry
    pub fn monitor(&self) -> ReconciliationLoop {
        ReconciliationLoop::new(
            self.registry.clone(),
            self.resolver.clone(),
            self.surface.clone(),
            self.poll_interval,
        )
    }

    /// Launch the background monitor. Call once per process.
    pub fn start_monitoring(&self) -> Result<MonitorHandle> {
        self.monitor().spawn()
    }

    /// Route one surface event. Key presses run on their own thread and
    /// the handle is returned.
    pub fn handle_event(&self, event: SurfaceEvent) -> Option<JoinHandle<()>> {
        match event {
            SurfaceEvent::KeyDown { context, payload } => {
                match self.on_key_down(context, payload.settings, payload.state) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        error!("failed to start toggle worker: {}", e);
                        None
                    }
                }
            }
            SurfaceEvent::WillAppear { context, payload } => {
                self.on_will_appear(&context, payload.settings);
                None
            }
            SurfaceEvent::DidReceiveSettings { context, payload } => {
                if let Some(settings) = payload.settings {
                    self.on_settings_changed(&context, settings);
                }
                None
            }
            SurfaceEvent::WillDisappear { context, .. } => {
                self.on_will_disappear(&context);
                None
            }
            SurfaceEvent::Unsupported => None,
        }
    }

    pub fn on_will_appear(&self, context: &ContextId, settings: Option<ActionSettings>) {
        match settings {
            Some(settings) => self.track(context, settings),
            None => {
                debug!("{}: appeared without settings, requesting them", context);
                self.surface.get_persisted_settings(context);
            }
        }
    }

    pub fn on_settings_changed(&self, context: &ContextId, settings: ActionSettings) {
        self.track(context, settings);
    }

    pub fn on_will_disappear(&self, context: &ContextId) {
        if self.registry.remove(context).is_some() {
            debug!("{}: no longer monitored", context);
        }
    }

    /// Toggle the proxy on a worker thread so store calls never hold up
    /// event delivery.
    ///
    /// The pressed configuration is registered here, in event order, so a
    /// disappear or settings change that arrives while the worker runs wins.
    pub fn on_key_down(
        &self,
        context: ContextId,
        settings: Option<ActionSettings>,
        state: Option<u32>,
    ) -> Result<JoinHandle<()>> {
        let (settings, _) = self.with_defaults(settings.unwrap_or_default());
        if let Ok(config) = settings.desired_config(&context) {
            self.registry.upsert(config);
        }
        let controller = self.controller.clone();
        let handle = thread::Builder::new()
            .name("proxy-toggle".to_string())
            .spawn(move || {
                let _ = controller.on_toggle_press(&context, state, &settings);
            })?;
        Ok(handle)
    }

    /// Monitor a complete configuration; an incomplete one is dropped from
    /// monitoring and the button is forced to disabled.
    fn track(&self, context: &ContextId, settings: ActionSettings) {
        let (settings, filled) = self.with_defaults(settings);
        if filled {
            info!(
                "{}: using default network service '{}'",
                context, settings.networkservice
            );
            self.surface.set_persisted_settings(context, &settings);
        }

        match settings.desired_config(context) {
            Ok(config) => {
                debug!(
                    "{}: monitoring {} proxy {}:{} on '{}'",
                    context, config.kind, config.domain, config.port, config.network_service
                );
                self.registry.upsert(config);
            }
            Err(e) => {
                debug!("{}: not monitored: {}", context, e);
                self.registry.remove(context);
                self.surface.set_visual_state(context, VisualState::Disabled);
            }
        }
    }

    fn with_defaults(&self, mut settings: ActionSettings) -> (ActionSettings, bool) {
        match &self.default_network_service {
            Some(service) if settings.networkservice.trim().is_empty() => {
                settings.networkservice = service.clone();
                (settings, true)
            }
            _ => (settings, false),
        }
    }
}
