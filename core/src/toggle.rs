//! User-triggered proxy on/off with press debouncing

use crate::{
    ActionSettings, ContextId, ControlSurface, DesiredProxyConfig, Error, MonitoringRegistry,
    ProxyTypeResolver, Result, VisualState,
};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};

/// 2.4 x the default poll interval
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(4800);

/// Time of the last press that reached the proxy store
#[derive(Debug, Default)]
pub struct DebounceState {
    last_trigger: Option<Instant>,
}

impl DebounceState {
    /// How long until the next press is allowed, if it is not allowed yet
    fn remaining(&self, now: Instant, threshold: Duration) -> Option<Duration> {
        let last = self.last_trigger?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < threshold).then(|| threshold - elapsed)
    }
}

/// Handles presses of one button action. The debounce window is shared by
/// every button bound to the action, not tracked per context.
pub struct ToggleController {
    resolver: ProxyTypeResolver,
    registry: Arc<MonitoringRegistry>,
    surface: Arc<dyn ControlSurface>,
    threshold: Duration,
    debounce: Mutex<DebounceState>,
}

impl ToggleController {
    pub fn new(
        resolver: ProxyTypeResolver,
        registry: Arc<MonitoringRegistry>,
        surface: Arc<dyn ControlSurface>,
        threshold: Duration,
    ) -> Self {
        Self {
            resolver,
            registry,
            surface,
            threshold,
            debounce: Mutex::new(DebounceState::default()),
        }
    }

    /// Flip the proxy for `context` based on the button's current image.
    ///
    /// On success a monitored button is switched to the new state and
    /// acknowledged, as long as the registry still holds the configuration
    /// that was pressed. Any error shows an alert and leaves the image alone.
    /// Blocks for the duration of the store calls.
    pub fn on_toggle_press(
        &self,
        context: &ContextId,
        current_state: Option<u32>,
        settings: &ActionSettings,
    ) -> Result<VisualState> {
        self.press_at(Instant::now(), context, current_state, settings)
    }

    fn press_at(
        &self,
        now: Instant,
        context: &ContextId,
        current_state: Option<u32>,
        settings: &ActionSettings,
    ) -> Result<VisualState> {
        // Held until the toggle finishes, so a press arriving while a slow
        // store call is running is rejected as well.
        let mut debounce = match self.debounce.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return self.reject(context, Error::ToggleInProgress);
            }
        };

        if let Some(remaining) = debounce.remaining(now, self.threshold) {
            return self.reject(context, Error::Debounced {
                remaining_ms: remaining.as_millis() as u64,
            });
        }

        let config = match settings.desired_config(context) {
            Ok(config) => config,
            Err(e) => return self.reject(context, e),
        };

        let state = match current_state.map(VisualState::try_from) {
            Some(Ok(state)) => state,
            Some(Err(e)) => return self.reject(context, e),
            None => return self.reject(context, Error::MissingVisualState),
        };

        let result = self.apply(&config, state, settings);
        debounce.last_trigger = Some(Instant::now().max(now));

        match result {
            Ok(new_state) => {
                info!(
                    "{}: {} proxy on '{}' is now {}",
                    context,
                    config.kind.display_name(),
                    config.network_service,
                    new_state.display_name().to_lowercase()
                );
                // The button may have gone away or been reconfigured while
                // the store call ran; its image then belongs to the monitor.
                if self.registry.is_current(&config) {
                    self.surface.set_visual_state(context, new_state);
                    self.surface.acknowledge(context);
                } else {
                    debug!("{}: settings changed during toggle, image left alone", context);
                }
                Ok(new_state)
            }
            Err(e) => self.reject(context, e),
        }
    }

    fn apply(
        &self,
        config: &DesiredProxyConfig,
        state: VisualState,
        settings: &ActionSettings,
    ) -> Result<VisualState> {
        match state {
            VisualState::Enabled => {
                self.resolver
                    .set_enabled(config.kind, &config.network_service, false)?;
                Ok(VisualState::Disabled)
            }
            VisualState::Disabled => {
                let credentials = settings.credentials();
                self.resolver.set(
                    config.kind,
                    &config.network_service,
                    &config.domain,
                    &config.port,
                    credentials.as_ref(),
                )?;
                Ok(VisualState::Enabled)
            }
        }
    }

    fn reject(&self, context: &ContextId, error: Error) -> Result<VisualState> {
        warn!("{}: toggle rejected: {}", context, error);
        self.surface.alert(context);
        Err(error)
    }
}
