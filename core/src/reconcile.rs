//! Background loop that keeps button images in line with live proxy state

use crate::{
    ContextId, ControlSurface, MonitoringRegistry, ProxyTypeResolver, ReconciledStatus, Result,
};
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Result of reconciling one button during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub context: ContextId,
    pub status: ReconciledStatus,
    /// Set when the proxy query failed
    pub error: Option<String>,
}

/// Periodically compares every monitored button against the OS and pushes
/// the matching visual state. It corrects the button, never the OS.
pub struct ReconciliationLoop {
    registry: Arc<MonitoringRegistry>,
    resolver: ProxyTypeResolver,
    surface: Arc<dyn ControlSurface>,
    interval: Duration,
}

impl ReconciliationLoop {
    pub fn new(
        registry: Arc<MonitoringRegistry>,
        resolver: ProxyTypeResolver,
        surface: Arc<dyn ControlSurface>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            resolver,
            surface,
            interval,
        }
    }

    /// Reconcile every button in a registry snapshot. A failed query marks
    /// only its own button as unmatched.
    pub fn tick(&self) -> Vec<TickOutcome> {
        let snapshot = self.registry.snapshot();
        debug!("reconciling {} button(s)", snapshot.len());

        snapshot
            .into_iter()
            .map(|config| {
                let (status, error) = match self.resolver.get(config.kind, &config.network_service) {
                    Ok(observed) => {
                        if config.kind.is_combined() && observed.is_indeterminate() {
                            debug!(
                                "{}: HTTP and HTTPS proxies on '{}' disagree",
                                config.context, config.network_service
                            );
                        }
                        (ReconciledStatus::evaluate(&config, &observed), None)
                    }
                    Err(e) => {
                        warn!(
                            "{}: failed to read {} proxy for '{}': {}",
                            config.context, config.kind, config.network_service, e
                        );
                        (ReconciledStatus::Unmatched, Some(e.to_string()))
                    }
                };

                self.surface
                    .set_visual_state(&config.context, status.visual_state());

                TickOutcome {
                    context: config.context,
                    status,
                    error,
                }
            })
            .collect()
    }

    /// Start the loop on its own thread. It sleeps for one interval, ticks,
    /// and repeats until the returned handle is shut down or dropped.
    pub fn spawn(self) -> Result<MonitorHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("proxy-monitor".to_string())
            .spawn(move || self.run(shutdown_rx))?;

        Ok(MonitorHandle {
            shutdown: shutdown_tx,
            thread,
        })
    }

    fn run(self, shutdown: mpsc::Receiver<()>) {
        info!("proxy monitor started, polling every {:?}", self.interval);
        loop {
            match shutdown.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| self.tick())) {
                error!("reconciliation tick panicked: {}", panic_message(panic.as_ref()));
            }
        }
        info!("proxy monitor stopped");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to the running monitor thread
pub struct MonitorHandle {
    shutdown: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Stop the loop and wait for it. An in-flight tick runs to completion.
    pub fn shutdown(self) {
        let _ = self.shutdown.send(());
        if self.thread.join().is_err() {
            error!("proxy monitor thread panicked");
        }
    }
}
