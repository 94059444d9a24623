//! In-memory store and recording surface for unit tests

use crate::networksetup::ProxyConfigStore;
use crate::{
    ActionSettings, ContextId, ControlSurface, Credentials, Error, NetworkService,
    ObservedProxyState, Result, SubProtocol, VisualState,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get {
        protocol: SubProtocol,
        service: String,
    },
    Set {
        protocol: SubProtocol,
        service: String,
        domain: String,
        port: String,
        authenticated: bool,
    },
    SetEnabled {
        protocol: SubProtocol,
        service: String,
        enabled: bool,
    },
}

impl StoreCall {
    pub fn protocol(&self) -> SubProtocol {
        match self {
            StoreCall::Get { protocol, .. }
            | StoreCall::Set { protocol, .. }
            | StoreCall::SetEnabled { protocol, .. } => *protocol,
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreCall::Get { .. })
    }
}

#[derive(Default)]
struct StoreState {
    proxies: HashMap<(SubProtocol, String), ObservedProxyState>,
    protocol_failures: HashMap<SubProtocol, String>,
    service_failures: HashMap<String, String>,
    calls: Vec<StoreCall>,
    delay: Option<Duration>,
}

/// Proxy store kept in memory, with failure injection
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MemoryStore {
    pub fn put(&self, protocol: SubProtocol, service: &str, state: ObservedProxyState) {
        lock(&self.state)
            .proxies
            .insert((protocol, service.to_string()), state);
    }

    /// Make every call for `protocol` fail with `message`
    pub fn fail(&self, protocol: SubProtocol, message: &str) {
        lock(&self.state)
            .protocol_failures
            .insert(protocol, message.to_string());
    }

    /// Make every call for `service` fail with `message`
    pub fn fail_service(&self, service: &str, message: &str) {
        lock(&self.state)
            .service_failures
            .insert(service.to_string(), message.to_string());
    }

    pub fn heal(&self) {
        let mut state = lock(&self.state);
        state.protocol_failures.clear();
        state.service_failures.clear();
    }

    /// Sleep this long inside every mutating call
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.state).calls.clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_mutation).collect()
    }

    fn record(&self, protocol: SubProtocol, service: &str, call: StoreCall) -> Result<()> {
        let delay = {
            let mut state = lock(&self.state);
            state.calls.push(call.clone());
            if let Some(message) = state.protocol_failures.get(&protocol) {
                return Err(Error::backend(message.clone()));
            }
            if let Some(message) = state.service_failures.get(service) {
                return Err(Error::backend(message.clone()));
            }
            state.delay
        };
        if let (Some(delay), true) = (delay, call.is_mutation()) {
            std::thread::sleep(delay);
        }
        Ok(())
    }
}

impl ProxyConfigStore for MemoryStore {
    fn get(&self, protocol: SubProtocol, service: &str) -> Result<ObservedProxyState> {
        self.record(
            protocol,
            service,
            StoreCall::Get {
                protocol,
                service: service.to_string(),
            },
        )?;
        Ok(lock(&self.state)
            .proxies
            .get(&(protocol, service.to_string()))
            .cloned()
            .unwrap_or_else(|| ObservedProxyState::new(false, "", "0")))
    }

    fn set(
        &self,
        protocol: SubProtocol,
        service: &str,
        domain: &str,
        port: &str,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        self.record(
            protocol,
            service,
            StoreCall::Set {
                protocol,
                service: service.to_string(),
                domain: domain.to_string(),
                port: port.to_string(),
                authenticated: credentials.is_some(),
            },
        )?;
        self.put(protocol, service, ObservedProxyState::new(true, domain, port));
        Ok(())
    }

    fn set_enabled(&self, protocol: SubProtocol, service: &str, enabled: bool) -> Result<()> {
        self.record(
            protocol,
            service,
            StoreCall::SetEnabled {
                protocol,
                service: service.to_string(),
                enabled,
            },
        )?;
        let mut state = lock(&self.state);
        let entry = state
            .proxies
            .entry((protocol, service.to_string()))
            .or_insert_with(|| ObservedProxyState::new(false, "", "0"));
        entry.enabled = enabled;
        Ok(())
    }

    fn list_network_services(&self) -> Result<Vec<NetworkService>> {
        Ok(vec![NetworkService {
            index: 1,
            name: "Wi-Fi".to_string(),
            hardware_port: "Wi-Fi".to_string(),
            device: "en0".to_string(),
        }])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    SetState(ContextId, VisualState),
    Acknowledge(ContextId),
    Alert(ContextId),
    GetSettings(ContextId),
    SetSettings(ContextId, ActionSettings),
}

/// Surface that remembers every call
#[derive(Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_for(&self, context: &str) -> Vec<SurfaceCall> {
        self.calls()
            .into_iter()
            .filter(|call| match call {
                SurfaceCall::SetState(c, _)
                | SurfaceCall::Acknowledge(c)
                | SurfaceCall::Alert(c)
                | SurfaceCall::GetSettings(c)
                | SurfaceCall::SetSettings(c, _) => c.as_str() == context,
            })
            .collect()
    }

    pub fn last_state(&self, context: &str) -> Option<VisualState> {
        self.calls_for(context).into_iter().rev().find_map(|call| match call {
            SurfaceCall::SetState(_, state) => Some(state),
            _ => None,
        })
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }

    fn push(&self, call: SurfaceCall) {
        lock(&self.calls).push(call);
    }
}

impl ControlSurface for RecordingSurface {
    fn set_visual_state(&self, context: &ContextId, state: VisualState) {
        self.push(SurfaceCall::SetState(context.clone(), state));
    }

    fn acknowledge(&self, context: &ContextId) {
        self.push(SurfaceCall::Acknowledge(context.clone()));
    }

    fn alert(&self, context: &ContextId) {
        self.push(SurfaceCall::Alert(context.clone()));
    }

    fn get_persisted_settings(&self, context: &ContextId) {
        self.push(SurfaceCall::GetSettings(context.clone()));
    }

    fn set_persisted_settings(&self, context: &ContextId, settings: &ActionSettings) {
        self.push(SurfaceCall::SetSettings(context.clone(), settings.clone()));
    }
}
