//! Mapping of logical proxy kinds onto per-protocol store calls

use crate::networksetup::ProxyConfigStore;
use crate::{Credentials, Error, LogicalProxyKind, ObservedProxyState, Result, SubProtocol};
use std::sync::Arc;

/// Applies and reads a [`LogicalProxyKind`] against a [`ProxyConfigStore`].
///
/// Simple kinds map 1:1 onto their protocol. The combined HTTP + HTTPS kind
/// is the same operation run over both protocols:
///
/// - mutations run on every protocol in order; all failures are collected
///   into one error and nothing is rolled back
/// - reads succeed as enabled only when both halves are enabled and agree on
///   server and port, otherwise the result is
///   [`ObservedProxyState::indeterminate`]
///
/// There are no retries here.
#[derive(Clone)]
pub struct ProxyTypeResolver {
    store: Arc<dyn ProxyConfigStore>,
}

impl ProxyTypeResolver {
    pub fn new(store: Arc<dyn ProxyConfigStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, kind: LogicalProxyKind, service: &str) -> Result<ObservedProxyState> {
        let mut observed: Option<ObservedProxyState> = None;
        for &protocol in kind.sub_protocols() {
            let current = self.store.get(protocol, service)?;
            observed = match observed {
                None => Some(current),
                Some(previous) => Some(merge_observations(previous, current)),
            };
        }
        Ok(observed.unwrap_or_else(ObservedProxyState::indeterminate))
    }

    pub fn set(
        &self,
        kind: LogicalProxyKind,
        service: &str,
        domain: &str,
        port: &str,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        self.for_each_protocol(kind, |protocol| {
            self.store.set(protocol, service, domain, port, credentials)
        })
    }

    pub fn set_enabled(&self, kind: LogicalProxyKind, service: &str, enabled: bool) -> Result<()> {
        self.for_each_protocol(kind, |protocol| {
            self.store.set_enabled(protocol, service, enabled)
        })
    }

    fn for_each_protocol<F>(&self, kind: LogicalProxyKind, mut op: F) -> Result<()>
    where
        F: FnMut(SubProtocol) -> Result<()>,
    {
        let protocols = kind.sub_protocols();
        if let [protocol] = protocols {
            return op(*protocol);
        }

        let failures: Vec<String> = protocols
            .iter()
            .filter_map(|&protocol| {
                op(protocol)
                    .err()
                    .map(|e| format!("{}: {}", protocol.as_str(), e))
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::backend(format!(
                "{} proxy update failed ({})",
                kind.display_name(),
                failures.join("; ")
            )))
        }
    }
}

/// Combine two halves of a combined-kind read. Disagreement is never
/// resolved in favour of either side.
fn merge_observations(a: ObservedProxyState, b: ObservedProxyState) -> ObservedProxyState {
    let agree = a.enabled
        && b.enabled
        && a.server.is_some()
        && a.port.is_some()
        && a.server == b.server
        && a.port == b.port;
    if agree {
        a
    } else {
        ObservedProxyState::indeterminate()
    }
}
