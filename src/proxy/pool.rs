use crate::proxy::endpoint::{parse_proxy_address, ProxyEndpoint};
use crate::ConfigError;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Health tracking for one endpoint
#[derive(Debug, Clone)]
struct ProxyState {
    address: String,
    healthy: bool,
    failures: u32,
}

#[derive(Debug, Default)]
struct PoolState {
    entries: Vec<ProxyState>,
    /// Index the next round-robin scan starts from
    cursor: usize,
}

/// Shared pool of proxy endpoints
///
/// The pool never shrinks: a failing endpoint is only marked unhealthy and
/// stays selectable, since proxies are unreliable but scarce and may
/// recover. All state sits behind one mutex and is only reachable through
/// the pool's methods.
#[derive(Debug, Default)]
pub struct ProxyPool {
    state: Mutex<PoolState>,
}

impl ProxyPool {
    /// Builds a pool from proxy addresses (`host:port` or proxy URLs)
    ///
    /// Duplicate addresses are collapsed into one endpoint.
    pub fn new<I, S>(addresses: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<ProxyState> = Vec::new();

        for address in addresses {
            let url = parse_proxy_address(address.as_ref())?;
            let address = url.as_str().trim_end_matches('/').to_string();
            if entries.iter().any(|e| e.address == address) {
                continue;
            }
            entries.push(ProxyState {
                address,
                healthy: true,
                failures: 0,
            });
        }

        Ok(Self {
            state: Mutex::new(PoolState { entries, cursor: 0 }),
        })
    }

    /// An empty pool; every request goes out directly
    pub fn empty() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Picks the endpoint for the next outbound request
    ///
    /// Healthy endpoints are handed out round-robin. When every endpoint is
    /// unhealthy the rotation continues over all of them, since an endpoint
    /// marked unhealthy earlier may have recovered.
    ///
    /// # Returns
    ///
    /// * `Some(ProxyEndpoint)` - The endpoint to use
    /// * `None` - The pool is empty
    pub fn acquire(&self) -> Option<ProxyEndpoint> {
        let mut state = self.lock();
        let len = state.entries.len();
        if len == 0 {
            return None;
        }

        let start = state.cursor % len;
        let index = (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&i| state.entries[i].healthy)
            .unwrap_or(start);

        state.cursor = (index + 1) % len;

        let entry = &state.entries[index];
        Some(ProxyEndpoint {
            index,
            address: entry.address.clone(),
            healthy: entry.healthy,
        })
    }

    /// Marks an endpoint unhealthy after a failed request through it
    pub fn report_failure(&self, endpoint: &ProxyEndpoint) {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(endpoint.index) {
            entry.failures += 1;
            if entry.healthy {
                tracing::warn!(
                    proxy = %entry.address,
                    failures = entry.failures,
                    "Marking proxy unhealthy"
                );
            }
            entry.healthy = false;
        }
    }

    /// Marks an endpoint healthy after a request through it got a response
    pub fn report_success(&self, endpoint: &ProxyEndpoint) {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(endpoint.index) {
            if !entry.healthy {
                tracing::info!(proxy = %entry.address, "Proxy recovered");
            }
            entry.healthy = true;
            entry.failures = 0;
        }
    }

    /// Number of endpoints in the pool (healthy or not)
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn healthy_count(&self) -> usize {
        self.lock().entries.iter().filter(|e| e.healthy).count()
    }

    /// Current view of every endpoint, in pool order
    pub fn snapshot(&self) -> Vec<ProxyEndpoint> {
        self.lock()
            .entries
            .iter()
            .enumerate()
            .map(|(index, e)| ProxyEndpoint {
                index,
                address: e.address.clone(),
                healthy: e.healthy,
            })
            .collect()
    }

    /// Proxy URLs in pool order
    pub fn addresses(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .map(|e| e.address.clone())
            .collect()
    }
}
