//! Per-host request metadata learned from successful resolutions.
//!
//! Download and playback collaborators look up the referer and user-agent a
//! host expects, and whether range requests (seeking) work against it.
//! Entries live for the whole process; a later resolution for the same host
//! overwrites the earlier one.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use super::models::ResolutionResult;
use super::utils::host_of;

#[derive(Debug, Default)]
struct Tables {
    referers: HashMap<String, String>,
    user_agents: HashMap<String, String>,
    unseekable: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct HostMetadataTable {
    inner: RwLock<Tables>,
}

impl HostMetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record referer, user-agent and seekability for every stream host of `result`
    pub fn register(&self, result: &ResolutionResult) {
        let hosts: Vec<String> = result
            .stream_urls
            .iter()
            .filter_map(|u| {
                let host = host_of(u);
                if host.is_none() {
                    tracing::debug!("skipping host metadata for unparsable url {}", u);
                }
                host
            })
            .collect();

        let mut tables = self.inner.write();
        for host in hosts {
            if let Some(referer) = result.referer.as_deref().filter(|r| !r.is_empty()) {
                tables.referers.insert(host.clone(), referer.to_string());
            }
            if let Some(ua) = result.user_agent.as_deref().filter(|u| !u.is_empty()) {
                tables.user_agents.insert(host.clone(), ua.to_string());
            }
            if !result.seekable {
                tables.unseekable.insert(host);
            }
        }
    }

    pub fn referer(&self, host: &str) -> Option<String> {
        self.inner.read().referers.get(host).cloned()
    }

    pub fn user_agent(&self, host: &str) -> Option<String> {
        self.inner.read().user_agents.get(host).cloned()
    }

    /// Hosts are seekable unless a resolution marked them otherwise
    pub fn is_seekable(&self, host: &str) -> bool {
        !self.inner.read().unseekable.contains(host)
    }
}
