//! In-memory network registry backing the standalone binary.

#![allow(missing_docs)]

use std::path::Path;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::ServiceError;
use crate::resolver::{NetworkHandle, NetworkRegistry, ViewHandle};

#[derive(Debug, Clone)]
pub struct NetworkEntry {
    pub suid: i64,
    pub name: SmolStr,
    pub views: Vec<i64>,
    /// Opaque network document forwarded to the diffusion service.
    pub data: Value,
}

impl NetworkEntry {
    #[must_use]
    pub fn new(suid: i64, name: &str, views: Vec<i64>) -> Self {
        Self {
            suid,
            name: SmolStr::new(name),
            views,
            data: Value::Null,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    fn handle(&self) -> NetworkHandle {
        NetworkHandle {
            suid: self.suid,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    networks: IndexMap<i64, NetworkEntry>,
    current_network: Option<i64>,
    current_view: Option<i64>,
    results: IndexMap<i64, Value>,
}

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: RwLock<RegistryState>,
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    current: Option<CurrentSection>,
    #[serde(default)]
    networks: Vec<NetworkSection>,
}

#[derive(Debug, Deserialize)]
struct CurrentSection {
    network: Option<i64>,
    view: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct NetworkSection {
    suid: i64,
    name: Option<String>,
    #[serde(default)]
    views: Vec<i64>,
    #[serde(default)]
    data: Value,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new(networks: Vec<NetworkEntry>) -> Self {
        let networks = networks
            .into_iter()
            .map(|entry| (entry.suid, entry))
            .collect();
        Self {
            state: RwLock::new(RegistryState {
                networks,
                ..RegistryState::default()
            }),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ServiceError::InvalidRegistry(format!("{}: {err}", path.display()).into())
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ServiceError> {
        let document: RegistryDocument = serde_json::from_str(text)
            .map_err(|err| ServiceError::InvalidRegistry(err.to_string().into()))?;
        let mut networks = Vec::with_capacity(document.networks.len());
        for section in document.networks {
            if networks
                .iter()
                .any(|entry: &NetworkEntry| entry.suid == section.suid)
            {
                return Err(ServiceError::InvalidRegistry(
                    format!("duplicate network SUID {}", section.suid).into(),
                ));
            }
            let name = section
                .name
                .unwrap_or_else(|| format!("Network {}", section.suid));
            networks.push(NetworkEntry::new(section.suid, &name, section.views).with_data(section.data));
        }
        let registry = Self::new(networks);
        if let Some(current) = document.current {
            registry.set_current(current.network, current.view);
        }
        Ok(registry)
    }

    /// Replaces the host's current network/view selection.
    pub fn set_current(&self, network: Option<i64>, view: Option<i64>) {
        let mut state = self.state.write();
        state.current_network = network;
        state.current_view = view;
    }

    pub fn len(&self) -> usize {
        self.state.read().networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn document(&self, network_suid: i64) -> Option<Value> {
        self.state
            .read()
            .networks
            .get(&network_suid)
            .map(|entry| entry.data.clone())
    }

    /// Stores the latest diffusion result for a network.
    pub fn record_result(&self, network_suid: i64, result: Value) {
        self.state.write().results.insert(network_suid, result);
    }

    pub fn result(&self, network_suid: i64) -> Option<Value> {
        self.state.read().results.get(&network_suid).cloned()
    }
}

impl NetworkRegistry for MemoryRegistry {
    fn network(&self, suid: i64) -> Option<NetworkHandle> {
        self.state.read().networks.get(&suid).map(NetworkEntry::handle)
    }

    fn views(&self, network: &NetworkHandle) -> Vec<ViewHandle> {
        self.state
            .read()
            .networks
            .get(&network.suid)
            .map(|entry| {
                entry
                    .views
                    .iter()
                    .map(|suid| ViewHandle {
                        suid: *suid,
                        network_suid: entry.suid,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn current_network(&self) -> Option<NetworkHandle> {
        let state = self.state.read();
        let suid = state.current_network?;
        state.networks.get(&suid).map(NetworkEntry::handle)
    }

    fn current_view(&self) -> Option<ViewHandle> {
        let state = self.state.read();
        let view = state.current_view?;
        state
            .networks
            .values()
            .find(|entry| entry.views.contains(&view))
            .map(|entry| ViewHandle {
                suid: view,
                network_suid: entry.suid,
            })
    }
}
