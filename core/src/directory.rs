use std::collections::{BTreeMap, HashSet};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::messaging::EndpointId;

/// Static binding of an endpoint name to a transport address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub name: EndpointId,
    pub address: String,
    /// Review stage served by this endpoint (e.g. "moderation"), or "producer"
    pub role: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl EndpointInfo {
    pub fn new(
        name: impl Into<EndpointId>,
        address: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            role: role.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// In-memory name -> address directory with a role index
#[derive(Debug, Default)]
pub struct EndpointDirectory {
    endpoints: DashMap<EndpointId, EndpointInfo>,
    role_index: DashMap<String, HashSet<EndpointId>>, // role -> endpoints
}

impl EndpointDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(bindings: impl IntoIterator<Item = EndpointInfo>) -> Self {
        let dir = Self::new();
        for info in bindings {
            dir.register(info);
        }
        dir
    }

    pub fn register(&self, info: EndpointInfo) {
        let name = info.name.clone();
        // Drop the stale role entry when rebinding
        if let Some(old) = self.endpoints.get(&name) {
            if let Some(mut set) = self.role_index.get_mut(&old.role) {
                set.remove(&name);
            }
        }
        self.role_index
            .entry(info.role.clone())
            .or_default()
            .insert(name.clone());
        self.endpoints.insert(name, info);
    }

    pub fn unregister(&self, name: &EndpointId) -> Option<EndpointInfo> {
        let (_, old) = self.endpoints.remove(name)?;
        if let Some(mut set) = self.role_index.get_mut(&old.role) {
            set.remove(name);
        }
        Some(old)
    }

    /// Transport address bound to `name`.
    pub fn resolve(&self, name: &EndpointId) -> Option<String> {
        self.endpoints.get(name).map(|e| e.address.clone())
    }

    pub fn get(&self, name: &EndpointId) -> Option<EndpointInfo> {
        self.endpoints.get(name).map(|e| e.clone())
    }

    pub fn by_role(&self, role: &str) -> Vec<EndpointId> {
        let mut names: Vec<EndpointId> = self
            .role_index
            .get(role)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn all(&self) -> Vec<EndpointInfo> {
        let mut all: Vec<EndpointInfo> = self.endpoints.iter().map(|e| e.clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
