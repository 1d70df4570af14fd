//! Credential pools and lazy service clients.
//!
//! Credential groups are named pools of API keys; each service category
//! carries a preference order over group names. Clients are built lazily,
//! cached per service name, and a failed service degrades instead of
//! taking the daemon down.

use sherpa_common::{CredentialsConfig, ServiceCategory, ServiceClientStatus, SherpaError};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A named credential group with its resolved key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialGroup {
    pub name: String,
    pub key: String,
}

pub struct CredentialManager {
    /// Resolved groups in name order. Groups whose key failed to resolve
    /// were dropped at load.
    groups: Vec<CredentialGroup>,
    preferences: BTreeMap<ServiceCategory, Vec<String>>,
    clients: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    statuses: RwLock<BTreeMap<String, ServiceClientStatus>>,
}

impl CredentialManager {
    pub fn from_config(config: &CredentialsConfig) -> Self {
        let groups: Vec<CredentialGroup> = config
            .resolved_groups()
            .into_iter()
            .map(|(name, key)| CredentialGroup { name, key })
            .collect();
        info!("[*]  {} credential group(s) resolved", groups.len());
        Self {
            groups,
            preferences: config.preferences.clone(),
            clients: RwLock::new(HashMap::new()),
            statuses: RwLock::new(BTreeMap::new()),
        }
    }

    /// Groups in the order this category should try them: preferred names
    /// first, then every remaining group in name order. Names that match
    /// no group are skipped; no group appears twice.
    pub fn candidate_groups(&self, category: ServiceCategory) -> Vec<&CredentialGroup> {
        let mut out: Vec<&CredentialGroup> = Vec::new();
        if let Some(preferred) = self.preferences.get(&category) {
            for name in preferred {
                if let Some(group) = self.groups.iter().find(|g| &g.name == name) {
                    if !out.iter().any(|g| g.name == group.name) {
                        out.push(group);
                    }
                }
            }
        }
        for group in &self.groups {
            if !out.iter().any(|g| g.name == group.name) {
                out.push(group);
            }
        }
        out
    }

    /// First usable group for the category.
    pub fn resolve_credential(
        &self,
        category: ServiceCategory,
    ) -> Result<&CredentialGroup, SherpaError> {
        self.candidate_groups(category)
            .into_iter()
            .next()
            .ok_or(SherpaError::NoCredentialAvailable { category })
    }

    /// Build (or fetch the cached) client for `service_name`.
    ///
    /// Each candidate group is tried at most once per call. The first
    /// successful build is cached and its group recorded; exhaustion
    /// records the last failure and returns `None`, leaving the feature
    /// disabled rather than failing the daemon.
    pub async fn initialize_client<T, F, Fut>(
        &self,
        category: ServiceCategory,
        service_name: &str,
        build: F,
    ) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn(CredentialGroup) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(existing) = self.clients.read().await.get(service_name) {
            if let Ok(typed) = existing.clone().downcast::<T>() {
                return Some(typed);
            }
        }

        let candidates: Vec<CredentialGroup> =
            self.candidate_groups(category).into_iter().cloned().collect();

        if candidates.is_empty() {
            warn!(
                "[!]  No credential group for {} ({}), feature disabled",
                service_name, category
            );
            self.statuses.write().await.insert(
                service_name.to_string(),
                ServiceClientStatus::failed("no credential available"),
            );
            return None;
        }

        for group in &candidates {
            match build(group.clone()).await {
                Ok(client) => {
                    let client = Arc::new(client);
                    self.clients.write().await.insert(
                        service_name.to_string(),
                        client.clone() as Arc<dyn Any + Send + Sync>,
                    );
                    self.statuses.write().await.insert(
                        service_name.to_string(),
                        ServiceClientStatus::ready(&group.name),
                    );
                    info!(
                        "[*]  {} initialized with credential group '{}'",
                        service_name, group.name
                    );
                    return Some(client);
                }
                Err(e) => {
                    warn!(
                        "[!]  {} failed with group '{}': {}",
                        service_name, group.name, e
                    );
                    self.statuses.write().await.insert(
                        service_name.to_string(),
                        ServiceClientStatus::failed(&e.to_string()),
                    );
                }
            }
        }

        warn!(
            "[!]  {} exhausted all {} credential group(s), feature disabled",
            service_name,
            candidates.len()
        );
        None
    }

    /// Snapshot of every client's last initialization outcome.
    pub async fn service_statuses(&self) -> BTreeMap<String, ServiceClientStatus> {
        self.statuses.read().await.clone()
    }
}
