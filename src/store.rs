use crate::entry::Credential;
use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Service name → list of (account, secret), in import order.
///
/// Serialized as the same `db.json` shape the Python tool wrote:
/// `{"GitHub": [["octocat", "JBSW..."]]}`.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Store {
    services: IndexMap<String, Vec<(String, String)>>,
}

impl Store {
    /// Group credentials by service, keeping first-seen order.
    pub fn from_credentials(creds: impl IntoIterator<Item = Credential>) -> Self {
        let mut services: IndexMap<String, Vec<(String, String)>> = IndexMap::new();
        for c in creds {
            services
                .entry(c.service)
                .or_default()
                .push((c.account, c.secret));
        }
        Store { services }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "database {} does not exist, run `ente-totp import <file>` first",
                path.display()
            );
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read database {}", path.display()))?;
        let store: Store = serde_json::from_str(&data)
            .with_context(|| format!("database {} is not valid JSON", path.display()))?;
        tracing::debug!(path = %path.display(), services = store.len(), "loaded database");
        Ok(store)
    }

    /// Overwrite the database file with this store.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let s = serde_json::to_string_pretty(self)?;
        std::fs::write(path, s)
            .with_context(|| format!("cannot write database {}", path.display()))?;
        Ok(())
    }

    /// Case-insensitive substring match on service names, in insertion order.
    pub fn lookup_by_substring(&self, query: &str) -> Vec<Credential> {
        let needle = query.to_lowercase();
        self.services
            .iter()
            .filter(|(service, _)| service.to_lowercase().contains(&needle))
            .flat_map(|(service, accounts)| {
                accounts
                    .iter()
                    .map(move |(account, secret)| Credential::new(service.as_str(), account.as_str(), secret.as_str()))
            })
            .collect()
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Number of services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Number of (account, secret) pairs across all services.
    pub fn credential_count(&self) -> usize {
        self.services.values().map(Vec::len).sum()
    }
}
