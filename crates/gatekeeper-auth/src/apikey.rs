//! API-key lookup: the narrow interface the core consumes (spec §1 out of
//! scope - "SQLite schema ... for audit logs, API keys, OAuth clients,
//! and refresh-token tables; the core sees only a narrow logging/lookup
//! interface"). `InMemoryApiKeyStore` is the in-process default; a
//! persistent-store adapter implements the same trait.

use crate::bearer::keys_equal;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// What an API key is scoped to see. `None` means every configured tool
/// is visible - the default when no visibility list was configured for
/// the key.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub label: String,
    pub visible_tools: Option<Vec<String>>,
}

impl ApiKeyRecord {
    pub fn can_see(&self, tool_name: &str) -> bool {
        match &self.visible_tools {
            None => true,
            Some(list) => list.iter().any(|name| name == tool_name),
        }
    }
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Looks up the record for a presented key, or `None` if it doesn't
    /// match any configured key. Implementations must compare in constant
    /// time (`bearer::keys_equal`) to avoid leaking a valid key via a
    /// timing side-channel.
    async fn lookup(&self, presented_key: &str) -> Option<ApiKeyRecord>;
}

/// In-memory key store: every configured key is compared against the
/// presented one regardless of early mismatches, so lookup time does not
/// depend on which (if any) key matched.
pub struct InMemoryApiKeyStore {
    keys: RwLock<HashMap<String, ApiKeyRecord>>,
}

impl InMemoryApiKeyStore {
    pub fn new() -> Self {
        InMemoryApiKeyStore {
            keys: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, key: String, record: ApiKeyRecord) {
        self.keys.write().await.insert(key, record);
    }
}

impl Default for InMemoryApiKeyStore {
    fn default() -> Self {
        InMemoryApiKeyStore::new()
    }
}

#[async_trait]
impl ApiKeyStore for InMemoryApiKeyStore {
    async fn lookup(&self, presented_key: &str) -> Option<ApiKeyRecord> {
        let keys = self.keys.read().await;
        let mut found = None;
        for (configured_key, record) in keys.iter() {
            if keys_equal(presented_key, configured_key) {
                found = Some(record.clone());
            }
        }
        found
    }
}
