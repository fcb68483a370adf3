//! Durable account records.
//!
//! The secure store is the durable backing copy of a session's tokens; it is
//! written only after initial authentication or a successful refresh, never
//! speculatively. Records are JSON-serialized before storage and token
//! values never appear in logs.

use crate::error::{CloudError, Result};
use crate::model::{CloudUser, ProviderKind, TokenSet};
use bridge_traits::storage::SecureStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One authenticated account for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Provider-stable user id; the local account key.
    pub user_id: String,
    pub display_name: Option<String>,
    pub tokens: TokenSet,
}

impl AccountRecord {
    pub fn new(user: &CloudUser, tokens: TokenSet) -> Self {
        Self {
            user_id: user.id.clone(),
            display_name: user.display_name.clone().or_else(|| user.name.clone()),
            tokens,
        }
    }
}

/// JSON-over-`SecureStore` persistence for account records.
#[derive(Clone)]
pub struct AccountStore {
    secure: Arc<dyn SecureStore>,
}

impl AccountStore {
    pub fn new(secure: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing AccountStore");
        Self { secure }
    }

    fn key(provider: ProviderKind) -> String {
        format!("cloudpicker.account.{}", provider.as_str())
    }

    /// Load the stored account for `provider`.
    ///
    /// A record that fails to deserialize is deleted and treated as absent:
    /// the only recovery for a corrupted record is re-authentication, which
    /// is exactly what an absent record triggers.
    pub async fn load(&self, provider: ProviderKind) -> Result<Option<AccountRecord>> {
        let key = Self::key(provider);

        let data = self
            .secure
            .get_secret(&key)
            .await
            .map_err(|e| CloudError::Store(e.to_string()))?;

        let Some(data) = data else {
            debug!(provider = provider.as_str(), "No stored account");
            return Ok(None);
        };

        match serde_json::from_slice::<AccountRecord>(&data) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(
                    provider = provider.as_str(),
                    error = %e,
                    "Stored account record is corrupted, discarding"
                );
                if let Err(delete_err) = self.secure.delete_secret(&key).await {
                    warn!(
                        provider = provider.as_str(),
                        error = %delete_err,
                        "Failed to delete corrupted account record"
                    );
                }
                Ok(None)
            }
        }
    }

    /// Persist `record`, overwriting any previous account for `provider`.
    pub async fn save(&self, provider: ProviderKind, record: &AccountRecord) -> Result<()> {
        let key = Self::key(provider);

        let json = serde_json::to_vec(record)
            .map_err(|e| CloudError::Store(format!("account serialization: {}", e)))?;

        self.secure
            .set_secret(&key, &json)
            .await
            .map_err(|e| CloudError::Store(e.to_string()))?;

        info!(
            provider = provider.as_str(),
            user_id = %record.user_id,
            has_refresh_token = record.tokens.refresh_token.is_some(),
            "Account record stored"
        );

        Ok(())
    }

    /// Replace only the token set of the stored record.
    ///
    /// Returns `false` (and stores nothing) when no record exists yet — the
    /// full record is written at the next successful validation instead.
    pub async fn update_tokens(&self, provider: ProviderKind, tokens: &TokenSet) -> Result<bool> {
        match self.load(provider).await? {
            Some(mut record) => {
                record.tokens = tokens.clone();
                self.save(provider, &record).await?;
                Ok(true)
            }
            None => {
                warn!(
                    provider = provider.as_str(),
                    "No account record to update tokens on"
                );
                Ok(false)
            }
        }
    }

    /// Remove the stored account for `provider`.
    pub async fn remove(&self, provider: ProviderKind) -> Result<()> {
        self.secure
            .delete_secret(&Self::key(provider))
            .await
            .map_err(|e| CloudError::Store(e.to_string()))?;
        info!(provider = provider.as_str(), "Account record removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        secrets: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl SecureStore for MemoryStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.secrets
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.secrets.lock().unwrap().get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.secrets.lock().unwrap().remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.secrets.lock().unwrap().keys().cloned().collect())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            self.secrets.lock().unwrap().clear();
            Ok(())
        }
    }

    fn record() -> AccountRecord {
        AccountRecord {
            user_id: "user-1".into(),
            display_name: Some("User One".into()),
            tokens: TokenSet::new("access", Some("refresh".into()), Some(3600)),
        }
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = AccountStore::new(Arc::new(MemoryStore::default()));

        assert!(store.load(ProviderKind::Box).await.unwrap().is_none());

        let rec = record();
        store.save(ProviderKind::Box, &rec).await.unwrap();
        let loaded = store.load(ProviderKind::Box).await.unwrap().unwrap();
        assert_eq!(loaded, rec);

        // Records are keyed per provider
        assert!(store.load(ProviderKind::Dropbox).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_tokens() {
        let store = AccountStore::new(Arc::new(MemoryStore::default()));
        store.save(ProviderKind::Box, &record()).await.unwrap();

        let fresh = TokenSet::new("new-access", Some("new-refresh".into()), Some(3600));
        assert!(store
            .update_tokens(ProviderKind::Box, &fresh)
            .await
            .unwrap());

        let loaded = store.load(ProviderKind::Box).await.unwrap().unwrap();
        assert_eq!(loaded.tokens.access_token, "new-access");
        assert_eq!(loaded.user_id, "user-1");
    }

    #[tokio::test]
    async fn test_update_tokens_without_record() {
        let store = AccountStore::new(Arc::new(MemoryStore::default()));
        let fresh = TokenSet::bearer_only("access");
        assert!(!store
            .update_tokens(ProviderKind::Bitcasa, &fresh)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_record_discarded() {
        let memory = Arc::new(MemoryStore::default());
        memory
            .set_secret("cloudpicker.account.box", b"{not json")
            .await
            .unwrap();

        let store = AccountStore::new(memory.clone());
        assert!(store.load(ProviderKind::Box).await.unwrap().is_none());
        // The corrupted blob was deleted, not left to fail again
        assert!(memory
            .get_secret("cloudpicker.account.box")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = AccountStore::new(Arc::new(MemoryStore::default()));
        store.save(ProviderKind::OneDrive, &record()).await.unwrap();
        store.remove(ProviderKind::OneDrive).await.unwrap();
        assert!(store.load(ProviderKind::OneDrive).await.unwrap().is_none());
    }
}
