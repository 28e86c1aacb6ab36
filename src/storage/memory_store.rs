// In-memory wallet registry for Threshold Recovery Node
//
// This is a simple in-memory implementation for testing and development.

use crate::crypto;
use crate::error::{RecoveryNodeError, Result};
use crate::storage::WalletStore;
use crate::types::{Participant, Wallet};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// In-memory wallet registry
pub struct MemoryStore {
    /// Keyed-hash secret for identifier derivation
    hmac_secret: Vec<u8>,
    /// Wallets by blinded identifier
    wallets: DashMap<String, Wallet>,
    /// Participants by directory id
    participants: DashMap<String, Participant>,
}

impl MemoryStore {
    /// Create a new in-memory registry
    pub fn new(hmac_secret: Vec<u8>) -> Self {
        Self {
            hmac_secret,
            wallets: DashMap::new(),
            participants: DashMap::new(),
        }
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    fn derive_id(&self, pubkey: &[u8]) -> String {
        crypto::derive_storage_id(&self.hmac_secret, pubkey)
    }

    fn friend_slot(&self, wallet_pk: &[u8], friend_pk: &[u8]) -> String {
        crypto::derive_friend_slot(&self.hmac_secret, wallet_pk, friend_pk)
    }

    async fn get(&self, pubkey: &[u8]) -> Result<Option<Wallet>> {
        let id = self.derive_id(pubkey);
        Ok(self.wallets.get(&id).map(|w| w.clone()))
    }

    async fn register(&self, wallet: Wallet) -> Result<()> {
        match self.wallets.entry(wallet.id.clone()) {
            Entry::Occupied(_) => Err(RecoveryNodeError::AlreadyRegistered(
                "a wallet for this public key already exists".to_string(),
            )),
            Entry::Vacant(slot) => {
                debug!("Registered wallet {}", wallet.id);
                slot.insert(wallet);
                Ok(())
            }
        }
    }

    async fn update_liveness(&self, pubkey: &[u8], now: u64) -> Result<Wallet> {
        let id = self.derive_id(pubkey);

        let mut wallet = self.wallets.get_mut(&id).ok_or_else(|| {
            RecoveryNodeError::NotFound("no wallet for this public key".to_string())
        })?;

        if now > wallet.last_activity {
            wallet.last_activity = now;
            wallet.expiration_date = now.saturating_add(wallet.inactivity_threshold);
        }

        Ok(wallet.clone())
    }

    async fn put_participant(&self, participant: Participant) -> Result<()> {
        match self.participants.entry(participant.id.clone()) {
            Entry::Occupied(_) => Err(RecoveryNodeError::AlreadyRegistered(format!(
                "participant id '{}' is taken",
                participant.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(participant);
                Ok(())
            }
        }
    }

    async fn get_participant(&self, id: &str) -> Result<Option<Participant>> {
        Ok(self.participants.get(id).map(|p| p.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new(b"secret".to_vec());
        let pubkey = vec![4u8; 65];

        let wallet = Wallet {
            id: store.derive_id(&pubkey),
            public_key: pubkey.clone(),
            server_share: vec![],
            server_share_index: 1,
            commitment: vec![],
            threshold: 2,
            inactivity_threshold: 60,
            last_activity: 1_000,
            expiration_date: 1_060,
            friend_shares: HashMap::new(),
        };

        store.register(wallet.clone()).await.unwrap();
        assert!(store.register(wallet).await.is_err());

        let updated = store.update_liveness(&pubkey, 1_500).await.unwrap();
        assert_eq!(updated.last_activity, 1_500);

        let stale = store.update_liveness(&pubkey, 1_200).await.unwrap();
        assert_eq!(stale.last_activity, 1_500);
    }
}
