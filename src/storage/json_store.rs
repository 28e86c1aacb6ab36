// File-backed wallet registry for Threshold Recovery Node
//
// One JSON file per wallet, named by the blinded storage identifier, with
// participants under their own subdirectory. Writes land in a temporary
// sibling, are fsynced, then atomically renamed: a crash mid-write leaves
// either the old record or no record, never a torn one.

use crate::crypto;
use crate::error::{RecoveryNodeError, Result};
use crate::storage::WalletStore;
use crate::types::{Participant, Wallet};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File-per-record wallet registry
pub struct JsonStore {
    /// Root data directory
    data_dir: PathBuf,
    /// Keyed-hash secret for identifier derivation
    hmac_secret: Vec<u8>,
    /// Per-identifier critical sections
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl JsonStore {
    /// Open (creating if needed) a registry rooted at `data_dir`
    pub fn new<P: AsRef<Path>>(data_dir: P, hmac_secret: Vec<u8>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        fs::create_dir_all(&data_dir)?;
        fs::create_dir_all(data_dir.join("participants"))?;
        fs::set_permissions(&data_dir, fs::Permissions::from_mode(0o755))?;
        fs::set_permissions(
            data_dir.join("participants"),
            fs::Permissions::from_mode(0o755),
        )?;

        info!("Opened wallet registry at {}", data_dir.display());

        Ok(Self {
            data_dir,
            hmac_secret,
            locks: DashMap::new(),
        })
    }

    fn wallet_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", id))
    }

    fn participant_path(&self, id: &str) -> PathBuf {
        self.data_dir.join("participants").join(format!("{}.json", id))
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn read_wallet(&self, id: &str) -> Result<Option<Wallet>> {
        match fs::read(self.wallet_path(id)) {
            Ok(bytes) => {
                let wallet = serde_json::from_slice(&bytes)?;
                Ok(Some(wallet))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RecoveryNodeError::Storage(format!(
                "failed to read wallet {}: {}",
                id, e
            ))),
        }
    }
}

/// Write `bytes` to `path` via a temporary sibling, fsync, atomic rename
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");

    {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl WalletStore for JsonStore {
    fn derive_id(&self, pubkey: &[u8]) -> String {
        crypto::derive_storage_id(&self.hmac_secret, pubkey)
    }

    fn friend_slot(&self, wallet_pk: &[u8], friend_pk: &[u8]) -> String {
        crypto::derive_friend_slot(&self.hmac_secret, wallet_pk, friend_pk)
    }

    async fn get(&self, pubkey: &[u8]) -> Result<Option<Wallet>> {
        let id = self.derive_id(pubkey);
        debug!("Reading wallet {}", id);
        self.read_wallet(&id)
    }

    async fn register(&self, wallet: Wallet) -> Result<()> {
        let id = wallet.id.clone();
        let lock = self.lock_for(&id);
        let _guard = lock.lock();

        let path = self.wallet_path(&id);
        if path.exists() {
            return Err(RecoveryNodeError::AlreadyRegistered(
                "a wallet for this public key already exists".to_string(),
            ));
        }

        let bytes = serde_json::to_vec_pretty(&wallet)?;
        write_atomic(&path, &bytes)?;

        debug!("Registered wallet {}", id);
        Ok(())
    }

    async fn update_liveness(&self, pubkey: &[u8], now: u64) -> Result<Wallet> {
        let id = self.derive_id(pubkey);
        let lock = self.lock_for(&id);
        let _guard = lock.lock();

        let mut wallet = self.read_wallet(&id)?.ok_or_else(|| {
            RecoveryNodeError::NotFound("no wallet for this public key".to_string())
        })?;

        // A late writer must not drag the activity timestamp backwards
        if now > wallet.last_activity {
            wallet.last_activity = now;
            wallet.expiration_date = now.saturating_add(wallet.inactivity_threshold);

            let bytes = serde_json::to_vec_pretty(&wallet)?;
            write_atomic(&self.wallet_path(&id), &bytes)?;
            debug!("Updated liveness for wallet {}", id);
        }

        Ok(wallet)
    }

    async fn put_participant(&self, participant: Participant) -> Result<()> {
        let lock = self.lock_for(&format!("participant:{}", participant.id));
        let _guard = lock.lock();

        let path = self.participant_path(&participant.id);
        if path.exists() {
            return Err(RecoveryNodeError::AlreadyRegistered(format!(
                "participant id '{}' is taken",
                participant.id
            )));
        }

        let bytes = serde_json::to_vec_pretty(&participant)?;
        write_atomic(&path, &bytes)?;

        debug!("Registered participant {}", participant.id);
        Ok(())
    }

    async fn get_participant(&self, id: &str) -> Result<Option<Participant>> {
        match fs::read(self.participant_path(id)) {
            Ok(bytes) => {
                let participant = serde_json::from_slice(&bytes)?;
                Ok(Some(participant))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RecoveryNodeError::Storage(format!(
                "failed to read participant {}: {}",
                id, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_wallet(store: &JsonStore, pubkey: &[u8]) -> Wallet {
        Wallet {
            id: store.derive_id(pubkey),
            public_key: pubkey.to_vec(),
            server_share: vec![9, 9, 9],
            server_share_index: 1,
            commitment: vec![4u8; 130],
            threshold: 2,
            inactivity_threshold: 60,
            last_activity: 1_000,
            expiration_date: 1_060,
            friend_shares: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_register_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path(), b"secret".to_vec()).unwrap();

        let pubkey = vec![4u8; 65];
        store.register(sample_wallet(&store, &pubkey)).await.unwrap();

        let wallet = store.get(&pubkey).await.unwrap().unwrap();
        assert_eq!(wallet.public_key, pubkey);
        assert_eq!(wallet.last_activity, 1_000);

        assert!(store.get(&[5u8; 65]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path(), b"secret".to_vec()).unwrap();

        let pubkey = vec![4u8; 65];
        store.register(sample_wallet(&store, &pubkey)).await.unwrap();

        let err = store.register(sample_wallet(&store, &pubkey)).await.unwrap_err();
        assert!(matches!(err, RecoveryNodeError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_liveness_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path(), b"secret".to_vec()).unwrap();

        let pubkey = vec![4u8; 65];
        store.register(sample_wallet(&store, &pubkey)).await.unwrap();

        let updated = store.update_liveness(&pubkey, 2_000).await.unwrap();
        assert_eq!(updated.last_activity, 2_000);
        assert_eq!(updated.expiration_date, 2_060);

        // A late writer with an older clock reading loses
        let stale = store.update_liveness(&pubkey, 1_500).await.unwrap();
        assert_eq!(stale.last_activity, 2_000);

        let on_disk = store.get(&pubkey).await.unwrap().unwrap();
        assert_eq!(on_disk.last_activity, 2_000);
    }

    #[tokio::test]
    async fn test_liveness_for_unknown_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path(), b"secret".to_vec()).unwrap();

        let err = store.update_liveness(&[4u8; 65], 2_000).await.unwrap_err();
        assert!(matches!(err, RecoveryNodeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_files_are_private_and_tmp_is_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path(), b"secret".to_vec()).unwrap();

        let pubkey = vec![4u8; 65];
        let id = store.derive_id(&pubkey);
        store.register(sample_wallet(&store, &pubkey)).await.unwrap();

        let path = dir.path().join(format!("{}.json", id));
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        assert!(!dir.path().join(format!("{}.json.tmp", id)).exists());
    }

    #[tokio::test]
    async fn test_participant_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path(), b"secret".to_vec()).unwrap();

        let participant = Participant {
            id: "alice".to_string(),
            public_key: vec![4u8; 65],
            created_at: 1_000,
        };
        store.put_participant(participant.clone()).await.unwrap();

        let found = store.get_participant("alice").await.unwrap().unwrap();
        assert_eq!(found.public_key, participant.public_key);

        let err = store.put_participant(participant).await.unwrap_err();
        assert!(matches!(err, RecoveryNodeError::AlreadyRegistered(_)));

        assert!(store.get_participant("bob").await.unwrap().is_none());
    }
}
