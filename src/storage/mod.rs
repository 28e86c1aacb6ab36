// Storage module for Threshold Recovery Node
//
// This module defines the wallet registry interface and its implementations.
// Records are keyed externally by wallet public key; internally every name is
// a keyed hash so the data directory reveals nothing about who is registered.

use crate::error::Result;
use crate::types::{Participant, Wallet};
use async_trait::async_trait;
use std::sync::Arc;

pub mod json_store;
pub mod memory_store;

/// Wallet registry interface
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Derive the blinded storage identifier for a wallet public key
    fn derive_id(&self, pubkey: &[u8]) -> String;

    /// Derive the mailbox slot identifier for a (wallet, friend) key pair
    fn friend_slot(&self, wallet_pk: &[u8], friend_pk: &[u8]) -> String;

    /// Fetch a wallet by public key
    async fn get(&self, pubkey: &[u8]) -> Result<Option<Wallet>>;

    /// Insert a new wallet; fails if the derived identifier already exists
    async fn register(&self, wallet: Wallet) -> Result<()>;

    /// Record a proof of life, returning the stored wallet.
    ///
    /// Updates for the same wallet are serialised and `last_activity` never
    /// moves backwards; a late writer observes the newer record unchanged.
    async fn update_liveness(&self, pubkey: &[u8], now: u64) -> Result<Wallet>;

    /// Insert a directory entry; fails if the id is taken
    async fn put_participant(&self, participant: Participant) -> Result<()>;

    /// Fetch a directory entry by id
    async fn get_participant(&self, id: &str) -> Result<Option<Participant>>;
}

/// Shared handle to a wallet store
pub type SharedWalletStore = Arc<dyn WalletStore>;
