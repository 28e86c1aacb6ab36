// Types module for Threshold Recovery Node
//
// This module defines the persisted records and the wire-level request and
// response shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A registered wallet under dead-man-switch protection.
///
/// There is no stored lifecycle state: whether the wallet is recoverable is
/// derived from `last_activity` and the clock at request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Blinded storage identifier (keyed hash of the public key)
    pub id: String,

    /// Wallet public key, uncompressed curve point
    pub public_key: Vec<u8>,

    /// The node's own share, sealed at rest; opened only during release
    pub server_share: Vec<u8>,

    /// Evaluation index of the node's share
    pub server_share_index: u32,

    /// Concatenated commitment points C_0 || ... || C_{k-1}
    pub commitment: Vec<u8>,

    /// Reconstruction threshold k
    pub threshold: u32,

    /// Inactivity window in seconds
    pub inactivity_threshold: u64,

    /// Last accepted proof of life (unix seconds)
    pub last_activity: u64,

    /// Hard deadline, refreshed on each accepted liveness (unix seconds)
    pub expiration_date: u64,

    /// Mailbox: blinded slot identifier -> encrypted blob for that friend
    pub friend_shares: HashMap<String, Vec<u8>>,
}

/// A directory entry for a shareholder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Caller-chosen identifier, unique in the directory
    pub id: String,

    /// Participant public key, uncompressed curve point
    pub public_key: Vec<u8>,

    /// Registration time (unix seconds)
    pub created_at: u64,
}

/// Registration request body.
///
/// Octet-string fields are hex-encoded; friend blobs are base64 since the
/// node treats them as opaque octets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Wallet public key, hex uncompressed point
    pub public_key: String,

    /// The node's share scalar, hex; verified against the commitment, then
    /// sealed at rest
    pub encrypted_share: String,

    /// Evaluation index of the node's share; the node always holds index 1
    #[serde(default = "default_server_index")]
    pub share_index: u32,

    /// Commitment blob, hex
    pub share_commitment: String,

    /// Inactivity window in seconds
    pub inactivity_threshold: u64,

    /// One entry per friend; the node holds the remaining share
    pub friend_shares: Vec<FriendShareInput>,
}

fn default_server_index() -> u32 {
    1
}

/// A friend's mailbox deposit within a registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendShareInput {
    /// Friend public key, hex uncompressed point
    pub friend_public_key: String,

    /// Encrypted share blob for that friend, base64
    pub encrypted_blob: String,
}

/// Liveness proof body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessRequest {
    /// Wallet public key, hex
    pub public_key: String,

    /// Unix seconds at signing time
    pub timestamp: i64,

    /// ECDSA signature R || S over `hex(pubkey):timestamp`, hex
    pub signature: String,
}

/// Mailbox pickup body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupRequest {
    /// Wallet public key, hex
    pub public_key: String,

    /// Caller (friend) public key, hex
    pub friend_public_key: String,

    /// ECDSA signature R || S over the pickup challenge, hex
    pub signature: String,
}

/// Server-share release body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    /// Wallet public key, hex
    pub public_key: String,
}

/// Participant directory registration body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRequest {
    /// Caller-chosen identifier
    pub id: String,

    /// Participant public key, hex uncompressed point
    pub public_key: String,
}

/// Status response for a wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Whether the dead-man switch has tripped
    pub recoverable: bool,

    /// Last accepted proof of life (unix seconds)
    pub last_activity: u64,

    /// Seconds until the switch trips; non-positive means already tripped
    pub time_until_recovery: i64,
}

/// Release response carrying the raw share scalar.
///
/// The caller performs Lagrange interpolation off-line; the node stays
/// stateless about who else is combining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseResponse {
    /// Fixed marker: "recovery_success"
    pub status: String,

    /// Evaluation index of the released share
    pub share_index: u32,

    /// Share scalar, hex
    pub share: String,
}

/// Generic status-marker response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMarker {
    /// Operation outcome marker
    pub status: String,
}
