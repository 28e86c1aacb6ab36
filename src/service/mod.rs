// Request façade for Threshold Recovery Node
//
// Maps the external operations onto the secret-sharing engine, the policy
// gate, the wallet registry and the audit trail. Handlers stay thin; all
// orchestration and validation lives here.

use crate::audit::{AuditEvent, AuditLog};
use crate::crypto::{self, liveness, vss, POINT_LEN};
use crate::error::{RecoveryNodeError, Result};
use crate::policy;
use crate::storage::SharedWalletStore;
use crate::types::{
    LivenessRequest, Participant, ParticipantRequest, PickupRequest, RegisterRequest,
    ReleaseRequest, ReleaseResponse, StatusMarker, StatusResponse, Wallet,
};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::engine::Engine;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Evaluation index of the share the node keeps for itself. Index 0 encodes
/// the secret and is never issued; friends hold 2..=n.
pub const SERVER_SHARE_INDEX: u32 = 1;

/// The request façade
pub struct RecoveryService {
    store: SharedWalletStore,
    audit: Arc<AuditLog>,
    /// Sealing key for the node's shares, derived once from the master secret
    share_key: [u8; 32],
}

impl RecoveryService {
    /// Create the façade over a wallet store and audit trail
    pub fn new(store: SharedWalletStore, audit: Arc<AuditLog>, master_key: &[u8; 32]) -> Self {
        Self {
            store,
            audit,
            share_key: crypto::derive_key("server-share-seal", master_key),
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }

    /// Register a wallet: validate the commitment, verify the node's own
    /// share against it, then persist with the mailbox populated.
    pub async fn register(&self, request: RegisterRequest) -> Result<StatusMarker> {
        let pubkey = decode_hex("public_key", &request.public_key)?;
        crypto::parse_point(&pubkey)
            .map_err(|e| RecoveryNodeError::BadRequest(format!("public_key: {}", e)))?;

        let share_bytes = decode_hex("encrypted_share", &request.encrypted_share)?;
        let share = crypto::parse_scalar(&share_bytes)
            .map_err(|e| RecoveryNodeError::BadRequest(format!("encrypted_share: {}", e)))?;

        if request.share_index != SERVER_SHARE_INDEX {
            return Err(RecoveryNodeError::BadRequest(format!(
                "the node holds share index {}, got {}",
                SERVER_SHARE_INDEX, request.share_index
            )));
        }

        if request.inactivity_threshold == 0 {
            return Err(RecoveryNodeError::BadRequest(
                "inactivity_threshold must be positive".to_string(),
            ));
        }

        let commitment = decode_hex("share_commitment", &request.share_commitment)?;
        vss::commitment_points(&commitment)?;

        // The constant term pins the polynomial to the wallet identity
        if commitment[..POINT_LEN] != pubkey[..] {
            return Err(RecoveryNodeError::InvalidCommitment(
                "commitment C_0 does not match the wallet public key".to_string(),
            ));
        }

        let k = (commitment.len() / POINT_LEN) as u32;
        let n = request.friend_shares.len() as u32 + 1;
        if k > n {
            return Err(RecoveryNodeError::BadRequest(format!(
                "threshold {} exceeds the {} issued shares",
                k, n
            )));
        }

        if !vss::verify_share(SERVER_SHARE_INDEX, &share, &commitment)? {
            return Err(RecoveryNodeError::InvalidCommitment(
                "share does not lie on the committed polynomial".to_string(),
            ));
        }

        let mut friend_shares = HashMap::with_capacity(request.friend_shares.len());
        for (i, entry) in request.friend_shares.iter().enumerate() {
            let friend_pk = decode_hex("friend_public_key", &entry.friend_public_key)?;
            crypto::parse_point(&friend_pk).map_err(|e| {
                RecoveryNodeError::BadRequest(format!("friend_shares[{}]: {}", i, e))
            })?;

            let blob = BASE64.decode(&entry.encrypted_blob).map_err(|e| {
                RecoveryNodeError::BadRequest(format!("friend_shares[{}] blob: {}", i, e))
            })?;
            if blob.is_empty() {
                return Err(RecoveryNodeError::BadRequest(format!(
                    "friend_shares[{}] blob is empty",
                    i
                )));
            }

            let slot = self.store.friend_slot(&pubkey, &friend_pk);
            if friend_shares.insert(slot, blob).is_some() {
                return Err(RecoveryNodeError::BadRequest(format!(
                    "friend_shares[{}] repeats an earlier friend key",
                    i
                )));
            }
        }

        let now = Self::now();
        let wallet = Wallet {
            id: self.store.derive_id(&pubkey),
            public_key: pubkey,
            server_share: crypto::seal_share(&self.share_key, &share_bytes)?,
            server_share_index: SERVER_SHARE_INDEX,
            commitment,
            threshold: k,
            inactivity_threshold: request.inactivity_threshold,
            last_activity: now,
            expiration_date: now.saturating_add(request.inactivity_threshold),
            friend_shares,
        };
        let hint = wallet.id.clone();

        self.store.register(wallet).await?;

        info!("Registered wallet {} ({} of {})", hint, k, n);
        self.audit.log(&hint, AuditEvent::Register, "success");

        Ok(StatusMarker {
            status: "registered".to_string(),
        })
    }

    /// Accept a proof of life and push the recovery deadline forward
    pub async fn liveness(&self, request: LivenessRequest) -> Result<StatusMarker> {
        let pubkey = decode_hex("public_key", &request.public_key)?;
        let signature = decode_hex("signature", &request.signature)?;
        let now = Self::now();

        // Freshness is checked before any lookup; a stale proof tells us
        // nothing about the wallet either way
        liveness::check_freshness(request.timestamp, now as i64)?;

        let wallet = self.get_wallet(&pubkey).await?;

        let message = liveness::liveness_message(&wallet.public_key, request.timestamp);
        if let Err(e) = liveness::verify_signature(&wallet.public_key, &message, &signature) {
            warn!("Rejected liveness proof for wallet {}", wallet.id);
            self.audit
                .log(&wallet.id, AuditEvent::LivenessRejected, "invalid signature");
            return Err(e);
        }

        self.store.update_liveness(&pubkey, now).await?;
        self.audit.log(
            &wallet.id,
            AuditEvent::LivenessUpdate,
            "liveness updated via signed timestamp",
        );

        Ok(StatusMarker {
            status: "liveness_updated".to_string(),
        })
    }

    /// Report whether the dead-man switch has tripped for a wallet
    pub async fn status(&self, pubkey_hex: &str) -> Result<StatusResponse> {
        let pubkey = decode_hex("public_key", pubkey_hex)?;
        let wallet = self.get_wallet(&pubkey).await?;

        let now = Self::now();
        debug!("Wallet {} is {:?}", wallet.id, policy::state(&wallet, now));

        let status = policy::status(&wallet, now);
        self.audit.log(&wallet.id, AuditEvent::Status, "");
        Ok(status)
    }

    /// Hand a friend their mailbox blob, if the gate allows it.
    ///
    /// The blob is returned verbatim; the node never interprets it.
    pub async fn pickup(&self, request: PickupRequest) -> Result<Vec<u8>> {
        let pubkey = decode_hex("public_key", &request.public_key)?;
        let friend_pk = decode_hex("friend_public_key", &request.friend_public_key)?;
        let signature = decode_hex("signature", &request.signature)?;

        let wallet = self.get_wallet(&pubkey).await?;

        let challenge = liveness::pickup_challenge(&wallet.public_key, &friend_pk);
        if let Err(e) = liveness::verify_signature(&friend_pk, &challenge, &signature) {
            self.audit
                .log(&wallet.id, AuditEvent::SharePickupDenied, "invalid signature");
            return Err(e);
        }

        if let Err(e) = policy::check_release_allowed(&wallet, Self::now()) {
            warn!("Blocked mailbox pickup on live wallet {}", wallet.id);
            self.audit
                .log(&wallet.id, AuditEvent::SharePickupDenied, "recovery locked");
            return Err(e);
        }

        let slot = self.store.friend_slot(&wallet.public_key, &friend_pk);
        let blob = match policy::find_friend_share(&wallet, &slot) {
            Ok(blob) => blob.to_vec(),
            Err(e) => {
                self.audit
                    .log(&wallet.id, AuditEvent::SharePickupDenied, "no mailbox slot");
                return Err(e);
            }
        };

        self.audit.log(&wallet.id, AuditEvent::SharePickup, "");
        Ok(blob)
    }

    /// Release the node's own share once the switch has tripped.
    ///
    /// The share is unsealed transiently; the caller combines it with the
    /// friends' shares off-line.
    pub async fn release(&self, request: ReleaseRequest) -> Result<ReleaseResponse> {
        let pubkey = decode_hex("public_key", &request.public_key)?;
        let wallet = self.get_wallet(&pubkey).await?;

        if let Err(e) = policy::check_release_allowed(&wallet, Self::now()) {
            warn!("Blocked share release on live wallet {}", wallet.id);
            self.audit
                .log(&wallet.id, AuditEvent::ShareReleaseBlocked, "recovery locked");
            return Err(e);
        }

        let plaintext = crypto::open_share(&self.share_key, &wallet.server_share)?;
        let share = hex::encode(plaintext.as_slice());

        self.audit.log(&wallet.id, AuditEvent::ShareRelease, "");
        Ok(ReleaseResponse {
            status: "recovery_success".to_string(),
            share_index: wallet.server_share_index,
            share,
        })
    }

    /// Add a shareholder to the participant directory
    pub async fn register_participant(&self, request: ParticipantRequest) -> Result<StatusMarker> {
        validate_participant_id(&request.id)?;

        let pubkey = decode_hex("public_key", &request.public_key)?;
        crypto::parse_point(&pubkey)
            .map_err(|e| RecoveryNodeError::BadRequest(format!("public_key: {}", e)))?;

        self.store
            .put_participant(Participant {
                id: request.id.clone(),
                public_key: pubkey,
                created_at: Self::now(),
            })
            .await?;

        info!("Registered participant {}", request.id);
        Ok(StatusMarker {
            status: "registered".to_string(),
        })
    }

    /// Look up participant keys by id; absent ids are omitted
    pub async fn participant_keys(&self, ids: &[&str]) -> Result<HashMap<String, String>> {
        let mut keys = HashMap::new();
        for id in ids {
            if let Some(participant) = self.store.get_participant(id).await? {
                keys.insert(participant.id, hex::encode(participant.public_key));
            }
        }
        Ok(keys)
    }

    async fn get_wallet(&self, pubkey: &[u8]) -> Result<Wallet> {
        self.store.get(pubkey).await?.ok_or_else(|| {
            RecoveryNodeError::NotFound("no wallet for this public key".to_string())
        })
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Err(RecoveryNodeError::BadRequest(format!("missing {}", field)));
    }
    hex::decode(value)
        .map_err(|e| RecoveryNodeError::BadRequest(format!("{} is not hex: {}", field, e)))
}

fn validate_participant_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok {
        return Err(RecoveryNodeError::BadRequest(
            "participant id must be 1-64 chars of [A-Za-z0-9_-]".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_validation() {
        assert!(validate_participant_id("alice").is_ok());
        assert!(validate_participant_id("alice-2_b").is_ok());

        assert!(validate_participant_id("").is_err());
        assert!(validate_participant_id("../../etc/passwd").is_err());
        assert!(validate_participant_id(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_decode_hex_flags_field_name() {
        let err = decode_hex("public_key", "zz").unwrap_err();
        assert!(err.to_string().contains("public_key"));

        assert!(matches!(
            decode_hex("signature", ""),
            Err(RecoveryNodeError::BadRequest(_))
        ));
    }
}
