// Liveness verification for Threshold Recovery Node
//
// A wallet owner proves they are alive by signing a timestamped message with
// the wallet key. The same ECDSA machinery authenticates a friend's mailbox
// pickup against a canonical challenge string.

use crate::error::{RecoveryNodeError, Result};

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};

/// Freshness window for liveness timestamps, as an absolute delta.
///
/// Slightly future timestamps (clock skew) are accepted; arbitrarily future
/// ones are rejected, which bounds the replay window on both sides. Narrowing
/// this window would break deployed signers, so it is a constant rather than
/// configuration.
pub const FRESHNESS_WINDOW_SECS: i64 = 300;

/// Expected signature encoding: R || S, each zero-padded to the scalar width
pub const SIGNATURE_LEN: usize = 64;

/// Canonical liveness message: `hex(pubkey) ":" decimal(timestamp)` in ASCII
pub fn liveness_message(pubkey: &[u8], timestamp: i64) -> Vec<u8> {
    format!("{}:{}", hex::encode(pubkey), timestamp).into_bytes()
}

/// Canonical pickup challenge: `"pickup:" hex(wallet_pk) ":" hex(friend_pk)`
pub fn pickup_challenge(wallet_pk: &[u8], friend_pk: &[u8]) -> Vec<u8> {
    format!("pickup:{}:{}", hex::encode(wallet_pk), hex::encode(friend_pk)).into_bytes()
}

/// Check that a timestamp lies within the freshness window of `now`
pub fn check_freshness(timestamp: i64, now: i64) -> Result<()> {
    let delta = (now - timestamp).abs();
    if delta > FRESHNESS_WINDOW_SECS {
        return Err(RecoveryNodeError::StaleTimestamp(format!(
            "timestamp is {}s away from server time, window is {}s",
            delta, FRESHNESS_WINDOW_SECS
        )));
    }
    Ok(())
}

/// Verify an ECDSA signature in R || S encoding against a public key
pub fn verify_signature(pubkey: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    if signature.len() != SIGNATURE_LEN {
        return Err(RecoveryNodeError::MalformedSignature(format!(
            "expected {} octets of R || S, got {}",
            SIGNATURE_LEN,
            signature.len()
        )));
    }

    let verifying_key = VerifyingKey::from_sec1_bytes(pubkey).map_err(|_| {
        RecoveryNodeError::InvalidPointEncoding("public key is not a valid curve point".to_string())
    })?;

    let signature = Signature::from_slice(signature).map_err(|_| {
        RecoveryNodeError::MalformedSignature("R or S is not a canonical scalar".to_string())
    })?;

    verifying_key
        .verify(message, &signature)
        .map_err(|_| RecoveryNodeError::InvalidSignature("signature does not verify".to_string()))
}

/// Validate a full liveness proof: freshness first, then the signature over
/// the canonical message. A stale proof is rejected before any curve work.
pub fn verify_liveness(pubkey: &[u8], timestamp: i64, signature: &[u8], now: i64) -> Result<()> {
    check_freshness(timestamp, now)?;
    verify_signature(pubkey, &liveness_message(pubkey, timestamp), signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    fn keypair() -> (SigningKey, Vec<u8>) {
        let signing_key = SigningKey::random(&mut OsRng);
        let pubkey = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        (signing_key, pubkey)
    }

    fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
        let signature: Signature = key.sign(message);
        signature.to_bytes().to_vec()
    }

    #[test]
    fn test_valid_proof_is_accepted() {
        let (key, pubkey) = keypair();
        let now = 1_700_000_000i64;

        let signature = sign(&key, &liveness_message(&pubkey, now));
        verify_liveness(&pubkey, now, &signature, now).unwrap();
    }

    #[test]
    fn test_freshness_window_edges() {
        let now = 1_700_000_000i64;

        // Exactly five minutes old: accepted. One second more: rejected.
        assert!(check_freshness(now - 300, now).is_ok());
        assert!(check_freshness(now - 301, now).is_err());

        // The window is symmetric around now
        assert!(check_freshness(now + 300, now).is_ok());
        assert!(check_freshness(now + 301, now).is_err());
    }

    #[test]
    fn test_replayed_proof_goes_stale() {
        let (key, pubkey) = keypair();
        let signed_at = 1_700_000_000i64;

        let signature = sign(&key, &liveness_message(&pubkey, signed_at));
        verify_liveness(&pubkey, signed_at, &signature, signed_at).unwrap();

        // Six minutes later the captured request no longer passes
        let err = verify_liveness(&pubkey, signed_at, &signature, signed_at + 360).unwrap_err();
        assert!(matches!(
            err,
            crate::error::RecoveryNodeError::StaleTimestamp(_)
        ));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let (key, pubkey) = keypair();
        let (_, other_pubkey) = keypair();
        let now = 1_700_000_000i64;

        let signature = sign(&key, &liveness_message(&other_pubkey, now));
        assert!(verify_liveness(&other_pubkey, now, &signature, now).is_err());

        // Signed message must match the claimed public key exactly
        let signature = sign(&key, &liveness_message(&pubkey, now));
        assert!(verify_liveness(&other_pubkey, now, &signature, now).is_err());
    }

    #[test]
    fn test_malformed_signature_encoding() {
        let (key, pubkey) = keypair();
        let now = 1_700_000_000i64;

        let mut signature = sign(&key, &liveness_message(&pubkey, now));
        signature.push(0);

        let err = verify_liveness(&pubkey, now, &signature, now).unwrap_err();
        assert!(matches!(
            err,
            crate::error::RecoveryNodeError::MalformedSignature(_)
        ));
    }

    #[test]
    fn test_pickup_challenge_binds_both_keys() {
        let (_, wallet) = keypair();
        let (friend_key, friend) = keypair();

        let challenge = pickup_challenge(&wallet, &friend);
        let signature = sign(&friend_key, &challenge);
        verify_signature(&friend, &challenge, &signature).unwrap();

        // A challenge for a different wallet must not verify
        let other_challenge = pickup_challenge(&friend, &friend);
        assert!(verify_signature(&friend, &other_challenge, &signature).is_err());
    }
}
