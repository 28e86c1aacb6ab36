// Crypto module for Threshold Recovery Node
//
// This module provides the curve primitives over P-256 used by the secret
// sharing engine and the liveness verifier, the keyed derivation of storage
// identifiers, and the at-rest sealing of the node's own share.

use crate::error::{RecoveryNodeError, Result};

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hmac::{Hmac, Mac};
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::elliptic_curve::PrimeField;
use p256::{AffinePoint, EncodedPoint, FieldBytes, NonZeroScalar, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

pub mod liveness;
pub mod vss;

type HmacSha256 = Hmac<Sha256>;

/// Length of an uncompressed SEC1 point encoding (0x04 || X || Y)
pub const POINT_LEN: usize = 65;

/// Length of a canonical big-endian scalar encoding
pub const SCALAR_LEN: usize = 32;

/// Length of the nonce prefixed to a sealed share
const SEAL_NONCE_LEN: usize = 12;

/// Parse an uncompressed curve point, checking it lies on the curve
pub fn parse_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    if bytes.len() != POINT_LEN || bytes[0] != 0x04 {
        return Err(RecoveryNodeError::InvalidPointEncoding(format!(
            "expected {} uncompressed octets, got {}",
            POINT_LEN,
            bytes.len()
        )));
    }

    let encoded = EncodedPoint::from_bytes(bytes).map_err(|e| {
        RecoveryNodeError::InvalidPointEncoding(format!("malformed point encoding: {}", e))
    })?;

    let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
    let affine = affine.ok_or_else(|| {
        RecoveryNodeError::InvalidPointEncoding("coordinates are not on the curve".to_string())
    })?;

    Ok(ProjectivePoint::from(affine))
}

/// Serialize a curve point to its uncompressed encoding
pub fn encode_point(point: &ProjectivePoint) -> Vec<u8> {
    point.to_affine().to_encoded_point(false).as_bytes().to_vec()
}

/// Parse a canonical big-endian scalar, rejecting values >= the curve order
pub fn parse_scalar(bytes: &[u8]) -> Result<Scalar> {
    if bytes.len() != SCALAR_LEN {
        return Err(RecoveryNodeError::ScalarOutOfRange(format!(
            "expected {} octets, got {}",
            SCALAR_LEN,
            bytes.len()
        )));
    }

    let repr = FieldBytes::clone_from_slice(bytes);
    let scalar: Option<Scalar> = Scalar::from_repr(repr).into();
    scalar.ok_or_else(|| {
        RecoveryNodeError::ScalarOutOfRange("value is not canonical for the curve order".to_string())
    })
}

/// Serialize a scalar to its canonical big-endian encoding
pub fn encode_scalar(scalar: &Scalar) -> Vec<u8> {
    scalar.to_repr().to_vec()
}

/// Generate a fresh keypair; returns (uncompressed public point, secret scalar)
pub fn generate_keypair() -> (Vec<u8>, Zeroizing<Vec<u8>>) {
    let secret = NonZeroScalar::random(&mut OsRng);
    let public = ProjectivePoint::GENERATOR * *secret;

    (
        encode_point(&public),
        Zeroizing::new(secret.to_repr().to_vec()),
    )
}

/// Derive the blinded storage identifier for a wallet public key.
///
/// An attacker reading the data directory learns neither which public keys
/// are registered nor can mount a targeted lookup without the keyed secret.
pub fn derive_storage_id(secret: &[u8], pubkey: &[u8]) -> String {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(pubkey);
    hex::encode(mac.finalize().into_bytes())
}

/// Derive the mailbox slot identifier for a (wallet, friend) key pair
pub fn derive_friend_slot(secret: &[u8], wallet_pk: &[u8], friend_pk: &[u8]) -> String {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(wallet_pk);
    mac.update(friend_pk);
    hex::encode(mac.finalize().into_bytes())
}

/// Derive a 32-byte sealing key from the node master secret and a context label
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(context.as_bytes());
    hasher.update(key_material);
    let mut output = [0u8; 32];
    output.copy_from_slice(hasher.finalize().as_bytes());
    output
}

/// Seal a share for storage at rest.
///
/// Output framing: [nonce (12 bytes)][ciphertext]
pub fn seal_share(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; SEAL_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| RecoveryNodeError::Internal("share sealing failed".to_string()))?;

    let mut output = Vec::with_capacity(SEAL_NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Open a sealed share. The plaintext only lives as long as the caller needs it.
pub fn open_share(key: &[u8; 32], sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.len() < SEAL_NONCE_LEN {
        return Err(RecoveryNodeError::Internal(
            "sealed share shorter than nonce".to_string(),
        ));
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(&sealed[..SEAL_NONCE_LEN]);

    let plaintext = cipher
        .decrypt(nonce, &sealed[SEAL_NONCE_LEN..])
        .map_err(|_| RecoveryNodeError::Internal("share unsealing failed".to_string()))?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_round_trip() {
        let (public, _secret) = generate_keypair();
        let point = parse_point(&public).unwrap();
        assert_eq!(encode_point(&point), public);
    }

    #[test]
    fn test_parse_point_rejects_garbage() {
        assert!(parse_point(&[0u8; 10]).is_err());

        // Right length, wrong tag
        let mut bytes = vec![0x02u8];
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(parse_point(&bytes).is_err());

        // Right shape, coordinates off the curve
        let mut bytes = vec![0x04u8];
        bytes.extend_from_slice(&[1u8; 64]);
        assert!(parse_point(&bytes).is_err());
    }

    #[test]
    fn test_parse_scalar_rejects_order() {
        // The curve order itself is not a canonical scalar
        let order = hex::decode("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551")
            .unwrap();
        assert!(parse_scalar(&order).is_err());

        let one = {
            let mut b = [0u8; 32];
            b[31] = 1;
            b
        };
        assert!(parse_scalar(&one).is_ok());
    }

    #[test]
    fn test_storage_id_deterministic_and_keyed() {
        let (pk, _) = generate_keypair();

        let id1 = derive_storage_id(b"secret-a", &pk);
        let id2 = derive_storage_id(b"secret-a", &pk);
        let id3 = derive_storage_id(b"secret-b", &pk);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1.len(), 64);
    }

    #[test]
    fn test_friend_slot_distinguishes_pairs() {
        let (wallet, _) = generate_keypair();
        let (alice, _) = generate_keypair();
        let (bob, _) = generate_keypair();

        let slot_a = derive_friend_slot(b"secret", &wallet, &alice);
        let slot_b = derive_friend_slot(b"secret", &wallet, &bob);
        assert_ne!(slot_a, slot_b);
    }

    #[test]
    fn test_seal_and_open_share() {
        let key = derive_key("share-seal", b"master");
        let plaintext = b"thirty-two bytes of share value!";

        let sealed = seal_share(&key, plaintext).unwrap();
        assert_ne!(&sealed[SEAL_NONCE_LEN..], plaintext.as_slice());

        let opened = open_share(&key, &sealed).unwrap();
        assert_eq!(opened.as_slice(), plaintext.as_slice());

        // Tampering must not go unnoticed
        let mut tampered = sealed.clone();
        tampered[SEAL_NONCE_LEN] ^= 0x01;
        assert!(open_share(&key, &tampered).is_err());
    }
}
