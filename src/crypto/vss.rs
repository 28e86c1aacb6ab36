//! Verifiable secret sharing over P-256.
//!
//! A dealer splits a secret scalar into `n` Shamir shares with threshold `k`
//! and publishes one commitment point per polynomial coefficient. Any
//! shareholder can check that their share lies on the dealer's polynomial
//! without learning the secret, and any `k` shares reconstruct it by Lagrange
//! interpolation at zero.

use crate::crypto::{encode_point, parse_point, POINT_LEN};
use crate::error::{RecoveryNodeError, Result};

use p256::elliptic_curve::Field;
use p256::{ProjectivePoint, Scalar};
use rand::rngs::OsRng;

/// A piece of the secret: the polynomial evaluated at a non-zero index.
///
/// Index 0 is reserved for the secret itself and is never issued.
#[derive(Debug, Clone, Copy)]
pub struct Share {
    /// Evaluation point, 1-based
    pub index: u32,
    /// Polynomial value at the index
    pub value: Scalar,
}

/// The dealer's output: all shares plus the public commitment blob
#[derive(Debug, Clone)]
pub struct Dealing {
    /// Shares at indices 1..=n, in order
    pub shares: Vec<Share>,
    /// Concatenated uncompressed points C_0 || C_1 || ... || C_{k-1}
    pub commitment: Vec<u8>,
}

/// Split a secret into `n` shares with reconstruction threshold `k`.
///
/// The commitment's first point `C_0` is the secret's public point, which
/// pins the polynomial's constant term to the dealer's identity.
pub fn split(secret: &Scalar, n: u32, k: u32) -> Result<Dealing> {
    if k < 2 {
        return Err(RecoveryNodeError::BadRequest(format!(
            "threshold k must be at least 2, got {}",
            k
        )));
    }
    if k > n {
        return Err(RecoveryNodeError::BadRequest(format!(
            "threshold k ({}) cannot exceed share count n ({})",
            k, n
        )));
    }

    // f(x) = secret + a_1 x + ... + a_{k-1} x^{k-1}
    let mut coefficients = Vec::with_capacity(k as usize);
    coefficients.push(*secret);
    for _ in 1..k {
        coefficients.push(Scalar::random(&mut OsRng));
    }

    let shares = (1..=n)
        .map(|index| Share {
            index,
            value: evaluate(&coefficients, index),
        })
        .collect();

    let mut commitment = Vec::with_capacity(k as usize * POINT_LEN);
    for coefficient in &coefficients {
        commitment.extend_from_slice(&encode_point(&(ProjectivePoint::GENERATOR * coefficient)));
    }

    Ok(Dealing { shares, commitment })
}

/// Horner evaluation of the share polynomial at a small index
fn evaluate(coefficients: &[Scalar], index: u32) -> Scalar {
    let x = Scalar::from(index as u64);
    let mut acc = Scalar::ZERO;
    for coefficient in coefficients.iter().rev() {
        acc = acc * x + coefficient;
    }
    acc
}

/// Parse a commitment blob into its points, rejecting malformed blobs
pub fn commitment_points(blob: &[u8]) -> Result<Vec<ProjectivePoint>> {
    if blob.is_empty() || blob.len() % POINT_LEN != 0 {
        return Err(RecoveryNodeError::InvalidCommitment(format!(
            "commitment blob length {} is not a multiple of the point size",
            blob.len()
        )));
    }

    let k = blob.len() / POINT_LEN;
    if k < 2 {
        return Err(RecoveryNodeError::InvalidCommitment(format!(
            "commitment carries {} point(s), threshold schemes need at least 2",
            k
        )));
    }

    blob.chunks(POINT_LEN).map(parse_point).collect()
}

/// Check a share against the dealer's commitment.
///
/// Accepts iff `value * G == sum((index^j) * C_j)` as affine points. A
/// malformed blob is an error; a well-formed blob that does not match the
/// share returns `Ok(false)`.
pub fn verify_share(index: u32, value: &Scalar, commitment: &[u8]) -> Result<bool> {
    if index == 0 {
        return Err(RecoveryNodeError::InvalidCommitment(
            "share index 0 is reserved for the secret".to_string(),
        ));
    }

    let points = commitment_points(commitment)?;

    let lhs = ProjectivePoint::GENERATOR * value;

    let x = Scalar::from(index as u64);
    let mut power = Scalar::ONE;
    let mut rhs = points[0];
    for point in &points[1..] {
        power *= x;
        rhs += *point * power;
    }

    Ok(lhs.to_affine() == rhs.to_affine())
}

/// Reconstruct the secret from at least `k` shares by Lagrange interpolation
/// at zero. The caller supplies whichever shares it collected; indices must
/// be distinct and non-zero.
pub fn combine(shares: &[Share]) -> Result<Scalar> {
    if shares.len() < 2 {
        return Err(RecoveryNodeError::BadRequest(format!(
            "need at least 2 shares to reconstruct, got {}",
            shares.len()
        )));
    }

    for (i, share) in shares.iter().enumerate() {
        if share.index == 0 {
            return Err(RecoveryNodeError::BadRequest(
                "share index 0 is reserved for the secret".to_string(),
            ));
        }
        if shares[..i].iter().any(|s| s.index == share.index) {
            return Err(RecoveryNodeError::BadRequest(format!(
                "duplicate share index {}",
                share.index
            )));
        }
    }

    let mut secret = Scalar::ZERO;
    for share in shares {
        let x_i = Scalar::from(share.index as u64);

        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for other in shares {
            if other.index == share.index {
                continue;
            }
            let x_j = Scalar::from(other.index as u64);
            numerator *= x_j;
            denominator *= x_j - x_i;
        }

        let inverse: Option<Scalar> = denominator.invert().into();
        let inverse = inverse.ok_or_else(|| {
            RecoveryNodeError::Internal("degenerate share indices".to_string())
        })?;

        secret += share.value * numerator * inverse;
    }

    Ok(secret)
}
