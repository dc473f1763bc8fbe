//! Signing with a fixed nonce, as required for the Taiko anchor transaction.
//!
//! The anchor transaction must be reproducible by every node, so the ECDSA nonce `k` is not
//! random: the protocol signs with `k = 1`, falling back to `k = 2` if the first attempt yields an
//! invalid signature.
//!
//! Ref: <https://github.com/taikoxyz/taiko-mono/blob/v0.18.0/packages/taiko-client/driver/signer/fixed_k_signer.go>

use alloy_primitives::{B256, Signature, U256};
use k256::{
    FieldBytes, ProjectivePoint, Scalar,
    elliptic_curve::{PrimeField, ops::Reduce, point::AffineCoordinates, scalar::IsHigh},
};
use tracing::warn;

/// Errors that can occur while signing with a fixed nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeterministicSignerError {
    /// The private key is not a valid non-zero scalar.
    #[error("invalid private key")]
    InvalidPrivateKey,
    /// Neither `k = 1` nor `k = 2` produced a valid signature.
    #[error("failed to sign with k = 1 and k = 2")]
    NoValidSignature,
}

/// Sign the given 32-byte hash with the given private key, using `k = 1` and then `k = 2` as
/// the ECDSA nonce. The signature is normalized to low-S form.
pub fn sign_hash_deterministic(
    private_key: B256,
    hash: B256,
) -> Result<Signature, DeterministicSignerError> {
    let secret = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(
        private_key.as_slice(),
    )))
    .filter(|scalar| !bool::from(scalar.is_zero()))
    .ok_or(DeterministicSignerError::InvalidPrivateKey)?;

    let z = <Scalar as Reduce<k256::U256>>::reduce_bytes(&FieldBytes::clone_from_slice(
        hash.as_slice(),
    ));

    if let Some(signature) = sign_with_k(&secret, &z, 1) {
        return Ok(signature);
    }

    warn!(%hash, "Signing with k = 1 failed, retrying with k = 2");
    sign_with_k(&secret, &z, 2).ok_or(DeterministicSignerError::NoValidSignature)
}

/// Computes `r = x(k * G) mod n` and `s = k^-1 * (z + r * d) mod n`.
///
/// Returns `None` if `r` or `s` is zero.
fn sign_with_k(secret: &Scalar, z: &Scalar, k: u64) -> Option<Signature> {
    let k = Scalar::from(k);
    let point = (ProjectivePoint::GENERATOR * k).to_affine();

    let r = <Scalar as Reduce<k256::U256>>::reduce_bytes(&point.x());
    if bool::from(r.is_zero()) {
        return None;
    }

    let k_inv = Option::<Scalar>::from(k.invert())?;
    let mut s = k_inv * (*z + r * secret);
    if bool::from(s.is_zero()) {
        return None;
    }

    // Low-S normalization: negating s mirrors R, so the recovery bit flips too.
    let mut y_parity = bool::from(point.y_is_odd());
    if bool::from(s.is_high()) {
        s = -s;
        y_parity = !y_parity;
    }

    Some(Signature::new(
        U256::from_be_slice(r.to_bytes().as_slice()),
        U256::from_be_slice(s.to_bytes().as_slice()),
        y_parity,
    ))
}
