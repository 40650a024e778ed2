//! Stand-in for the opaque challenge/response cryptographic primitive.
//!
//! The real Cube2 master performs scalar multiplication on a specific curve
//! to derive `(challenge, expected_answer)` from a user's public key; that
//! primitive is an external collaborator here (see spec's auth section).
//! This module preserves its documented contract — a random hex challenge
//! paired with a hex expected-answer derived deterministically from the
//! challenge and the user's public key — using HMAC-SHA256 instead of curve
//! arithmetic, including the "compare absolute values" validation quirk.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const CHALLENGE_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("public key is not valid hex: {0}")]
    InvalidPubkey(#[from] hex::FromHexError),
    #[error("failed to obtain secure random bytes for challenge")]
    EntropyUnavailable,
    #[error("HMAC key of this length is not supported")]
    InvalidKeyLength,
}

/// Generate a fresh `(challenge_hex, expected_answer_hex)` pair for the
/// given hex-encoded public key.
pub fn generate_auth_challenge(pubkey_hex: &str) -> Result<(String, String), CryptoError> {
    let pubkey = hex::decode(pubkey_hex)?;

    let mut challenge_bytes = [0u8; CHALLENGE_BYTES];
    getrandom::fill(&mut challenge_bytes).map_err(|_| CryptoError::EntropyUnavailable)?;
    let challenge_hex = hex::encode(challenge_bytes);

    let expected_answer_hex = derive_answer(&pubkey, &challenge_bytes)?;

    Ok((challenge_hex, expected_answer_hex))
}

/// Recompute the expected answer for a known pubkey/challenge pair. Used by
/// validation so the master never has to store anything but the challenge.
fn derive_answer(pubkey: &[u8], challenge: &[u8]) -> Result<String, CryptoError> {
    let mut mac =
        HmacSha256::new_from_slice(pubkey).map_err(|_| CryptoError::InvalidKeyLength)?;
    mac.update(challenge);
    let digest = mac.finalize().into_bytes();
    Ok(hex::encode(digest))
}

/// Recompute what the expected answer would be, for use by validation logic
/// that already holds the original challenge hex.
pub fn expected_answer_for(pubkey_hex: &str, challenge_hex: &str) -> Result<String, CryptoError> {
    let pubkey = hex::decode(pubkey_hex)?;
    let challenge = hex::decode(challenge_hex)?;
    derive_answer(&pubkey, &challenge)
}
