//! Loads the `user_name -> (pubkey, flags)` mapping and runs the
//! challenge/response flow against it.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::crypto;
use super::error::AuthError;

#[derive(Debug, Clone, Deserialize)]
struct UserRecord {
    pubkey: String,
    flags: String,
}

/// A pending challenge issued for one `reqauth`, scoped to the connection
/// that requested it. Dropped on disconnect, success, or failure.
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    pub user_name: String,
    pub challenge_hex: String,
    pub expected_answer_hex: String,
}

/// Read-only (after load) mapping of known users to their public keys and
/// flags.
#[derive(Debug, Clone, Default)]
pub struct AuthStore {
    users: HashMap<String, UserRecord>,
}

impl AuthStore {
    /// An empty store, useful for tests that only care about the unknown-user path.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Build a store directly from an in-memory map (used by tests and by
    /// `load`).
    #[must_use]
    pub fn from_map(users: HashMap<String, (String, String)>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|(name, (pubkey, flags))| (name, UserRecord { pubkey, flags }))
                .collect(),
        }
    }

    /// Load a JSON file shaped as `{"user": {"pubkey": "...", "flags": "..."}}`.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let contents = std::fs::read_to_string(path).map_err(|source| AuthError::Load {
            path: path.display().to_string(),
            source,
        })?;
        let users: HashMap<String, UserRecord> =
            serde_json::from_str(&contents).map_err(|source| AuthError::Malformed {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { users })
    }

    /// Generate a fresh challenge for `user_name`.
    pub fn generate_challenge(&self, user_name: &str) -> Result<PendingChallenge, AuthError> {
        let record = self
            .users
            .get(user_name)
            .ok_or_else(|| AuthError::UnknownUser(user_name.to_string()))?;

        let (challenge_hex, expected_answer_hex) =
            crypto::generate_auth_challenge(&record.pubkey)?;

        Ok(PendingChallenge {
            user_name: user_name.to_string(),
            challenge_hex,
            expected_answer_hex,
        })
    }

    /// Validate a client's hex reply against the pending challenge. Compares
    /// the absolute value of both sides — a documented quirk inherited from
    /// the upstream protocol: it transmits the reply unsigned while the
    /// underlying primitive yields a signed value, so both are folded to
    /// their magnitude before comparison.
    pub fn validate_reply(
        &self,
        reply_hex: &str,
        request: &PendingChallenge,
    ) -> Result<bool, AuthError> {
        let reply = parse_signed_hex(reply_hex)
            .ok_or_else(|| AuthError::InvalidReply(reply_hex.to_string()))?;
        let expected = parse_signed_hex(&request.expected_answer_hex)
            .ok_or_else(|| AuthError::InvalidReply(request.expected_answer_hex.clone()))?;

        Ok(reply.unsigned_abs() == expected.unsigned_abs())
    }

    /// The concatenated flag string for a known user.
    pub fn get_user_flags(&self, user_name: &str) -> Result<String, AuthError> {
        self.users
            .get(user_name)
            .map(|record| record.flags.clone())
            .ok_or_else(|| AuthError::UnknownUser(user_name.to_string()))
    }
}

fn parse_signed_hex(raw: &str) -> Option<i128> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let value = i128::from_str_radix(digits, 16).ok()?;
    Some(if negative { -value } else { value })
}
