use thiserror::Error;

/// Authentication errors surfaced by the auth store and challenge/response
/// flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("auth reply was not valid hex: {0}")]
    InvalidReply(String),

    #[error("failed to load auth store from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("auth store file at {path} is malformed: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Crypto(#[from] super::crypto::CryptoError),
}
