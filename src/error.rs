use thiserror::Error;

impl From<serde_json::Error> for VerificationError {
    fn from(err: serde_json::Error) -> Self {
        Self::EncodingError(format!("JSON error: {}", err))
    }
}

impl From<hex::FromHexError> for VerificationError {
    fn from(err: hex::FromHexError) -> Self {
        Self::EncodingError(format!("Invalid hex: {}", err))
    }
}

impl From<base64::DecodeError> for VerificationError {
    fn from(err: base64::DecodeError) -> Self {
        Self::EncodingError(format!("Invalid base64: {}", err))
    }
}

impl From<::config::ConfigError> for VerificationError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Checkpoint parse error: {0}")]
    ParseError(String),

    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    #[error("Root mismatch: calculated {calculated}, expected {expected}")]
    RootMismatch { expected: String, calculated: String },

    #[error("Root hash mismatch at tree size {size}: old {old}, new {new}")]
    RootHashMismatch { size: u64, old: String, new: String },

    #[error("Consistency proof failed: {0}")]
    ConsistencyFailed(String),

    #[error("Tree shrunk from size {old_size} to {new_size}")]
    TreeShrunk { old_size: u64, new_size: u64 },

    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Inclusion proof not provided")]
    MissingInclusionProof,

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Origin mismatch: expected {expected}, got {actual}")]
    OriginMismatch { expected: String, actual: String },

    #[error("Invalid public key: {0}")]
    KeyError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl VerificationError {
    pub fn root_mismatch(expected: &[u8], calculated: &[u8]) -> Self {
        Self::RootMismatch {
            expected: hex::encode(expected),
            calculated: hex::encode(calculated),
        }
    }

    pub fn root_hash_mismatch(size: u64, old: &[u8], new: &[u8]) -> Self {
        Self::RootHashMismatch {
            size,
            old: hex::encode(old),
            new: hex::encode(new),
        }
    }

    /// Trust violations: the log has forked or rewritten history. Callers
    /// should stop trusting the log rather than reject a single proof.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TreeShrunk { .. } | Self::RootHashMismatch { .. }
        )
    }

    /// The input could not be interpreted at all, as opposed to being
    /// cryptographically rejected.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::ParseError(_)
                | Self::InvalidProof(_)
                | Self::MissingField(_)
                | Self::MissingInclusionProof
                | Self::EncodingError(_)
                | Self::KeyError(_)
                | Self::ConfigError(_)
        )
    }

    /// Well-formed input that failed a cryptographic or trust check.
    pub fn is_rejection(&self) -> bool {
        !self.is_malformed_input()
    }
}

pub type Result<T> = std::result::Result<T, VerificationError>;
