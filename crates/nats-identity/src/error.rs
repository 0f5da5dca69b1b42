//! Error types for nats-identity.
//!
//! Every failure carries a distinguishable kind so that the routing layer
//! can map it to a response without string matching. Seed material is never
//! included in error messages.

/// Coarse classification of an [`IssuerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: identifiers, parameter strings, request bodies, paths.
    Validation,
    /// A template, key, signing key or parent identity is absent.
    NotFound,
    /// Template instantiation lacks one or more variables.
    MissingParameters,
    /// Template text is not structurally valid after substitution.
    TemplateMalformed,
    /// Corrupt seed, invalid token or signing failure.
    KeyMaterial,
    /// Underlying store failure.
    Storage,
}

/// Issuer error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unsupported path: {0}")]
    UnsupportedPath(String),

    #[error("user template not found: {operator}/{account}/{user}")]
    UserTemplateNotFound {
        operator: String,
        account: String,
        user: String,
    },

    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Parent identity does not exist: {0}")]
    ParentNotFound(String),

    #[error("Signing key not found: {0}")]
    SigningKeyNotFound(String),

    #[error("Operator nkey does not exist: {0}")]
    OperatorKeyMissing(String),

    #[error("Account nkey does not exist: {0}")]
    AccountKeyMissing(String),

    #[error("User nkey does not exist: {0}")]
    UserKeyMissing(String),

    #[error("missing required template parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("Template malformed: {0}")]
    TemplateMalformed(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IssuerError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::UnsupportedPath(_) => ErrorKind::Validation,
            Self::UserTemplateNotFound { .. }
            | Self::IssueNotFound(_)
            | Self::ParentNotFound(_)
            | Self::SigningKeyNotFound(_)
            | Self::OperatorKeyMissing(_)
            | Self::AccountKeyMissing(_)
            | Self::UserKeyMissing(_) => ErrorKind::NotFound,
            Self::MissingParameters(_) => ErrorKind::MissingParameters,
            Self::TemplateMalformed(_) => ErrorKind::TemplateMalformed,
            Self::InvalidKey(_) | Self::InvalidToken(_) | Self::SignatureInvalid => {
                ErrorKind::KeyMaterial
            }
            Self::EncryptionFailed(_)
            | Self::InvalidPassphrase
            | Self::StorageError(_)
            | Self::SerializationError(_)
            | Self::Io(_) => ErrorKind::Storage,
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, IssuerError>;
