use std::fmt;

/// Core domain error, grouped by §7's taxonomy. Converted to an HTTP
/// status at the API boundary (`crates/api`); never constructed by
/// provider/store/vault code, which have their own narrower enums below.
#[derive(Debug)]
pub enum DomainError {
    /// Ownership: the resource does not exist, or does not belong to the
    /// caller and is treated as absent.
    NotFound(String),
    /// Ownership: the resource exists but the caller may not act on it.
    Forbidden(String),
    /// Validation: malformed or semantically invalid input.
    BadRequest(String),
    /// Validation: the request conflicts with existing state (e.g. a
    /// duplicate slug).
    Conflict(String),
    /// Auth: the caller's stored token has expired; this normally drives
    /// a refresh attempt before surfacing to the caller.
    AuthExpired(String),
    /// An upstream call failed in a way not worth a dedicated variant.
    ExternalService(String),
    Internal(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "not found: {msg}"),
            DomainError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            DomainError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            DomainError::Conflict(msg) => write!(f, "conflict: {msg}"),
            DomainError::AuthExpired(msg) => write!(f, "auth expired: {msg}"),
            DomainError::ExternalService(msg) => write!(f, "external service error: {msg}"),
            DomainError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<anyhow::Error> for DomainError {
    fn from(err: anyhow::Error) -> Self {
        DomainError::Internal(err.to_string())
    }
}

/// Provider-side failure (§7 "Provider"). Handled locally by the Account
/// Processor and never propagated past it except as a logged outcome.
#[derive(Debug)]
pub enum ProviderError {
    ApiError { status: u16 },
    BadRequest(String),
    RateLimited { retry_after_secs: Option<i64> },
    NetworkError(String),
    ParseError(String),
    AuthExpired(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::ApiError { status } => write!(f, "provider api error: status {status}"),
            ProviderError::BadRequest(msg) => write!(f, "provider bad request: {msg}"),
            ProviderError::RateLimited { retry_after_secs } => {
                write!(f, "provider rate limited, retry_after={retry_after_secs:?}")
            }
            ProviderError::NetworkError(cause) => write!(f, "provider network error: {cause}"),
            ProviderError::ParseError(msg) => write!(f, "provider parse error: {msg}"),
            ProviderError::AuthExpired(msg) => write!(f, "provider auth expired: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Versioned Store failure (§7 "Storage"). Callers inside the Assembler
/// treat this as an empty contribution from the affected platform rather
/// than failing the whole timeline.
#[derive(Debug)]
pub enum StoreError {
    StoreError { operation: String },
    ParseError(String),
    NotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::StoreError { operation } => write!(f, "store error during {operation}"),
            StoreError::ParseError(msg) => write!(f, "store parse error: {msg}"),
            StoreError::NotFound(msg) => write!(f, "store entry not found: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => DomainError::NotFound(msg),
            other => DomainError::Internal(other.to_string()),
        }
    }
}

/// Credential Vault failure (§7 "Crypto").
#[derive(Debug)]
pub enum VaultError {
    EncryptionError { operation: String },
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::EncryptionError { operation } => {
                write!(f, "encryption error during {operation}")
            }
        }
    }
}

impl std::error::Error for VaultError {}

impl From<VaultError> for DomainError {
    fn from(err: VaultError) -> Self {
        DomainError::Internal(err.to_string())
    }
}
