//! External identity verification (§6.2). This core never issues or
//! validates credentials itself; it delegates to an external identity
//! service and only consumes the verified result.

use async_trait::async_trait;

use crate::errors::DomainError;

/// The verified identity an external identity-service call resolves a
/// caller's credential to.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub external_identity_id: String,
    pub display_name: String,
    pub email: String,
}

/// Contract for verifying one of the five credential forms accepted at
/// the API boundary (§6.2). Infrastructure implements this over HTTP
/// against the external identity service.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn verify_jwt(&self, token: &str) -> Result<VerifiedIdentity, DomainError>;
    async fn verify_api_key(&self, key: &str) -> Result<VerifiedIdentity, DomainError>;
}
