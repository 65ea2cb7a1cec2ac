//! Identity-service adapter (§6.2). Verifies the two credential forms
//! the core itself understands, JWTs and API keys, against an external
//! identity service over HTTP; it never validates credentials itself.

use async_trait::async_trait;
use domain::errors::DomainError;
use domain::services::identity::{IdentityClient, VerifiedIdentity};
use reqwest::Client;
use serde::Deserialize;

pub struct HttpIdentityClient {
    client: Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn verify(&self, path: &str, token: &str) -> Result<VerifiedIdentity, DomainError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DomainError::ExternalService(format!("identity service unreachable: {e}")))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DomainError::AuthExpired("credential rejected by identity service".to_string()));
        }

        if !response.status().is_success() {
            return Err(DomainError::ExternalService(format!(
                "identity service returned status {}",
                response.status()
            )));
        }

        let parsed: IdentityResponse = response
            .json()
            .await
            .map_err(|e| DomainError::ExternalService(format!("malformed identity response: {e}")))?;

        Ok(VerifiedIdentity {
            external_identity_id: parsed.id,
            display_name: parsed.name,
            email: parsed.email,
        })
    }
}

#[derive(Deserialize)]
struct IdentityResponse {
    id: String,
    name: String,
    email: String,
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn verify_jwt(&self, token: &str) -> Result<VerifiedIdentity, DomainError> {
        self.verify("/api/v1/verify/jwt", token).await
    }

    async fn verify_api_key(&self, key: &str) -> Result<VerifiedIdentity, DomainError> {
        self.verify("/api/v1/verify/api-key", key).await
    }
}
