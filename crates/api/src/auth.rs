//! The 5-way credential precedence middleware (§6.2). Delegates
//! verification to `domain::services::identity::IdentityClient`, the way
//! the teacher's GitHub device-flow handlers delegated polling to
//! `AuthService` rather than talking to GitHub directly from the HTTP
//! layer.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use uuid::Uuid;

use domain::errors::DomainError;
use domain::models::user::User;
use domain::repositories::UserRepository;
use domain::services::identity::{IdentityClient, VerifiedIdentity};

use crate::error::ApiError;
use crate::state::AppState;

/// The verified caller, attached to request extensions by [`require_auth`]
/// and extracted by handlers via `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub(crate) struct AuthContext {
    pub(crate) user_id: Uuid,
}

#[derive(Debug)]
enum Credential {
    Jwt(String),
    ApiKey(String),
}

fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

/// Extracts every credential form present, in the §6.2 precedence order.
/// More than one form can be present at once (e.g. a stale `Cookie` header
/// alongside a valid API key) — each is attempted in order until one
/// verifies, so all present forms are collected rather than just the
/// first. The bare `Cookie` header (item 4) is the whole raw header value
/// used as an opaque session token when no `devpad_jwt` cookie pair is
/// present; it is distinct from item 3's named cookie and both are
/// collected when the header carries a `devpad_jwt` pair.
fn extract_credentials(headers: &HeaderMap) -> Vec<Credential> {
    let mut candidates = Vec::new();

    if let Some(token) = headers.get("Auth-Token").and_then(|v| v.to_str().ok()) {
        candidates.push(Credential::Jwt(token.to_string()));
    }

    let authorization = headers.get("Authorization").and_then(|v| v.to_str().ok());

    if let Some(auth) = authorization {
        if let Some(token) = auth.strip_prefix("Bearer jwt:") {
            candidates.push(Credential::Jwt(token.to_string()));
        }
    }

    if let Some(cookie_header) = headers.get("Cookie").and_then(|v| v.to_str().ok()) {
        if let Some(jwt) = cookie_value(cookie_header, "devpad_jwt") {
            candidates.push(Credential::Jwt(jwt));
        }
        candidates.push(Credential::Jwt(cookie_header.to_string()));
    }

    if let Some(auth) = authorization {
        if !auth.starts_with("Bearer jwt:") {
            if let Some(key) = auth.strip_prefix("Bearer ") {
                candidates.push(Credential::ApiKey(key.to_string()));
            }
        }
    }

    candidates
}

/// Upserts the local `User` row on first successful verification (§6.2
/// "the external user record is upserted locally").
async fn upsert_user(state: &AppState, identity: VerifiedIdentity) -> Result<User, DomainError> {
    let existing = UserRepository::find_by_external_identity_id(&state.infra.db, &identity.external_identity_id).await?;

    match existing {
        Some(mut user) => {
            user.display_name = identity.display_name;
            user.email = identity.email;
            user.updated_at = Utc::now();
            UserRepository::update(&state.infra.db, &user).await
        }
        None => {
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                external_identity_id: identity.external_identity_id,
                display_name: identity.display_name,
                email: identity.email,
                created_at: now,
                updated_at: now,
            };
            UserRepository::create(&state.infra.db, &user).await
        }
    }
}

/// Attempts each present credential form in §6.2 precedence order,
/// verifying against the external identity service, and stops at the
/// first one that verifies. A form that fails verification (expired,
/// malformed, unknown) does not end the request — the next form in
/// precedence order is tried. Only exhausting every present form is a
/// failure.
async fn verify_first(state: &AppState, candidates: Vec<Credential>) -> Result<VerifiedIdentity, DomainError> {
    for candidate in candidates {
        let result = match candidate {
            Credential::Jwt(token) => state.infra.identity.verify_jwt(&token).await,
            Credential::ApiKey(key) => state.infra.identity.verify_api_key(&key).await,
        };
        if let Ok(identity) = result {
            return Ok(identity);
        }
    }
    Err(DomainError::Forbidden("no credential verified".to_string()))
}

pub(crate) async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let candidates = extract_credentials(req.headers());
    let identity = verify_first(&state, candidates).await?;

    let user = upsert_user(&state, identity).await?;
    req.extensions_mut().insert(AuthContext { user_id: user.id });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(), value.parse().unwrap());
        }
        headers
    }

    #[test]
    fn auth_token_header_is_tried_first() {
        let headers = headers(&[
            ("Auth-Token", "precedence-token"),
            ("Authorization", "Bearer jwt:second-in-line"),
            ("Cookie", "devpad_jwt=third-in-line"),
        ]);

        let candidates = extract_credentials(&headers);
        match candidates.first() {
            Some(Credential::Jwt(token)) => assert_eq!(token, "precedence-token"),
            other => panic!("expected Auth-Token first, got {other:?}"),
        }
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn bearer_jwt_prefix_is_tried_before_the_named_cookie() {
        let headers = headers(&[("Authorization", "Bearer jwt:from-bearer"), ("Cookie", "devpad_jwt=from-cookie")]);

        let candidates = extract_credentials(&headers);
        match candidates.as_slice() {
            [Credential::Jwt(first), Credential::Jwt(second)] => {
                assert_eq!(first, "from-bearer");
                assert_eq!(second, "from-cookie");
            }
            other => panic!("expected [bearer jwt, named cookie], got {other:?}"),
        }
    }

    #[test]
    fn named_cookie_is_tried_before_the_raw_cookie_header() {
        let headers = headers(&[("Cookie", "other=1; devpad_jwt=named-value; more=2")]);

        let candidates = extract_credentials(&headers);
        match candidates.as_slice() {
            [Credential::Jwt(named), Credential::Jwt(raw)] => {
                assert_eq!(named, "named-value");
                assert_eq!(raw, "other=1; devpad_jwt=named-value; more=2");
            }
            other => panic!("expected [named cookie, raw cookie header], got {other:?}"),
        }
    }

    #[test]
    fn raw_cookie_header_is_used_as_an_opaque_session_token() {
        let headers = headers(&[("Cookie", "session=opaque-session-id")]);

        match extract_credentials(&headers).as_slice() {
            [Credential::Jwt(token)] => assert_eq!(token, "session=opaque-session-id"),
            other => panic!("expected the whole Cookie header as a session token, got {other:?}"),
        }
    }

    #[test]
    fn bare_bearer_token_is_treated_as_an_api_key() {
        let headers = headers(&[("Authorization", "Bearer sk-live-abc123")]);

        match extract_credentials(&headers).as_slice() {
            [Credential::ApiKey(key)] => assert_eq!(key, "sk-live-abc123"),
            other => panic!("expected an API key, got {other:?}"),
        }
    }

    #[test]
    fn no_credential_presented_yields_no_candidates() {
        assert!(extract_credentials(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn an_unverifiable_cookie_falls_through_to_a_valid_api_key() {
        let headers = headers(&[("Cookie", "session=stale-or-garbage"), ("Authorization", "Bearer sk-live-abc123")]);

        let candidates = extract_credentials(&headers);
        assert_eq!(candidates.len(), 2);
        match candidates.as_slice() {
            [Credential::Jwt(cookie), Credential::ApiKey(key)] => {
                assert_eq!(cookie, "session=stale-or-garbage");
                assert_eq!(key, "sk-live-abc123");
            }
            other => panic!("expected [cookie, api key] so verification can fall through, got {other:?}"),
        }
    }
}
