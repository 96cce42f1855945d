use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};

use crate::domain::user::IdentityClaim;
use crate::http::AppError;
use crate::AppState;

/// The identity the external provider asserts for this request, carried as a
/// PASETO v4.local bearer token under a key shared with the provider.
#[derive(Debug, Clone)]
pub struct Identity(pub IdentityClaim);

#[axum::async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let claim = decrypt_identity(token, &state.identity_token_key)
            .ok_or_else(|| AppError::unauthorized("invalid identity token"))?;

        Ok(Identity(claim))
    }
}

fn decrypt_identity(token: &str, key_bytes: &[u8; 32]) -> Option<IdentityClaim> {
    let key = SymmetricKey::<V4>::from(key_bytes).ok()?;
    let mut rules = ClaimsValidationRules::new();
    rules.validate_audience_with("quill");

    let untrusted = UntrustedToken::<Local, V4>::try_from(token).ok()?;
    let trusted = local::decrypt(&key, &untrusted, &rules, None, None).ok()?;
    let claims = trusted.payload_claims()?;

    let token_identifier = claim_str(claims, "sub")?;
    Some(IdentityClaim {
        token_identifier,
        name: claim_str(claims, "name"),
        email: claim_str(claims, "email"),
        avatar_url: claim_str(claims, "picture"),
        username: claim_str(claims, "username"),
    })
}

fn claim_str(claims: &Claims, name: &str) -> Option<String> {
    claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}
