use std::sync::Arc;

use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::claims::Claims;
use crate::errors::AuthError;
use crate::traits::TokenVerifier;
use crate::types::AuthenticatedUser;

/// Turns an `Authorization` header into verified claims.
///
/// Order matters: the token is verified with the Identity Provider before its
/// payload is decoded, so unverified tokens never have their claims read.
#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn TokenVerifier>,
}

impl Authenticator {
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// # Errors
    /// Returns [`AuthError::MalformedHeader`], [`AuthError::VerificationFailed`]
    /// or [`AuthError::InvalidToken`]; all of them map to 400.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(headers).ok_or(AuthError::MalformedHeader)?;
        self.verifier.verify(token).await?;
        Claims::decode(token).map_err(AuthError::InvalidToken)
    }

    /// Authenticate and then require `required_scope` plus a usable `user_id`.
    ///
    /// # Errors
    /// Any [`Self::authenticate`] error, or [`AuthError::Unauthorized`] (401).
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required_scope: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.authenticate(headers).await?;
        claims
            .authorize(required_scope)
            .map_err(AuthError::from_claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The header must be exactly two space-separated parts; anything else,
/// including an empty token, yields `None`.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}
