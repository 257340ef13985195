use http::StatusCode;
use thiserror::Error;

use crate::claims_error::ClaimsError;

/// Outcome of asking the Identity Provider about a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("identity provider rejected token with status {status}")]
    Rejected { status: u16 },

    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header missing or not of the form 'Bearer <token>'")]
    MalformedHeader,

    #[error("Token verification failed: {0}")]
    VerificationFailed(#[from] VerifyError),

    #[error("Invalid token: {0}")]
    InvalidToken(#[source] ClaimsError),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[source] ClaimsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Split a claims failure into "bad token" (400) and "token lacks rights" (401).
    #[must_use]
    pub fn from_claims(err: ClaimsError) -> Self {
        if err.is_structural() {
            Self::InvalidToken(err)
        } else {
            Self::Unauthorized(err)
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedHeader | Self::VerificationFailed(_) | Self::InvalidToken(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Auth failures are answered with the bare status; the reason is only logged.
#[cfg(feature = "axum-ext")]
impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        self.status().into_response()
    }
}
