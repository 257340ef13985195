use thiserror::Error;

/// Errors that can occur while decoding a bearer token payload or reading its claims
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    #[error("Malformed token: expected 3 dot-separated segments, got {segments}")]
    Malformed { segments: usize },

    #[error("Token payload decode failed: {0}")]
    DecodeFailed(String),

    #[error("Missing required claim: {0}")]
    MissingClaim(&'static str),

    #[error("Invalid claim format: {field} - {reason}")]
    InvalidClaimFormat {
        field: &'static str,
        reason: String,
    },

    #[error("Required scope '{required}' not granted")]
    ScopeNotGranted { required: String },
}

impl ClaimsError {
    /// `true` when the token itself could not be parsed, as opposed to a parsed
    /// token that lacks the claims a route needs.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Malformed { .. } | Self::DecodeFailed(_))
    }
}
