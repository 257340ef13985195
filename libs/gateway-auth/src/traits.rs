use async_trait::async_trait;

use crate::errors::VerifyError;

/// Asks an authority whether a bearer token is authentic and current.
///
/// Implementations never inspect claims; that happens after a successful
/// verification.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// # Errors
    /// Returns [`VerifyError::Rejected`] when the authority refuses the token and
    /// [`VerifyError::Transport`] when it cannot be reached.
    async fn verify(&self, token: &str) -> Result<(), VerifyError>;
}
