//! REST error mapping.
//!
//! Every failure is answered with a bare status and an empty body; the cause is
//! logged here, once, where it is collapsed to the status.

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use gateway_auth::AuthError;
use http::StatusCode;
use thiserror::Error;

use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("undecodable form body: {0}")]
    Form(#[from] FormRejection),

    #[error("undecodable query string: {0}")]
    Query(#[from] QueryRejection),

    #[error("missing form field {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(e) => e.status(),
            Self::Form(_) | Self::Query(_) | Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::Domain(e) => domain_status(e),
        }
    }
}

fn domain_status(e: &DomainError) -> StatusCode {
    match e {
        DomainError::InvalidContinuation(e) if !e.is_caller_fault() => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        DomainError::UnknownPrompt { .. } | DomainError::InvalidContinuation(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        DomainError::UnsupportedService { .. } => StatusCode::NOT_IMPLEMENTED,
        DomainError::Seal(_) | DomainError::Ledger(_) | DomainError::Provider(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Domain(DomainError::InsufficientFunds) => {
                tracing::info!(status = status.as_u16(), "request refused: insufficient funds");
            }
            _ if status.is_server_error() => {
                tracing::error!(status = status.as_u16(), error = %self, "request failed");
            }
            _ => {
                tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
            }
        }
        status.into_response()
    }
}
