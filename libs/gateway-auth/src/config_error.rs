use thiserror::Error;

/// Errors that can occur while building a token verifier from configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid verification url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}
