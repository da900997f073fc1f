//! Error types for the portal client.

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("portal session is invalid or expired: {0}")]
    InvalidSession(String),
    #[error("failed to parse page")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    RequestFailed(#[from] anyhow::Error),
}
