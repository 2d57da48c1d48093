#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} failed (status {status:?}): {detail}")]
    Provider {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("token decode error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("callback error: {0}")]
    Callback(String),
    #[error("OAuth state mismatch")]
    StateMismatch,
    #[error("no tenants are connected to this identity")]
    NoTenants,
    #[error("active tenant {0} is not one of the connected tenants")]
    TenantNotListed(String),
    #[error("session store error: {0}")]
    Session(String),
}
