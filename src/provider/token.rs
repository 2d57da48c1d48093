use serde::Deserialize;

use crate::auth::expiry::Clock;
use crate::core::types::TokenSet;

/// Response body of the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Pin the relative `expires_in` to an absolute `expires_at`.
    pub fn into_token_set(self, clock: &dyn Clock) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            id_token: self.id_token,
            expires_at: self
                .expires_in
                .map(|secs| clock.now_secs().saturating_add(secs)),
        }
    }
}
