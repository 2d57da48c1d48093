use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xero_userid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xero_userid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Identity decoded from the tokens issued at callback time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub id_token: IdTokenClaims,
    pub access_token: AccessTokenClaims,
}

impl IdentityClaims {
    /// User identifier projected to the browser.
    pub fn user_id(&self) -> &str {
        &self.access_token.sub
    }
}

// Signatures are not checked here; the tokens come straight from the token
// endpoint over TLS.
pub fn decode_access_token(token: &str) -> Result<AccessTokenClaims, Error> {
    Ok(jsonwebtoken::dangerous_insecure_decode::<AccessTokenClaims>(token)?.claims)
}

pub fn decode_id_token(token: &str) -> Result<IdTokenClaims, Error> {
    Ok(jsonwebtoken::dangerous_insecure_decode::<IdTokenClaims>(token)?.claims)
}

pub fn decode_identity(id_token: &str, access_token: &str) -> Result<IdentityClaims, Error> {
    Ok(IdentityClaims {
        id_token: decode_id_token(id_token)?,
        access_token: decode_access_token(access_token)?,
    })
}
