use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tokens issued by the identity provider for one session.
///
/// Replaced as a whole on refresh. `expires_at` is in unix seconds; a set
/// without it is treated as expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

/// An organisation the authenticated identity may act for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRef {
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date_utc: Option<String>,
}

impl TenantRef {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tenant_type: None,
            tenant_name: None,
            id: None,
            created_date_utc: None,
            updated_date_utc: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl FromStr for SessionId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// CSRF state carried through the consent redirect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OAuthState(pub String);

impl AsRef<str> for OAuthState {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Requested scopes, kept in the order they were configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope(Vec<String>);

impl Scope {
    pub fn from_parts(parts: Vec<String>) -> Self {
        let mut seen = Vec::with_capacity(parts.len());
        for part in parts {
            if !part.is_empty() && !seen.contains(&part) {
                seen.push(part);
            }
        }
        Self(seen)
    }

    pub fn from_delimited_parts(parts: &str) -> Self {
        Self::from_parts(parts.split_whitespace().map(ToString::to_string).collect())
    }

    pub fn as_joined(&self) -> String {
        self.0.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_keeps_order_and_drops_duplicates() {
        let scope = Scope::from_delimited_parts("openid  profile openid offline_access");
        assert_eq!(scope.as_joined(), "openid profile offline_access");
        assert!(!scope.is_empty());
    }

    #[test]
    fn tenant_uses_provider_field_names() {
        let json = r#"{"id":"c1","tenantId":"T1","tenantType":"ORGANISATION","tenantName":"Demo","updatedDateUtc":"2023-01-02T00:00:00"}"#;
        let tenant: TenantRef = serde_json::from_str(json).unwrap();
        assert_eq!(tenant.tenant_id, "T1");
        assert_eq!(tenant.tenant_name.as_deref(), Some("Demo"));
        assert!(tenant.created_date_utc.is_none());
    }

    #[test]
    fn token_set_without_expiry_deserializes() {
        let set: TokenSet = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert_eq!(set.expires_at, None);
        assert_eq!(set.refresh_token, None);
    }
}
