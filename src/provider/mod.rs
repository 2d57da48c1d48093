//! Adapter for the Xero identity service.

pub mod claims;
pub mod token;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{event, Level};
use url::Url;

use crate::auth::expiry::Clock;
use crate::auth::refresh::TokenRefresher;
use crate::core::types::{OAuthState, Scope, TenantRef, TokenSet};
use crate::error::Error;
use token::TokenResponse;

pub const XERO_AUTHORIZE_URL: &str = "https://login.xero.com/identity/connect/authorize";
pub const XERO_TOKEN_URL: &str = "https://identity.xero.com/connect/token";
pub const XERO_CONNECTIONS_URL: &str = "https://api.xero.com/connections";

pub const DEFAULT_SCOPES: &str = "openid profile email accounting.settings accounting.reports.read accounting.journals.read accounting.contacts accounting.attachments accounting.transactions offline_access";

/// Everything the service needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: TokenRefresher {
    /// Provider-hosted page where the user grants access.
    async fn consent_url(&self, state: &OAuthState) -> Result<Url, Error>;

    /// Trade an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, Error>;

    /// Tenants the token may act for, most recently updated first.
    async fn tenants(&self, access_token: &str) -> Result<Vec<TenantRef>, Error>;
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
    pub scope: Scope,
    pub authorize_url: Url,
    pub token_url: Url,
    pub connections_url: Url,
}

pub struct XeroClient {
    config: ProviderConfig,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for XeroClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XeroClient {{ client_id: {:?}, .. }}", self.config.client_id)
    }
}

impl XeroClient {
    pub fn new(config: ProviderConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            clock,
        }
    }

    pub fn authorization_url(&self, state: &OAuthState) -> Url {
        let mut url = self.config.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &self.config.scope.as_joined())
            .append_pair("state", state.as_ref());
        url
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<TokenSet, Error> {
        let response = self
            .http
            .post(self.config.token_url.clone())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(params)
            .send()
            .await?;

        let response = ensure_success(response, operation).await?;
        let body = response.json::<TokenResponse>().await?;
        Ok(body.into_token_set(self.clock.as_ref()))
    }
}

#[async_trait]
impl TokenRefresher for XeroClient {
    #[tracing::instrument(skip_all)]
    async fn refresh(&self, token_set: &TokenSet) -> Result<TokenSet, Error> {
        let refresh_token = token_set.refresh_token.as_deref().ok_or_else(|| Error::Provider {
            operation: "token refresh",
            status: None,
            detail: "no refresh token".into(),
        })?;

        event!(Level::DEBUG, "Requesting refresh_token grant");
        self.token_request(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            "token refresh",
        )
        .await
    }
}

#[async_trait]
impl IdentityProvider for XeroClient {
    async fn consent_url(&self, state: &OAuthState) -> Result<Url, Error> {
        Ok(self.authorization_url(state))
    }

    #[tracing::instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, Error> {
        event!(Level::DEBUG, "Requesting authorization_code grant");
        self.token_request(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ],
            "token exchange",
        )
        .await
    }

    #[tracing::instrument(skip_all)]
    async fn tenants(&self, access_token: &str) -> Result<Vec<TenantRef>, Error> {
        let response = self
            .http
            .get(self.config.connections_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = ensure_success(response, "connections request").await?;
        let mut tenants = response.json::<Vec<TenantRef>>().await?;
        sort_most_recent_first(&mut tenants);
        event!(Level::DEBUG, count = tenants.len(), "Fetched tenant connections");
        Ok(tenants)
    }
}

/// Stable sort on `updatedDateUtc`, newest first, undated last.
pub fn sort_most_recent_first(tenants: &mut [TenantRef]) {
    tenants.sort_by(|a, b| b.updated_date_utc.cmp(&a.updated_date_utc));
}

async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();
    Err(Error::Provider {
        operation,
        status: Some(status),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::expiry::FixedClock;

    fn client() -> XeroClient {
        let config = ProviderConfig {
            client_id: "client-1".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:5000/callback".parse().unwrap(),
            scope: Scope::from_delimited_parts(DEFAULT_SCOPES),
            authorize_url: XERO_AUTHORIZE_URL.parse().unwrap(),
            token_url: XERO_TOKEN_URL.parse().unwrap(),
            connections_url: XERO_CONNECTIONS_URL.parse().unwrap(),
        };
        XeroClient::new(config, Arc::new(FixedClock::at_secs(0)))
    }

    #[test]
    fn authorization_url_carries_request_parameters() {
        let url = client().authorization_url(&OAuthState("xyz".into()));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(url.host_str(), Some("login.xero.com"));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("client_id"), Some("client-1"));
        assert_eq!(get("redirect_uri"), Some("http://localhost:5000/callback"));
        assert_eq!(get("state"), Some("xyz"));
        assert!(get("scope").unwrap().ends_with("offline_access"));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails_locally() {
        let set = TokenSet {
            access_token: "a".into(),
            refresh_token: None,
            id_token: None,
            expires_at: None,
        };

        let err = client().refresh(&set).await.unwrap_err();
        assert!(matches!(err, Error::Provider { status: None, .. }));
    }

    #[test]
    fn tenants_are_ordered_newest_first() {
        let mut tenants = vec![
            TenantRef {
                updated_date_utc: Some("2023-01-01T00:00:00".into()),
                ..TenantRef::new("old")
            },
            TenantRef::new("undated"),
            TenantRef {
                updated_date_utc: Some("2024-06-01T00:00:00".into()),
                ..TenantRef::new("new")
            },
        ];

        sort_most_recent_first(&mut tenants);

        let ids: Vec<&str> = tenants.iter().map(|t| t.tenant_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }
}
