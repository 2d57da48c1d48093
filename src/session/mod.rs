//! Server-side session state and its storage.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::{OAuthState, SessionId, TenantRef, TokenSet};
use crate::error::Error;
use crate::provider::claims::IdentityClaims;

pub use memory::MemoryStore;

/// Everything the service remembers about one browser.
///
/// The authenticated fields are only ever set together through
/// [`Session::set_authenticated`]; a refresh swaps the token set as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token_set: Option<TokenSet>,
    identity: Option<IdentityClaims>,
    #[serde(default)]
    all_tenants: Vec<TenantRef>,
    active_tenant: Option<TenantRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    oauth_state: Option<OAuthState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish an authenticated session.
    ///
    /// Fails without touching the session when no tenants are connected or
    /// when `active_tenant` is not one of them.
    pub fn set_authenticated(
        &mut self,
        token_set: TokenSet,
        identity: IdentityClaims,
        all_tenants: Vec<TenantRef>,
        active_tenant: TenantRef,
    ) -> Result<(), Error> {
        if all_tenants.is_empty() {
            return Err(Error::NoTenants);
        }
        if !all_tenants
            .iter()
            .any(|t| t.tenant_id == active_tenant.tenant_id)
        {
            return Err(Error::TenantNotListed(active_tenant.tenant_id));
        }

        self.token_set = Some(token_set);
        self.identity = Some(identity);
        self.all_tenants = all_tenants;
        self.active_tenant = Some(active_tenant);
        Ok(())
    }

    /// Forget tokens, identity, tenants and any pending OAuth state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn token_set(&self) -> Option<&TokenSet> {
        self.token_set.as_ref()
    }

    pub fn identity(&self) -> Option<&IdentityClaims> {
        self.identity.as_ref()
    }

    pub fn all_tenants(&self) -> &[TenantRef] {
        &self.all_tenants
    }

    pub fn active_tenant(&self) -> Option<&TenantRef> {
        self.active_tenant.as_ref()
    }

    pub fn active_tenant_id(&self) -> Option<&str> {
        self.active_tenant.as_ref().map(|t| t.tenant_id.as_str())
    }

    pub(crate) fn replace_token_set(&mut self, token_set: TokenSet) {
        self.token_set = Some(token_set);
    }

    pub fn begin_authorization(&mut self, state: OAuthState) {
        self.oauth_state = Some(state);
    }

    /// Take the pending state, leaving none behind.
    pub fn take_oauth_state(&mut self) -> Option<OAuthState> {
        self.oauth_state.take()
    }
}

/// Storage for sessions keyed by an opaque id.
///
/// Writes are last-write-wins per id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, Error>;
    async fn save(&self, id: &SessionId, session: Session) -> Result<(), Error>;
    async fn destroy(&self, id: &SessionId) -> Result<(), Error>;
    /// Drop every expired session, returning how many went.
    async fn purge_expired(&self) -> Result<usize, Error>;
}
