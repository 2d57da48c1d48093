use std::time::Duration;

use cookie::{Cookie, SameSite};

use crate::session::Session;

pub const ACCESS_TOKEN_COOKIE: &str = "xeroAccessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "xeroRefreshToken";
pub const USER_ID_COOKIE: &str = "xeroUserId";
pub const TENANT_ID_COOKIE: &str = "xeroTenantId";

pub const DEFAULT_COOKIE_DOMAIN: &str = "localhost";
pub const DEFAULT_COOKIE_PATH: &str = "/";
pub const DEFAULT_COOKIE_MAX_AGE: Duration = Duration::from_millis(24 * 60 * 60 * 1000);
pub const DEFAULT_COOKIE_SAME_SITE: SameSite = SameSite::Lax;
pub const DEFAULT_COOKIE_SECURE: bool = false;
pub const DEFAULT_COOKIE_HTTP_ONLY: bool = false;

/// Attributes shared by every projected cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub domain: String,
    pub path: String,
    pub max_age: Duration,
    pub same_site: SameSite,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            domain: DEFAULT_COOKIE_DOMAIN.to_string(),
            path: DEFAULT_COOKIE_PATH.to_string(),
            max_age: DEFAULT_COOKIE_MAX_AGE,
            same_site: DEFAULT_COOKIE_SAME_SITE,
            secure: DEFAULT_COOKIE_SECURE,
            http_only: DEFAULT_COOKIE_HTTP_ONLY,
        }
    }
}

impl CookiePolicy {
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedCookie {
    pub name: &'static str,
    pub value: String,
    pub policy: CookiePolicy,
}

impl ProjectedCookie {
    pub fn to_cookie(&self) -> Cookie<'static> {
        let max_age = cookie::time::Duration::seconds(self.policy.max_age.as_secs() as i64);
        Cookie::build((self.name, self.value.clone()))
            .domain(self.policy.domain.clone())
            .path(self.policy.path.clone())
            .max_age(max_age)
            .same_site(self.policy.same_site)
            .secure(self.policy.secure)
            .http_only(self.policy.http_only)
            .build()
    }
}

/// Browser-visible copies of the session's tokens, user and tenant.
///
/// Fields the session does not hold are left out.
pub fn project(session: &Session, policy: &CookiePolicy) -> Vec<ProjectedCookie> {
    let token_set = session.token_set();
    let pairs = [
        (
            ACCESS_TOKEN_COOKIE,
            token_set.map(|t| t.access_token.clone()),
        ),
        (
            REFRESH_TOKEN_COOKIE,
            token_set.and_then(|t| t.refresh_token.clone()),
        ),
        (
            USER_ID_COOKIE,
            session.identity().map(|i| i.user_id().to_string()),
        ),
        (
            TENANT_ID_COOKIE,
            session.active_tenant_id().map(ToString::to_string),
        ),
    ];

    pairs
        .iter()
        .filter_map(|(name, value)| {
            value.as_ref().map(|value| ProjectedCookie {
                name: *name,
                value: value.clone(),
                policy: policy.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{authenticated, token_set};

    #[test]
    fn projects_tokens_user_and_tenant() {
        let session = authenticated(token_set("AT", Some("RT"), Some(1)), "T1");
        let cookies = project(&session, &CookiePolicy::default());

        let pairs: Vec<(&str, &str)> = cookies
            .iter()
            .map(|c| (c.name, c.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (ACCESS_TOKEN_COOKIE, "AT"),
                (REFRESH_TOKEN_COOKIE, "RT"),
                (USER_ID_COOKIE, "U1"),
                (TENANT_ID_COOKIE, "T1"),
            ]
        );
        for cookie in &cookies {
            assert_eq!(cookie.policy.max_age.as_millis(), 86_400_000);
            assert_eq!(cookie.policy.same_site, SameSite::Lax);
        }
    }

    #[test]
    fn skips_missing_refresh_token() {
        let session = authenticated(token_set("AT", None, Some(1)), "T1");
        let names: Vec<&str> = project(&session, &CookiePolicy::default())
            .iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(names, vec![ACCESS_TOKEN_COOKIE, USER_ID_COOKIE, TENANT_ID_COOKIE]);
    }

    #[test]
    fn empty_session_projects_nothing() {
        assert!(project(&Session::new(), &CookiePolicy::default()).is_empty());
    }

    #[test]
    fn renders_policy_attributes() {
        let policy = CookiePolicy::default()
            .with_domain("app.example.com")
            .with_secure(true)
            .with_http_only(true);
        let cookie = ProjectedCookie {
            name: TENANT_ID_COOKIE,
            value: "T1".into(),
            policy,
        }
        .to_cookie();

        let header = cookie.to_string();
        assert!(header.starts_with("xeroTenantId=T1"));
        assert!(header.contains("Domain=app.example.com"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=86400"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Secure"));
        assert!(header.contains("HttpOnly"));
    }

    #[test]
    fn insecure_policy_omits_flags() {
        let header = ProjectedCookie {
            name: ACCESS_TOKEN_COOKIE,
            value: "AT".into(),
            policy: CookiePolicy::default(),
        }
        .to_cookie()
        .to_string();

        assert!(!header.contains("Secure"));
        assert!(!header.contains("HttpOnly"));
    }
}
