use std::convert::TryFrom;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::auth::cookies::{CookiePolicy, DEFAULT_COOKIE_DOMAIN};
use crate::core::types::Scope;
use crate::error::Error;
use crate::http::server::CallbackMode;
use crate::provider::{
    ProviderConfig, DEFAULT_SCOPES, XERO_AUTHORIZE_URL, XERO_CONNECTIONS_URL, XERO_TOKEN_URL,
};

/// `true`/`false`, `1`/`0`, `yes`/`no` or `on`/`off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle(pub bool);

impl FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Self(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Self(false)),
            other => Err(format!("expected true or false, got {:?}", other)),
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "tallyd",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct Options {
    #[clap(long, env = "CLIENT_ID")]
    pub client_id: String,
    #[clap(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,
    #[clap(long, env = "REDIRECT_URI")]
    pub redirect_uri: String,
    #[clap(long, env = "FRONTEND_URL", default_value = "http://localhost:5173")]
    pub frontend_url: String,
    #[clap(long, env = "PORT", default_value = "5000")]
    pub port: u16,
    #[clap(long, env = "SCOPES", default_value = DEFAULT_SCOPES)]
    pub scopes: String,
    #[clap(long, env = "CALLBACK_MODE", value_enum, default_value = "redirect")]
    pub callback_mode: CallbackMode,
    #[clap(long, env = "COOKIE_DOMAIN", default_value = DEFAULT_COOKIE_DOMAIN)]
    pub cookie_domain: String,
    #[clap(long, env = "COOKIE_SECURE", default_value = "false")]
    pub cookie_secure: Toggle,
    #[clap(long, env = "COOKIE_HTTP_ONLY", default_value = "false")]
    pub cookie_http_only: Toggle,
    #[clap(long, env = "SESSION_TTL_SECS", default_value = "86400")]
    pub session_ttl_secs: u64,
    #[clap(long, env = "STATIC_DIR", default_value = "build")]
    pub static_dir: PathBuf,
    #[clap(long, env = "XERO_AUTHORIZE_URL", default_value = XERO_AUTHORIZE_URL)]
    pub authorize_url: String,
    #[clap(long, env = "XERO_TOKEN_URL", default_value = XERO_TOKEN_URL)]
    pub token_url: String,
    #[clap(long, env = "XERO_CONNECTIONS_URL", default_value = XERO_CONNECTIONS_URL)]
    pub connections_url: String,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub frontend_url: Url,
    pub port: u16,
    pub callback_mode: CallbackMode,
    pub cookies: CookiePolicy,
    pub session_ttl: Duration,
    pub static_dir: PathBuf,
}

fn required(name: &str, value: String) -> Result<String, Error> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(Error::Config(format!(
            "{} is not set - please check your .env file in the project root or create one",
            name
        )));
    }
    Ok(value)
}

fn url(name: &str, value: &str) -> Result<Url, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{}: {} ({:?})", name, e, value)))
}

impl TryFrom<Options> for Config {
    type Error = Error;

    fn try_from(opts: Options) -> Result<Self, Self::Error> {
        let client_id = required("CLIENT_ID", opts.client_id)?;
        let client_secret = required("CLIENT_SECRET", opts.client_secret)?;
        let redirect_uri = required("REDIRECT_URI", opts.redirect_uri)?;
        let redirect_uri = url("REDIRECT_URI", &redirect_uri)?;

        let scope = Scope::from_delimited_parts(&opts.scopes);
        if scope.is_empty() {
            return Err(Error::Config("SCOPES must name at least one scope".into()));
        }

        let provider = ProviderConfig {
            client_id,
            client_secret,
            redirect_uri,
            scope,
            authorize_url: url("XERO_AUTHORIZE_URL", &opts.authorize_url)?,
            token_url: url("XERO_TOKEN_URL", &opts.token_url)?,
            connections_url: url("XERO_CONNECTIONS_URL", &opts.connections_url)?,
        };

        let frontend_url = url("FRONTEND_URL", &opts.frontend_url)?;
        if !matches!(frontend_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "FRONTEND_URL must be an http or https URL, got {:?}",
                opts.frontend_url
            )));
        }

        let cookies = CookiePolicy::default()
            .with_domain(opts.cookie_domain)
            .with_secure(opts.cookie_secure.0)
            .with_http_only(opts.cookie_http_only.0);

        Ok(Self {
            provider,
            frontend_url,
            port: opts.port,
            callback_mode: opts.callback_mode,
            cookies,
            session_ttl: Duration::from_secs(opts.session_ttl_secs),
            static_dir: opts.static_dir,
        })
    }
}

/// `--help` and `--version` surface as parse errors but are not failures.
pub fn is_informational(e: &clap::Error) -> bool {
    matches!(
        e.kind(),
        clap::ErrorKind::DisplayHelp | clap::ErrorKind::DisplayVersion
    )
}
