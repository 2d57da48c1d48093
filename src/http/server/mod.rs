use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{event, Level};
use url::Url;
use warp::Filter;

use crate::auth::cookies::CookiePolicy;
use crate::auth::expiry::Clock;
use crate::auth::refresh::RefreshCoordinator;
use crate::provider::IdentityProvider;
use crate::session::SessionStore;
use crate::util::cli::Config;

use super::session::SESSION_COOKIE;

mod endpoints;

use endpoints::{
    auth::{callback_endpoint, connect_endpoint},
    site::index_endpoint,
    status::status_endpoint,
};

/// How `/callback` hands control back to the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CallbackMode {
    /// Redirect the browser to the frontend.
    Redirect,
    /// Serve a popup page that notifies its opener and closes.
    PostMessage,
}

/// Per-deployment knobs the handlers read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub frontend_url: Url,
    pub callback_mode: CallbackMode,
    pub cookies: CookiePolicy,
    pub static_dir: PathBuf,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            frontend_url: config.frontend_url.clone(),
            callback_mode: config.callback_mode,
            cookies: config.cookies.clone(),
            static_dir: config.static_dir.clone(),
        }
    }

    /// `scheme://host[:port]` of the frontend.
    pub fn frontend_origin(&self) -> String {
        self.frontend_url.origin().ascii_serialization()
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn IdentityProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub coordinator: RefreshCoordinator,
    pub settings: Arc<Settings>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AppState {{ settings: {:?}, .. }}", self.settings)
    }
}

impl AppState {
    pub fn new<P>(
        provider: Arc<P>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Self
    where
        P: IdentityProvider + 'static,
    {
        let coordinator = RefreshCoordinator::new(provider.clone(), clock);
        Self {
            provider,
            sessions,
            coordinator,
            settings: Arc::new(settings),
        }
    }
}

pub(crate) fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub(crate) fn session_id() -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone
{
    warp::cookie::optional(SESSION_COOKIE)
}

/// Every route the service answers, with CORS and request logging.
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let cors = warp::cors()
        .allow_origin(state.settings.frontend_origin().as_str())
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["Content-Type", "Authorization"])
        .allow_credentials(true);

    let files = warp::get().and(warp::fs::dir(state.settings.static_dir.clone()));

    index_endpoint()
        .or(connect_endpoint(state.clone()))
        .or(callback_endpoint(state.clone()))
        .or(status_endpoint(state))
        .or(files)
        .with(cors)
        .with(warp::log("tally::http"))
}

#[derive(Debug)]
pub struct Server {
    state: AppState,
    port: u16,
}

impl Server {
    pub fn new(state: AppState, port: u16) -> Self {
        Self { state, port }
    }

    pub async fn serve(self) {
        event!(Level::INFO, port = self.port, "Listening");
        warp::serve(routes(self.state))
            .run(([0, 0, 0, 0], self.port))
            .await;
    }
}
