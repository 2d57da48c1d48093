use serde::Deserialize;
use tracing::{event, Level};
use warp::reply::Response;
use warp::Filter;

use crate::auth::cookies;
use crate::core::types::OAuthState;
use crate::error::Error;
use crate::http::response::{self, SOMETHING_WENT_WRONG};
use crate::http::server::{session_id, with_state, AppState, CallbackMode};
use crate::http::session::{self, session_cookie};
use crate::provider::claims;
use crate::util::random::FromRandom;

/// Query string the provider sends back to `/callback`.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /connect`: start the authorization-code flow.
pub fn connect_endpoint(
    state: AppState,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("connect")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and(session_id())
        .and_then(|state: AppState, sid: Option<String>| async move {
            let reply = match connect(&state, sid).await {
                Ok(reply) => reply,
                Err(e) => {
                    event!(Level::ERROR, error = %e, "Could not start authorization");
                    response::plain(SOMETHING_WENT_WRONG)
                }
            };
            Ok::<_, warp::Rejection>(reply)
        })
}

/// `GET /callback`: finish the flow and hand tokens to the browser.
pub fn callback_endpoint(
    state: AppState,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("callback")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and(session_id())
        .and(warp::query::<CallbackParams>())
        .and_then(
            |state: AppState, sid: Option<String>, params: CallbackParams| async move {
                let reply = match callback(&state, sid, params).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        event!(Level::ERROR, error = %e, "Authorization callback failed");
                        response::plain(SOMETHING_WENT_WRONG)
                    }
                };
                Ok::<_, warp::Rejection>(reply)
            },
        )
}

#[tracing::instrument(skip_all)]
async fn connect(state: &AppState, sid: Option<String>) -> Result<Response, Error> {
    let mut resolved = session::load_or_create(state.sessions.as_ref(), sid).await?;

    let oauth_state = OAuthState::from_random();
    let consent_url = state.provider.consent_url(&oauth_state).await?;
    resolved.session.begin_authorization(oauth_state);
    state.sessions.save(&resolved.id, resolved.session).await?;

    let reply = response::redirect(consent_url.as_str());
    if resolved.is_new {
        let secure = state.settings.cookies.secure;
        return Ok(response::with_cookies(
            reply,
            Some(session_cookie(&resolved.id, secure)),
        ));
    }
    Ok(reply)
}

#[tracing::instrument(skip_all)]
async fn callback(
    state: &AppState,
    sid: Option<String>,
    params: CallbackParams,
) -> Result<Response, Error> {
    let (id, mut session) = session::load_existing(state.sessions.as_ref(), sid)
        .await?
        .ok_or(Error::StateMismatch)?;

    // The state is spent by this request whatever its outcome.
    let expected = session.take_oauth_state();
    if expected.is_some() {
        state.sessions.save(&id, session.clone()).await?;
    }

    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        return Err(Error::Callback(format!("{} {}", error, description).trim().to_string()));
    }
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| Error::Callback("missing authorization code".into()))?;
    match (expected, params.state) {
        (Some(expected), Some(received)) if expected.0 == received => {}
        _ => return Err(Error::StateMismatch),
    }

    let token_set = state.provider.exchange_code(&code).await?;
    let tenants = state.provider.tenants(&token_set.access_token).await?;
    let id_token = token_set
        .id_token
        .as_deref()
        .ok_or_else(|| Error::Callback("token response carries no id_token".into()))?;
    let identity = claims::decode_identity(id_token, &token_set.access_token)?;
    let active_tenant = tenants.first().cloned().ok_or(Error::NoTenants)?;

    session.set_authenticated(token_set, identity, tenants, active_tenant)?;
    let projected = cookies::project(&session, &state.settings.cookies);
    event!(
        Level::INFO,
        tenant_id = ?session.active_tenant_id(),
        tenants = session.all_tenants().len(),
        "Connected to Xero"
    );
    state.sessions.save(&id, session).await?;

    let reply = match state.settings.callback_mode {
        CallbackMode::Redirect => response::redirect(state.settings.frontend_url.as_str()),
        CallbackMode::PostMessage => {
            response::html(response::post_message_page(&state.settings.frontend_origin()))
        }
    };
    Ok(response::with_cookies(
        reply,
        projected.iter().map(|c| c.to_cookie()),
    ))
}
