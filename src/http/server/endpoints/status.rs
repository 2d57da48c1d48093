use tracing::{event, Level};
use warp::Filter;

use crate::auth::refresh::AuthStatus;
use crate::error::Error;
use crate::http::response;
use crate::http::server::{session_id, with_state, AppState};
use crate::http::session;

/// `GET /auth-status`: whether the browser's session can call Xero.
///
/// Always answers with an [`AuthStatus`]; failures read as unauthenticated.
pub fn status_endpoint(
    state: AppState,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("auth-status")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and(session_id())
        .and_then(|state: AppState, sid: Option<String>| async move {
            let status = match auth_status(&state, sid).await {
                Ok(status) => status,
                Err(e) => {
                    event!(Level::WARN, error = %e, "Could not determine auth status");
                    AuthStatus::unauthenticated()
                }
            };
            Ok::<_, warp::Rejection>(response::json(&status))
        })
}

async fn auth_status(state: &AppState, sid: Option<String>) -> Result<AuthStatus, Error> {
    let (id, mut session) = match session::load_existing(state.sessions.as_ref(), sid).await? {
        Some(found) => found,
        None => return Ok(AuthStatus::unauthenticated()),
    };

    let before = session.token_set().cloned();
    let status = state.coordinator.ensure_valid(&mut session).await;
    if session.token_set() != before.as_ref() {
        state.sessions.save(&id, session).await?;
    }
    Ok(status)
}
