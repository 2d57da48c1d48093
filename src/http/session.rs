//! Binding between the `tally.sid` cookie and the session store.

use cookie::{Cookie, SameSite};

use crate::core::types::SessionId;
use crate::error::Error;
use crate::session::{Session, SessionStore};
use crate::util::random::FromRandom;

pub const SESSION_COOKIE: &str = "tally.sid";

/// A session resolved for the current request.
#[derive(Debug)]
pub struct Resolved {
    pub id: SessionId,
    pub session: Session,
    /// The browser does not hold this id yet and must be sent the cookie.
    pub is_new: bool,
}

/// Load the session named by the cookie, if the store still has it.
pub async fn load_existing(
    store: &dyn SessionStore,
    cookie: Option<String>,
) -> Result<Option<(SessionId, Session)>, Error> {
    let id = match cookie {
        Some(raw) if !raw.is_empty() => SessionId(raw),
        _ => return Ok(None),
    };
    Ok(store.load(&id).await?.map(|session| (id, session)))
}

/// Load the session named by the cookie, or start a fresh one.
pub async fn load_or_create(
    store: &dyn SessionStore,
    cookie: Option<String>,
) -> Result<Resolved, Error> {
    match load_existing(store, cookie).await? {
        Some((id, session)) => Ok(Resolved {
            id,
            session,
            is_new: false,
        }),
        None => Ok(Resolved {
            id: SessionId::from_random(),
            session: Session::new(),
            is_new: true,
        }),
    }
}

/// Browser-session cookie carrying the session id.
pub fn session_cookie(id: &SessionId, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}
