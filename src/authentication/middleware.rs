use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::constants::SESSION_COOKIE;

use super::jwt::{verify_session, SessionData};

pub fn with_auth() -> impl Filter<Extract = ((),), Error = Rejection> + Copy {
    warp::cookie::<String>(SESSION_COOKIE).and_then(|session: String| async move {
        verify_session(&session)
            .map(|_| ())
            .map_err(warp::reject::custom)
    })
}

pub fn with_session() -> impl Filter<Extract = (SessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>(SESSION_COOKIE).and_then(|session: String| async move {
        verify_session(&session)
            .map(SessionData::from)
            .map_err(warp::reject::custom)
    })
}

/// Optional variant for viewer-dependent reads: an absent or stale cookie
/// yields an anonymous viewer instead of a rejection.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Copy {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(|session: Option<String>| {
        session.and_then(|token| verify_session(&token).ok().map(SessionData::from))
    })
}
