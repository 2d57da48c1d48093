use warp::Filter;

use crate::http::response;

const INDEX: &str = "<a href='/connect'>Connect to Xero</a>";

/// `GET /`: a link that starts the connection flow.
pub fn index_endpoint(
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .map(|| response::html(INDEX))
}
