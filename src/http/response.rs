use cookie::Cookie;
use serde::Serialize;
use tracing::{event, Level};
use warp::http::header::{HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::reply::{Reply, Response};

/// Body returned whenever a browser-facing flow fails.
pub const SOMETHING_WENT_WRONG: &str = "Sorry, something went wrong";

fn with_body(content_type: &'static str, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

pub fn html(body: impl Into<Body>) -> Response {
    with_body("text/html; charset=utf-8", body)
}

pub fn plain(body: impl Into<Body>) -> Response {
    with_body("text/plain; charset=utf-8", body)
}

pub fn json(value: &impl Serialize) -> Response {
    warp::reply::json(value).into_response()
}

/// `302 Found` to `location`.
pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::FOUND;
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => {
            event!(Level::ERROR, "Redirect target is not a valid header value");
            plain(SOMETHING_WENT_WRONG)
        }
    }
}

/// Append one `Set-Cookie` header per cookie.
pub fn with_cookies<'c>(
    mut response: Response,
    cookies: impl IntoIterator<Item = Cookie<'c>>,
) -> Response {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(_) => event!(
                Level::WARN,
                cookie = cookie.name(),
                "Skipping cookie that is not a valid header value"
            ),
        }
    }
    response
}

/// Popup page that tells its opener the connection succeeded, then closes.
pub fn post_message_page(target_origin: &str) -> String {
    let origin = serde_json::to_string(target_origin).unwrap_or_else(|_| "\"*\"".to_string());
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>Connected to Xero</title></head>
  <body>
    <p>Connected to Xero. You can close this window.</p>
    <script>
      if (window.opener) {{
        window.opener.postMessage({{ type: "XERO_AUTH_SUCCESS" }}, {origin});
      }}
      window.close();
    </script>
  </body>
</html>
"#,
        origin = origin
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_is_a_302_with_location() {
        let response = redirect("http://localhost:5173/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "http://localhost:5173/"
        );
    }

    #[test]
    fn each_cookie_gets_its_own_header() {
        let response = with_cookies(
            plain("ok"),
            vec![Cookie::new("a", "1"), Cookie::new("b", "2")],
        );
        let values: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a=1", "b=2"]);
    }

    #[test]
    fn post_message_page_targets_the_frontend_origin() {
        let page = post_message_page("http://localhost:5173");
        assert!(page.contains("XERO_AUTH_SUCCESS"));
        assert!(page.contains(r#"}, "http://localhost:5173");"#));
        assert!(page.contains("window.close()"));
    }
}
