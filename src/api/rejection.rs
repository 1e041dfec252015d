use std::convert::Infallible;

use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection,
        UnsupportedMediaType,
    },
    reply::{self, Response},
    Reply,
};

use crate::error::{Error, ErrorBody};

fn detail(info: &str) -> ErrorBody {
    ErrorBody::Detail(info.to_owned())
}

/// Turns any rejection into a JSON error response.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, body) = if let Some(e) = err.find::<Error>() {
        if e.status() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("Request failed: {e}");
        }
        (e.status(), e.body())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, detail("Not found."))
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, ErrorBody::Errors(e.to_string()))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, ErrorBody::Errors(e.to_string()))
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, detail("Request body is too large"))
    } else if err.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, detail("Content-Length header is required"))
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            detail("Request body must be JSON"),
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, detail("Method not allowed."))
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            detail("Internal server error"),
        )
    };

    Ok(reply::with_status(reply::json(&body), status).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::hyper::body::to_bytes;

    async fn render(err: Rejection) -> (StatusCode, serde_json::Value) {
        let response = handle_rejection(err).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn custom_errors_keep_their_status_and_body() {
        let (status, body) = render(Error::validation("bad amount").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "errors": "bad amount" }));

        let (status, body) = render(Error::Unauthorized.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("detail").is_some());
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let (status, body) = render(warp::reject::not_found()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "detail": "Not found." }));
    }
}
