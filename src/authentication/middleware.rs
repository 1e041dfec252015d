use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{config::Config, error::Error};

use super::jwt::{verify_jwt_session, SessionData};

/// Extracts the token from `Authorization: Token <jwt>` (or `Bearer <jwt>`).
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

fn resolve_session(header: Option<&str>, config: &Config) -> Result<SessionData, Error> {
    let token = header
        .and_then(parse_authorization)
        .ok_or(Error::Unauthorized)?;

    Ok(verify_jwt_session(token, config)?.into())
}

/// Requires a valid session; rejects with 401 otherwise.
pub fn with_session(
    config: Arc<Config>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let config = config.clone();
        async move {
            resolve_session(header.as_deref(), &config).map_err(Rejection::from)
        }
    })
}

/// The current user, if the request carries a valid session.
pub fn with_possible_session(
    config: Arc<Config>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        resolve_session(header.as_deref(), &config).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jwt::issue_token, schema::UserRole};

    #[test]
    fn accepts_token_and_bearer_schemes() {
        assert_eq!(parse_authorization("Token abc"), Some("abc"));
        assert_eq!(parse_authorization("bearer  abc "), Some("abc"));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("Token "), None);
        assert_eq!(parse_authorization("abc"), None);
    }

    #[tokio::test]
    async fn session_filter_reads_authorization_header() {
        let config = Arc::new(Config::default());
        let token = issue_token(3, "cook", UserRole::User, &config).unwrap();

        let session = warp::test::request()
            .header("authorization", format!("Token {token}"))
            .filter(&with_session(config.clone()))
            .await
            .unwrap();
        assert_eq!(session.user_id, 3);

        let missing = warp::test::request()
            .filter(&with_session(config.clone()))
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn possible_session_ignores_bad_tokens() {
        let config = Arc::new(Config::default());

        let session = warp::test::request()
            .header("authorization", "Token nonsense")
            .filter(&with_possible_session(config))
            .await
            .unwrap();
        assert!(session.is_none());
    }
}
