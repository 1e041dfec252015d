use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::Config,
    error::Error,
    schema::{Id, UserRole},
};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime_hours: i64) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::PermissionDenied(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn signing_key(config: &Config) -> Result<Hmac<Sha256>, Error> {
    Hmac::new_from_slice(config.jwt_secret.as_bytes())
        .map_err(|e| Error::Internal(format!("Invalid signing key: {e}")))
}

pub fn issue_token(
    user_id: Id,
    username: &str,
    role: UserRole,
    config: &Config,
) -> Result<String, Error> {
    let key = signing_key(config)?;
    let claims = JwtSessionData::new(
        user_id,
        username.to_owned(),
        role,
        config.token_lifetime_hours,
    );

    claims
        .sign_with_key(&key)
        .map_err(|e| Error::Internal(format!("Could not sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, config: &Config) -> Result<JwtSessionData, Error> {
    let key = signing_key(config)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|e| {
        log::debug!("Rejected session token: {e}");
        Error::Unauthorized
    })?;

    if session.exp < Utc::now().timestamp() {
        log::debug!("Rejected expired session of user {}", session.user_id);
        return Err(Error::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let config = Config::default();
        let token = issue_token(7, "chef", UserRole::User, &config).unwrap();

        let session: SessionData = verify_jwt_session(&token, &config).unwrap().into();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "chef");
        assert!(!session.is_admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = Config::default();
        let other = Config {
            jwt_secret: String::from("another secret"),
            ..Config::default()
        };
        let token = issue_token(7, "chef", UserRole::User, &other).unwrap();
        assert!(matches!(
            verify_jwt_session(&token, &config),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = Config::default();
        let key = signing_key(&config).unwrap();
        let mut claims = JwtSessionData::new(1, String::from("chef"), UserRole::User, 1);
        claims.exp = Utc::now().timestamp() - 10;
        let token = claims.sign_with_key(&key).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, &config),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_jwt_session("not.a.token", &Config::default()).is_err());
    }
}
