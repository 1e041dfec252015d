use std::fmt::{self, Display};

use serde::Serialize;
use thiserror::Error;
use warp::{
    http::StatusCode,
    reject::Reject,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(info: impl Into<String>) -> Self {
        Self::Validation(info.into())
    }

    pub fn not_found(info: impl Into<String>) -> Self {
        Self::NotFound(info.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Config(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Error::Validation(info) => ErrorBody::Errors(info.to_owned()),
            Error::Config(_) | Error::Internal(_) => {
                ErrorBody::Detail(String::from("Internal server error"))
            }
            other => ErrorBody::Detail(other.to_string()),
        }
    }
}

/// JSON shape of an error response.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorBody {
    Errors(String),
    Detail(String),
}

impl Reject for Error {}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Storage failure, classified by what the caller did wrong (if anything).
#[derive(Debug)]
pub enum QueryError {
    Conflict(String),
    MissingReference(String),
    RowNotFound,
    Other(String),
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self::Other(info)
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let constraint = e.constraint().unwrap_or("unknown").to_owned();
                match e.code().as_deref() {
                    Some(UNIQUE_VIOLATION) | Some(CHECK_VIOLATION) => Self::Conflict(constraint),
                    Some(FOREIGN_KEY_VIOLATION) => Self::MissingReference(constraint),
                    _ => Self::Other(format!("{e}")),
                }
            }
            sqlx::Error::RowNotFound => Self::RowNotFound,
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Conflict(constraint) => write!(f, "constraint {constraint} violated"),
            QueryError::MissingReference(constraint) => {
                write!(f, "reference {constraint} does not exist")
            }
            QueryError::RowNotFound => write!(f, "row not found"),
            QueryError::Other(info) => write!(f, "{info}"),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::Conflict(constraint) => Error::Validation(conflict_message(&constraint)),
            QueryError::MissingReference(_) => {
                Error::NotFound(String::from("Referenced object does not exist"))
            }
            QueryError::RowNotFound => Error::NotFound(String::from("Not found.")),
            QueryError::Other(info) => {
                log::error!("Query failed: {info}");
                Error::Internal(info)
            }
        }
    }
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "users_email_key" => "A user with that email already exists",
        "users_username_key" => "A user with that username already exists",
        "tags_slug_key" => "A tag with that slug already exists",
        "unique_ingredient" => "An ingredient with that name and unit already exists",
        "unique_recipe_ingredient" => "A recipe cannot reference the same ingredient twice",
        "recipe_tags_pkey" => "A recipe cannot reference the same tag twice",
        "unique_favorite" => "Recipe is already in favorites",
        "unique_shopping_cart" => "Recipe is already in the shopping cart",
        "unique_user_author" => "You are already subscribed to this user",
        "check_user_not_author" => "You cannot subscribe to yourself",
        _ => "Value violates a uniqueness or check constraint",
    }
    .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(Error::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::PermissionDenied(String::new()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(Error::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::Internal(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let body = Error::Internal(String::from("password authentication failed")).body();
        assert_eq!(body, ErrorBody::Detail(String::from("Internal server error")));
    }

    #[test]
    fn validation_errors_render_under_errors_key() {
        let body = serde_json::to_value(Error::validation("bad amount").body()).unwrap();
        assert_eq!(body, serde_json::json!({ "errors": "bad amount" }));
    }

    #[test]
    fn errors_travel_inside_rejections() {
        let rejection = warp::reject::Rejection::from(Error::Unauthorized);
        assert!(matches!(rejection.find::<Error>(), Some(Error::Unauthorized)));
    }

    #[test]
    fn constraint_conflicts_become_validation_errors() {
        let error: Error = QueryError::Conflict(String::from("unique_favorite")).into();
        assert!(matches!(error, Error::Validation(ref info) if info == "Recipe is already in favorites"));

        let error: Error = QueryError::MissingReference(String::from("fk")).into();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }
}
