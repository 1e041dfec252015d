use std::collections::HashMap;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::issue_token,
    },
    config::Config,
    error::{Error, QueryError},
    form::{NewUser, SetPasswordForm},
    pagination::PageWindow,
    schema::{Id, User, UserProfile, UserRow},
};

use sqlx::{Pool, Postgres};

use super::subscribed_author_ids;

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, password, role";

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn fetch_users(
    window: PageWindow,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS}, COUNT(*) OVER() AS count FROM users ORDER BY username LIMIT $1 OFFSET $2"
    ))
    .bind(window.limit)
    .bind(window.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(User::from).collect(), total_count))
}

/// Profiles of `ids` as seen by `viewer`, keyed by user id.
pub async fn load_profiles(
    ids: &[Id],
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, UserProfile>, Error> {
    let users: Vec<User> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let subscribed = match viewer {
        Some(viewer) => subscribed_author_ids(viewer, ids, pool).await?,
        None => Default::default(),
    };

    Ok(users
        .into_iter()
        .map(|user| {
            let is_subscribed = subscribed.contains(&user.id);
            (user.id, UserProfile { user, is_subscribed })
        })
        .collect())
}

pub async fn load_profile(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, Error> {
    load_profiles(&[id], viewer, pool)
        .await?
        .remove(&id)
        .ok_or_else(|| Error::not_found("No user exists with specified id"))
}

/// Creates a user; the password is hashed before it is stored.
pub async fn register_user(user: &NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    let password = hash_password(&user.password)?;

    let row: Option<User> = sqlx::query_as(&format!(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING {USER_COLUMNS}
    "
    ))
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(user) => {
            log::info!("Registered user {} ({})", user.id, user.username);
            Ok(user)
        }
        None => Err(Error::validation(
            "A user with that email or username already exists",
        )),
    }
}

/// Checks the credentials and issues a session token.
pub async fn login_user(
    email: &str,
    password: &str,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Err(Error::validation("Invalid credentials")),
    };

    if !verify_password(password, &user.password)? {
        log::debug!("Failed login for user {}", user.id);
        return Err(Error::validation("Invalid credentials"));
    }

    issue_token(user.id, &user.username, user.role, config)
}

pub async fn set_password(
    user_id: Id,
    form: &SetPasswordForm,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| Error::not_found("No user exists with specified id"))?;

    if !verify_password(&form.current_password, &user.password)? {
        return Err(Error::validation("Current password is incorrect"));
    }

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hash_password(&form.new_password)?)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {user_id} changed their password");
    Ok(())
}
