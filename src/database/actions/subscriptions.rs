use std::collections::HashSet;

use crate::{
    error::{Error, QueryError},
    pagination::PageWindow,
    schema::{Id, SubscriptionDetail, User, UserProfile, UserRow},
};

use sqlx::{Pool, Postgres};

use super::{get_user_by_id, list_author_recipes};

pub async fn subscribe(follower: Id, author: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    if follower == author {
        return Err(Error::validation("You cannot subscribe to yourself"));
    }
    if get_user_by_id(pool, author).await?.is_none() {
        return Err(Error::not_found("No user exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(follower)
    .bind(author)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::validation("You are already subscribed to this user"));
    }

    log::debug!("User {follower} subscribed to {author}");
    Ok(())
}

pub async fn unsubscribe(follower: Id, author: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    if get_user_by_id(pool, author).await?.is_none() {
        return Err(Error::not_found("No user exists with specified id"));
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(follower)
        .bind(author)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("You are not subscribed to this user"));
    }

    log::debug!("User {follower} unsubscribed from {author}");
    Ok(())
}

/// Which of `author_ids` the follower is subscribed to.
pub async fn subscribed_author_ids(
    follower: Id,
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = ANY($2)",
    )
    .bind(follower)
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Authors the follower is subscribed to, one window at a time, ordered by username.
pub async fn fetch_subscriptions(
    follower: Id,
    window: PageWindow,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password, u.role, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(follower)
    .bind(window.limit)
    .bind(window.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(User::from).collect(), total_count))
}

/// Followed author with up to `recipes_limit` of their recipes.
pub async fn load_subscription(
    author: User,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionDetail, Error> {
    let (recipes, recipes_count) = list_author_recipes(author.id, recipes_limit, pool).await?;

    Ok(SubscriptionDetail {
        author: UserProfile {
            user: author,
            is_subscribed: true,
        },
        recipes,
        recipes_count,
    })
}
