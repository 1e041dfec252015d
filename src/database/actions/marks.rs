use std::collections::HashSet;

use crate::{
    error::{Error, QueryError},
    schema::Id,
};

use sqlx::{Pool, Postgres};

use super::get_recipe;

/// A per-user list of recipes backed by a `(user_id, recipe_id)` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeMark {
    Favorite,
    ShoppingCart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Add,
    Remove,
}

impl RecipeMark {
    fn table(self) -> &'static str {
        match self {
            RecipeMark::Favorite => "favorites",
            RecipeMark::ShoppingCart => "shopping_carts",
        }
    }

    fn already_marked(self) -> &'static str {
        match self {
            RecipeMark::Favorite => "Recipe is already in favorites",
            RecipeMark::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn not_marked(self) -> &'static str {
        match self {
            RecipeMark::Favorite => "Recipe is not in favorites",
            RecipeMark::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

/// Adds or removes `recipe_id` from the user's list. Adding twice or removing
/// something that is not there is an error, never a silent no-op.
pub async fn toggle_recipe_mark(
    user_id: Id,
    recipe_id: Id,
    mark: RecipeMark,
    toggle: Toggle,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(Error::not_found("No recipe exists with specified id"));
    }

    match toggle {
        Toggle::Add => add_recipe_mark(user_id, recipe_id, mark, pool).await,
        Toggle::Remove => remove_recipe_mark(user_id, recipe_id, mark, pool).await,
    }
}

pub async fn add_recipe_mark(
    user_id: Id,
    recipe_id: Id,
    mark: RecipeMark,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::validation(mark.already_marked()));
    }

    log::debug!("User {user_id} added recipe {recipe_id} to {}", mark.table());
    Ok(())
}

pub async fn remove_recipe_mark(
    user_id: Id,
    recipe_id: Id,
    mark: RecipeMark,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found(mark.not_marked()));
    }

    log::debug!("User {user_id} removed recipe {recipe_id} from {}", mark.table());
    Ok(())
}

/// Which of `recipe_ids` the user has marked.
pub async fn marked_recipe_ids(
    user_id: Id,
    mark: RecipeMark,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        mark.table()
    ))
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
