use crate::{
    error::{Error, QueryError},
    schema::Id,
    shopping::ShoppingList,
};

use sqlx::{Pool, Postgres};

#[derive(sqlx::FromRow, Debug, Clone)]
struct CartPart {
    name: String,
    measurement_unit: String,
    amount: i32,
}

/// Sums the ingredients of every recipe in the user's cart. Read-only.
pub async fn build_shopping_list(user_id: Id, pool: &Pool<Postgres>) -> Result<ShoppingList, Error> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_carts sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(ShoppingList::from_parts(rows.iter().map(|part| {
        (
            part.name.as_str(),
            part.measurement_unit.as_str(),
            i64::from(part.amount),
        )
    })))
}
