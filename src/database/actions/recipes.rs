use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    config::Config,
    error::{Error, QueryError},
    form::{NewRecipe, RecipeChanges, RecipeQuery, RecipeRelations},
    jwt::SessionData,
    pagination::PageWindow,
    schema::{Id, Recipe, RecipeDetail, RecipeRow},
    validators::{validate_ingredient_amounts, validate_tag_ids},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{
    list_recipe_parts, list_tags_for_recipes, load_profiles, marked_recipe_ids,
    missing_ingredients, missing_tags, RecipeMark,
};

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.image, r.text, r.cooking_time";

/// One window of recipes matching `filter`, plus the size of the whole match.
/// `viewer` is needed for the favorite and cart filters; an anonymous viewer
/// asking for either gets nothing.
pub async fn fetch_recipes(
    filter: &RecipeQuery,
    viewer: Option<Id>,
    window: PageWindow,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    if viewer.is_none() && (filter.is_favorited || filter.is_in_shopping_cart) {
        return Ok((vec![], 0));
    }

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {RECIPE_COLUMNS}, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE"
    ));

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query
                .push(" AND EXISTS (SELECT 1 FROM shopping_carts sc WHERE sc.recipe_id = r.id AND sc.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }

    query
        .push(" ORDER BY r.name, r.id LIMIT ")
        .push_bind(window.limit)
        .push(" OFFSET ")
        .push_bind(window.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as::<RecipeRow>()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(Recipe::from).collect(), total_count))
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the session may modify: its author's, or any for an admin.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = get_recipe(id, pool).await?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(Error::PermissionDenied(String::from(
                        "Only the author can change this recipe",
                    )))
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(Error::not_found("No recipe exists with specified id")),
    }
}

/// Replaces the recipe's ingredient and tag associations with `relations`.
/// Runs on the caller's transaction; on error nothing is left half-applied
/// once the transaction is dropped.
pub async fn sync_recipe_relations(
    recipe_id: Id,
    relations: &RecipeRelations,
    config: &Config,
    conn: &mut PgConnection,
) -> Result<(), Error> {
    validate_ingredient_amounts(&relations.ingredients, config)?;
    validate_tag_ids(&relations.tags)?;

    let ingredient_ids: Vec<Id> = relations.ingredients.iter().map(|part| part.id).collect();
    let missing = missing_ingredients(&ingredient_ids, &mut *conn).await?;
    if !missing.is_empty() {
        return Err(Error::not_found(format!(
            "Ingredients do not exist: {}",
            join_ids(&missing)
        )));
    }

    let missing = missing_tags(&relations.tags, &mut *conn).await?;
    if !missing.is_empty() {
        return Err(Error::validation(format!(
            "Tags do not exist: {}",
            join_ids(&missing)
        )));
    }

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut insert: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    insert.push_values(relations.ingredients.iter(), |mut row, part| {
        row.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });
    insert
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut insert: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    insert.push_values(relations.tags.iter(), |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    insert
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

fn join_ids(ids: &[Id]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

/// Inserts the recipe row and its associations in one transaction. `image` is
/// the stored path of the already saved upload.
pub async fn create_recipe(
    author_id: Id,
    recipe: &NewRecipe,
    image: &str,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new(String::from("Could not start transaction")))?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    sync_recipe_relations(id.0, &recipe.relations, config, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new(String::from("Could not commit transaction")))?;

    log::info!("User {author_id} created recipe {}", id.0);
    Ok(id.0)
}

/// Applies `changes` to the recipe; `image` is the stored path of a new image,
/// if one was uploaded.
pub async fn update_recipe(
    id: Id,
    changes: &RecipeChanges,
    image: Option<&str>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new(String::from("Could not start transaction")))?;

    let result = sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        cooking_time = COALESCE($3, cooking_time),
        image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(changes.name.as_deref())
    .bind(changes.text.as_deref())
    .bind(changes.cooking_time)
    .bind(image)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("No recipe exists with specified id"));
    }

    sync_recipe_relations(id, &changes.relations, config, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new(String::from("Could not commit transaction")))?;

    log::info!("Updated recipe {id}");
    Ok(())
}

/// Deletes the recipe; favorites, cart entries and associations cascade.
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("No recipe exists with specified id"));
    }

    log::info!("Deleted recipe {id}");
    Ok(())
}

/// Resolves authors, tags, ingredients and the viewer's flags for each recipe,
/// keeping the input order.
pub async fn load_recipe_details(
    recipes: Vec<Recipe>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, Error> {
    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let author_ids: Vec<Id> = recipes
        .iter()
        .map(|recipe| recipe.author_id)
        .collect::<HashSet<Id>>()
        .into_iter()
        .collect();

    let mut parts = list_recipe_parts(&ids, pool).await?;
    let mut tags = list_tags_for_recipes(&ids, pool).await?;
    let authors = load_profiles(&author_ids, viewer, pool).await?;

    let (favorited, in_cart) = match viewer {
        Some(viewer) => (
            marked_recipe_ids(viewer, RecipeMark::Favorite, &ids, pool).await?,
            marked_recipe_ids(viewer, RecipeMark::ShoppingCart, &ids, pool).await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| Error::not_found("Recipe author does not exist"))?;

            Ok(RecipeDetail {
                author,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                ingredients: parts.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                recipe,
            })
        })
        .collect()
}

pub async fn load_recipe_detail(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| Error::not_found("No recipe exists with specified id"))?;

    load_recipe_details(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("No recipe exists with specified id"))
}

/// Up to `limit` recipes of an author (all when `None`) and the author's total.
pub async fn list_author_recipes(
    author_id: Id,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    let rows: Vec<Recipe> = sqlx::query_as(&format!(
        "
        SELECT {RECIPE_COLUMNS}
        FROM recipes r
        WHERE r.author_id = $1
        ORDER BY r.name, r.id
        LIMIT $2
    "
    ))
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok((rows, total.0))
}
