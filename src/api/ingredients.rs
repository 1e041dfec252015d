use serde::Deserialize;
use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{self, Response},
    Filter, Reply,
};

use crate::{
    actions::{get_ingredient, search_ingredients},
    error::Error,
    schema::Id,
};

use super::{with_state, AppState};

#[derive(Deserialize, Debug, Default)]
pub struct IngredientSearch {
    pub name: Option<String>,
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientSearch>())
        .and(with_state(state.clone()))
        .and_then(|search: IngredientSearch, state: AppState| async move {
            let name = search.name.unwrap_or_default();
            let ingredients = search_ingredients(&name, &state.pool).await?;
            Ok::<_, Rejection>(reply::json(&ingredients).into_response())
        });

    let read = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state))
        .and_then(|id: Id, state: AppState| async move {
            let ingredient = get_ingredient(id, &state.pool)
                .await?
                .ok_or_else(|| Error::not_found("No ingredient exists with specified id"))?;
            Ok::<_, Rejection>(reply::json(&ingredient).into_response())
        });

    list.or(read).unify().boxed()
}
