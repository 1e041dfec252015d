use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{self, Response},
    Filter, Reply,
};

use crate::{
    actions::{
        self, build_shopping_list, fetch_recipes, get_recipe, get_recipe_mut,
        load_recipe_detail, load_recipe_details, toggle_recipe_mark, RecipeMark, Toggle,
    },
    authentication::permissions::ActionType,
    error::Error,
    form::{FromWire, NewRecipe, RecipeChanges, RecipeForm, RecipeQuery},
    jwt::SessionData,
    media,
    middleware::{with_possible_session, with_session},
    pagination::{Page, PageParams},
    schema::Id,
    serializers::ToWire,
    shopping::SHOPPING_LIST_FILENAME,
};

use super::{json_body, with_state, AppState};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let config = state.config.clone();

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_possible_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(config.clone()))
        .and(json_body::<RecipeForm>(&config))
        .and(with_state(state.clone()))
        .and_then(create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart);

    let read = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(read_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(config.clone()))
        .and(json_body::<RecipeForm>(&config))
        .and(with_state(state.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(read)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(mark_routes("favorite", RecipeMark::Favorite, state.clone()))
        .unify()
        .or(mark_routes("shopping_cart", RecipeMark::ShoppingCart, state))
        .unify()
        .boxed()
}

/// `POST` adds the recipe to the list, `DELETE` removes it.
fn mark_routes(segment: &'static str, mark: RecipeMark, state: AppState) -> BoxedFilter<(Response,)> {
    let toggle = warp::post()
        .map(|| Toggle::Add)
        .or(warp::delete().map(|| Toggle::Remove))
        .unify();

    warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(toggle)
        .and(with_session(state.config.clone()))
        .and(with_state(state))
        .and_then(move |id: Id, toggle: Toggle, session: SessionData, state: AppState| {
            mark_recipe(id, mark, toggle, session, state)
        })
        .boxed()
}

async fn list_recipes(
    pairs: Vec<(String, String)>,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let query = RecipeQuery::from_pairs(pairs)?;
    let window = PageParams {
        page: query.page,
        limit: query.limit,
    }
    .window(&state.config)?;
    let viewer = session.map(|session| session.user_id);

    let (recipes, total) = fetch_recipes(&query, viewer, window, &state.pool).await?;
    let details = load_recipe_details(recipes, viewer, &state.pool).await?;

    let page = Page::from_rows(details, total, window, "/api/recipes")?
        .map(|detail| detail.to_wire(&state.config));
    Ok(reply::json(&page).into_response())
}

async fn read_recipe(
    id: Id,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let detail = load_recipe_detail(id, viewer, &state.pool).await?;
    Ok(reply::json(&detail.to_wire(&state.config)).into_response())
}

async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = NewRecipe::from_wire(form, &state.config)?;

    let image = recipe.image.save(&state.config.media_root).await?;
    let id = match actions::create_recipe(session.user_id, &recipe, &image, &state.config, &state.pool).await {
        Ok(id) => id,
        Err(e) => {
            media::discard(&state.config.media_root, &image).await;
            return Err(e.into());
        }
    };

    let detail = load_recipe_detail(id, Some(session.user_id), &state.pool).await?;
    Ok(reply::with_status(
        reply::json(&detail.to_wire(&state.config)),
        StatusCode::CREATED,
    )
    .into_response())
}

async fn update_recipe(
    id: Id,
    session: SessionData,
    form: RecipeForm,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &state.pool).await?;
    let changes = RecipeChanges::from_wire(form, &state.config)?;

    let image = match &changes.image {
        Some(image) => Some(image.save(&state.config.media_root).await?),
        None => None,
    };

    let result = actions::update_recipe(
        id,
        &changes,
        image.as_deref(),
        &state.config,
        &state.pool,
    )
    .await;

    match (result, image) {
        (Ok(()), Some(_)) => media::discard(&state.config.media_root, &recipe.image).await,
        (Ok(()), None) => {}
        (Err(e), Some(image)) => {
            media::discard(&state.config.media_root, &image).await;
            return Err(e.into());
        }
        (Err(e), None) => return Err(e.into()),
    }

    let detail = load_recipe_detail(id, Some(session.user_id), &state.pool).await?;
    Ok(reply::json(&detail.to_wire(&state.config)).into_response())
}

async fn delete_recipe(id: Id, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &state.pool).await?;
    actions::delete_recipe(recipe.id, &state.pool).await?;
    media::discard(&state.config.media_root, &recipe.image).await;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn mark_recipe(
    id: Id,
    mark: RecipeMark,
    toggle: Toggle,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;
    toggle_recipe_mark(session.user_id, id, mark, toggle, &state.pool).await?;

    match toggle {
        Toggle::Add => {
            let recipe = get_recipe(id, &state.pool)
                .await?
                .ok_or_else(|| Error::not_found("No recipe exists with specified id"))?;
            Ok(reply::with_status(
                reply::json(&recipe.to_wire(&state.config)),
                StatusCode::CREATED,
            )
            .into_response())
        }
        Toggle::Remove => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn download_shopping_cart(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnMarks)?;
    let list = build_shopping_list(session.user_id, &state.pool).await?;

    log::debug!(
        "User {} downloaded a shopping list of {} lines",
        session.user_id,
        list.len()
    );
    Ok(reply::with_header(
        list.render(),
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
    .into_response())
}
