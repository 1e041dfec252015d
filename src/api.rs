//! HTTP surface. Every route lives under `/api`; stored images are served
//! from `/media`.

use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use sqlx::{Pool, Postgres};
use warp::{filters::BoxedFilter, reject::Rejection, reply::Response, Filter, Reply};

use crate::config::Config;

pub mod auth;
pub mod ingredients;
pub mod recipes;
pub mod rejection;
pub mod tags;
pub mod users;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// JSON request body, capped at the configured size.
pub fn json_body<T: DeserializeOwned + Send>(
    config: &Config,
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(config.max_body_bytes).and(warp::body::json())
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let api = warp::path("api").and(
        recipes::routes(state.clone())
            .or(users::routes(state.clone()))
            .unify()
            .or(tags::routes(state.clone()))
            .unify()
            .or(ingredients::routes(state.clone()))
            .unify()
            .or(auth::routes(state.clone()))
            .unify(),
    );

    let media = warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.config.media_root.clone()))
        .map(Reply::into_response);

    api.or(media)
        .unify()
        .recover(rejection::handle_rejection)
        .unify()
        .with(warp::log("foodgram::api"))
        .map(Reply::into_response)
        .boxed()
}
