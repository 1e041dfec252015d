use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{self, Response},
    Filter, Reply,
};

use crate::{
    actions::{get_tag, list_tags},
    error::Error,
    schema::Id,
};

use super::{with_state, AppState};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|state: AppState| async move {
            let tags = list_tags(&state.pool).await?;
            Ok::<_, Rejection>(reply::json(&tags).into_response())
        });

    let read = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state))
        .and_then(|id: Id, state: AppState| async move {
            let tag = get_tag(id, &state.pool)
                .await?
                .ok_or_else(|| Error::not_found("No tag exists with specified id"))?;
            Ok::<_, Rejection>(reply::json(&tag).into_response())
        });

    list.or(read).unify().boxed()
}
