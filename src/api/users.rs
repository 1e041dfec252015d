use std::collections::HashSet;

use serde::Deserialize;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{self, Response},
    Filter, Reply,
};

use crate::{
    actions::{
        fetch_subscriptions, fetch_users, get_user_by_id, load_profile, load_subscription,
        register_user, set_password, subscribe, subscribed_author_ids, unsubscribe,
    },
    authentication::permissions::ActionType,
    error::Error,
    form::{FromWire, NewUser, SetPasswordForm, UserCreateForm},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::{Page, PageParams},
    schema::{Id, UserProfile},
    serializers::ToWire,
};

use super::{json_body, with_state, AppState};

/// `?recipes_limit=` caps the recipes embedded per followed author.
#[derive(Deserialize, Debug, Default, Clone, Copy)]
pub struct SubscriptionParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

impl SubscriptionParams {
    fn recipes_limit(&self) -> Result<Option<i64>, Error> {
        match self.recipes_limit {
            Some(limit) if limit < 0 => Err(Error::validation(
                "Query parameter 'recipes_limit' may not be negative",
            )),
            limit => Ok(limit),
        }
    }
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let config = state.config.clone();

    let list = warp::path!("users")
        .and(warp::get())
        .and(warp::query::<PageParams>())
        .and(with_possible_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(list_users);

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body::<UserCreateForm>(&config))
        .and(with_state(state.clone()))
        .and_then(register);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(read_me);

    let change_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(config.clone()))
        .and(json_body::<SetPasswordForm>(&config))
        .and(with_state(state.clone()))
        .and_then(change_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<SubscriptionParams>())
        .and(with_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(list_subscriptions);

    let read = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(read_user);

    let follow = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(warp::query::<SubscriptionParams>())
        .and(with_session(config.clone()))
        .and(with_state(state.clone()))
        .and_then(follow);

    let unfollow = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(config))
        .and(with_state(state))
        .and_then(unfollow);

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(change_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(read)
        .unify()
        .or(follow)
        .unify()
        .or(unfollow)
        .unify()
        .boxed()
}

async fn list_users(
    params: PageParams,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let window = params.window(&state.config)?;
    let (users, total) = fetch_users(window, &state.pool).await?;

    let subscribed = match session {
        Some(session) => {
            let ids: Vec<Id> = users.iter().map(|user| user.id).collect();
            subscribed_author_ids(session.user_id, &ids, &state.pool).await?
        }
        None => HashSet::new(),
    };

    let page = Page::from_rows(users, total, window, "/api/users")?.map(|user| {
        UserProfile {
            is_subscribed: subscribed.contains(&user.id),
            user,
        }
        .to_wire(&state.config)
    });
    Ok(reply::json(&page).into_response())
}

async fn register(form: UserCreateForm, state: AppState) -> Result<Response, Rejection> {
    let user = NewUser::from_wire(form, &state.config)?;
    let user = register_user(&user, &state.pool).await?;

    Ok(reply::with_status(
        reply::json(&user.to_wire(&state.config)),
        StatusCode::CREATED,
    )
    .into_response())
}

async fn read_me(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let profile = load_profile(session.user_id, Some(session.user_id), &state.pool).await?;
    Ok(reply::json(&profile.to_wire(&state.config)).into_response())
}

async fn read_user(
    id: Id,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let profile = load_profile(id, viewer, &state.pool).await?;
    Ok(reply::json(&profile.to_wire(&state.config)).into_response())
}

async fn change_password(
    session: SessionData,
    form: SetPasswordForm,
    state: AppState,
) -> Result<Response, Rejection> {
    let form = SetPasswordForm::from_wire(form, &state.config)?;
    set_password(session.user_id, &form, &state.pool).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_subscriptions(
    params: SubscriptionParams,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let recipes_limit = params.recipes_limit()?;
    let window = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .window(&state.config)?;

    let (authors, total) = fetch_subscriptions(session.user_id, window, &state.pool).await?;

    let mut details = Vec::with_capacity(authors.len());
    for author in authors {
        details.push(load_subscription(author, recipes_limit, &state.pool).await?);
    }

    let page = Page::from_rows(details, total, window, "/api/users/subscriptions")?
        .map(|detail| detail.to_wire(&state.config));
    Ok(reply::json(&page).into_response())
}

async fn follow(
    id: Id,
    params: SubscriptionParams,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let recipes_limit = params.recipes_limit()?;

    subscribe(session.user_id, id, &state.pool).await?;

    let author = get_user_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| Error::not_found("No user exists with specified id"))?;
    let detail = load_subscription(author, recipes_limit, &state.pool).await?;

    Ok(reply::with_status(
        reply::json(&detail.to_wire(&state.config)),
        StatusCode::CREATED,
    )
    .into_response())
}

async fn unfollow(id: Id, session: SessionData, state: AppState) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    unsubscribe(session.user_id, id, &state.pool).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_recipes_limit_is_rejected() {
        let params = SubscriptionParams {
            recipes_limit: Some(-1),
            ..Default::default()
        };
        assert!(matches!(params.recipes_limit(), Err(Error::Validation(_))));

        let params = SubscriptionParams {
            recipes_limit: Some(0),
            ..Default::default()
        };
        assert_eq!(params.recipes_limit().unwrap(), Some(0));
        assert_eq!(SubscriptionParams::default().recipes_limit().unwrap(), None);
    }
}
