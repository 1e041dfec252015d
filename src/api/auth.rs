use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{self, Response},
    Filter, Reply,
};

use crate::{actions::login_user, form::LoginForm, serializers::TokenRead};

use super::{json_body, with_state, AppState};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body::<LoginForm>(&state.config))
        .and(with_state(state))
        .and_then(login)
        .boxed()
}

async fn login(form: LoginForm, state: AppState) -> Result<Response, Rejection> {
    let auth_token = login_user(&form.email, &form.password, &state.config, &state.pool).await?;
    Ok(reply::json(&TokenRead { auth_token }).into_response())
}
