use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::{
    AppState,
    middleware::auth_middleware,
    routes::{friend, marker, user},
    store::Store,
};

/// 公开路由只有注册和登录，其余全部经过认证中间件。
pub fn build_router<S: Store>(state: AppState<S>) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(user::handler::register::<S>))
        .route("/auth/login", post(user::handler::login::<S>));

    let protected_routes = Router::new()
        // 标记路由
        .route(
            "/markers",
            post(marker::handler::create_marker::<S>).get(marker::handler::list_markers::<S>),
        )
        .route(
            "/markers/{id}",
            get(marker::handler::get_marker::<S>)
                .put(marker::handler::update_marker::<S>)
                .delete(marker::handler::delete_marker::<S>),
        )
        // 好友路由
        .route(
            "/friends",
            post(friend::handler::add_friend::<S>).get(friend::handler::list_friends::<S>),
        )
        .route(
            "/friends/requests",
            post(friend::handler::send_request::<S>).get(friend::handler::list_requests::<S>),
        )
        .route(
            "/friends/requests/{id}/accept",
            post(friend::handler::accept_request::<S>),
        )
        .route(
            "/friends/requests/{id}/decline",
            post(friend::handler::decline_request::<S>),
        )
        .route("/friends/{friend_id}", delete(friend::handler::remove_friend::<S>))
        // 应用认证中间件
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<S>,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
