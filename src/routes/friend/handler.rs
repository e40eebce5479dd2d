use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::AuthUser,
    result::{ApiResult, ok},
    store::Store,
};

use super::model::{FriendInfo, FriendRequestInfo, SendFriendRequestRequest};
use super::service;

#[derive(Debug, Serialize)]
pub struct SendFriendRequestResponse {
    pub request_id: Uuid,
}

pub async fn send_request<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<SendFriendRequestRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<SendFriendRequestResponse>>)> {
    let request = service::send_request(&state.store, user_id, req.target_user_id).await?;
    Ok((
        StatusCode::CREATED,
        ok(SendFriendRequestResponse {
            request_id: request.id,
        }),
    ))
}

pub async fn list_requests<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<Json<ApiResult<Vec<FriendRequestInfo>>>> {
    let requests = service::list_received_requests(&state.store, user_id).await?;

    let mut infos = Vec::with_capacity(requests.len());
    for request in requests {
        let sender = state.store.find_user_by_id(request.requester_id).await?;
        infos.push(FriendRequestInfo {
            id: request.id,
            sender_id: request.requester_id,
            sender_name: sender.map(|u| u.username),
            request_date: request.created_at,
        });
    }
    Ok(ok(infos))
}

pub async fn accept_request<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResult<()>>> {
    service::handle_request(&state.store, id, user_id, true).await?;
    Ok(ok(()))
}

pub async fn decline_request<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResult<()>>> {
    service::handle_request(&state.store, id, user_id, false).await?;
    Ok(ok(()))
}

/// 直接添加好友是管理端捷径，服务层自身不做权限检查，
/// 暴露面在这里收紧到管理员
pub async fn add_friend<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<SendFriendRequestRequest>,
) -> AppResult<Json<ApiResult<()>>> {
    let caller = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    if !caller.is_admin() {
        return Err(AppError::Forbidden);
    }

    service::add_friend_direct(&state.store, user_id, req.target_user_id).await?;
    Ok(ok(()))
}

pub async fn remove_friend<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(friend_id): Path<Uuid>,
) -> AppResult<Json<ApiResult<()>>> {
    service::remove_friend(&state.store, user_id, friend_id).await?;
    Ok(ok(()))
}

pub async fn list_friends<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> AppResult<Json<ApiResult<Vec<FriendInfo>>>> {
    let friendships = service::list_friends(&state.store, user_id).await?;

    let mut infos = Vec::with_capacity(friendships.len());
    for friendship in friendships {
        let other_id = friendship.other(user_id);
        let other = state.store.find_user_by_id(other_id).await?;
        let (username, email, phone) = match other {
            Some(u) => (Some(u.username), Some(u.email), Some(u.phone)),
            None => (None, None, None),
        };
        infos.push(FriendInfo {
            user_id: other_id,
            username,
            email,
            phone,
            since: friendship.created_at,
        });
    }
    Ok(ok(infos))
}
