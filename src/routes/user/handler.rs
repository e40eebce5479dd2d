use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{hash_password, verify_password},
    error::{AppError, AppResult},
    result::{ApiResult, ok},
    store::Store,
};

use super::model::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Role, User};

pub async fn register<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<RegisterResponse>>)> {
    // 用户名只允许字母、数字和下划线
    if req.username.is_empty()
        || !req.username.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        return Err(AppError::validation(
            "username",
            "用户名只允许使用字母、数字和下划线",
        ));
    }
    if req.password.is_empty() {
        return Err(AppError::validation("password", "密码不能为空"));
    }
    if !req.email.contains('@') {
        return Err(AppError::validation("email", "邮箱格式无效"));
    }

    let password_hash = hash_password(&req.password).map_err(AppError::internal)?;
    let user = User {
        id: Uuid::new_v4(),
        username: req.username,
        email: req.email,
        phone: req.phone,
        password_hash,
        role: Role::User,
        created_at: Utc::now(),
    };

    // 重复的用户名/邮箱/手机号由存储层报 Conflict
    let user = state.store.insert_user(user).await?;
    let (token, expires_at) = state.tokens.issue(user.id)?;

    Ok((
        StatusCode::CREATED,
        ok(RegisterResponse {
            user_id: user.id,
            username: user.username,
            token,
            expires_at,
        }),
    ))
}

pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResult<LoginResponse>>> {
    // 账号不存在和密码错误返回同样的错误，避免账号枚举
    let user = state
        .store
        .find_user_by_identity(&req.identity)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    match verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(AppError::Unauthenticated),
        Err(e) => return Err(AppError::internal(e)),
    }

    let (token, expires_at) = state.tokens.issue(user.id)?;
    Ok(ok(LoginResponse {
        user_id: user.id,
        username: user.username,
        token,
        expires_at,
    }))
}
