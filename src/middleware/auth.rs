use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use uuid::Uuid;

use crate::{AppState, error::AppError, store::Store};

/// 解析后的请求身份。放进请求扩展，由下游处理器作为
/// 显式参数取用，不走任何全局状态。
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// 把 Bearer token 换成用户ID。缺失、格式错误、签名不符、
/// 过期都以 Unauthenticated 拒绝。
pub async fn auth_middleware<S: Store>(
    State(state): State<AppState<S>>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_| AppError::Unauthenticated)?;
    let user_id = state.tokens.verify(bearer.token())?;

    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}
