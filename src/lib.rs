use std::sync::Arc;

use crate::auth::TokenService;
use crate::store::Store;

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod result;
pub mod router;
pub mod routes;
pub mod store;

/// 进程级共享状态。签名密钥启动后只读，记录存储自带
/// 行级原子性，请求之间没有其他共享可变状态。
#[derive(Clone)]
pub struct AppState<S: Store> {
    pub store: S,
    pub tokens: Arc<TokenService>,
}
