//! 外部记录存储的抽象。存储只提供按ID的增删改查和少量
//! 查询能力；唯一约束（待处理请求的有序对、好友关系的规范化键、
//! 账号三元组）由存储层强制，并发下的重复插入在这里被拒绝。

use std::future::Future;

use uuid::Uuid;

use crate::error::AppResult;
use crate::routes::friend::model::{FriendKey, FriendRequest, Friendship};
use crate::routes::marker::model::{Marker, MarkerFilter, MarkerPage};
use crate::routes::user::model::User;

mod memory;
mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

pub trait UserStore: Send + Sync {
    /// 用户名/邮箱/手机号任一重复返回 Conflict
    fn insert_user(&self, user: User) -> impl Future<Output = AppResult<User>> + Send;

    fn find_user_by_id(&self, id: Uuid) -> impl Future<Output = AppResult<Option<User>>> + Send;

    /// 依次按用户名、邮箱、手机号匹配
    fn find_user_by_identity(
        &self,
        identity: &str,
    ) -> impl Future<Output = AppResult<Option<User>>> + Send;
}

pub trait MarkerStore: Send + Sync {
    fn insert_marker(&self, marker: Marker) -> impl Future<Output = AppResult<Marker>> + Send;

    fn find_marker(&self, id: Uuid) -> impl Future<Output = AppResult<Option<Marker>>> + Send;

    /// 整行覆盖保存，部分更新语义由上层合并后调用
    fn update_marker(&self, marker: Marker) -> impl Future<Output = AppResult<Marker>> + Send;

    fn delete_marker(&self, id: Uuid) -> impl Future<Output = AppResult<()>> + Send;

    /// 对 viewer 可见的标记，经过筛选后按开始时间倒序分页
    fn list_visible_markers(
        &self,
        viewer: Uuid,
        filter: &MarkerFilter,
        offset: i64,
        limit: i64,
    ) -> impl Future<Output = AppResult<MarkerPage>> + Send;
}

pub trait FriendStore: Send + Sync {
    /// 同一有序对已有待处理请求时返回 Conflict
    fn insert_friend_request(
        &self,
        request: FriendRequest,
    ) -> impl Future<Output = AppResult<FriendRequest>> + Send;

    fn find_friend_request(
        &self,
        id: Uuid,
    ) -> impl Future<Output = AppResult<Option<FriendRequest>>> + Send;

    fn delete_friend_request(&self, id: Uuid) -> impl Future<Output = AppResult<()>> + Send;

    fn list_requests_for(
        &self,
        recipient_id: Uuid,
    ) -> impl Future<Output = AppResult<Vec<FriendRequest>>> + Send;

    /// 幂等写入：规范化键已存在不算错误
    fn upsert_friendship(
        &self,
        friendship: Friendship,
    ) -> impl Future<Output = AppResult<()>> + Send;

    /// 行不存在时为 no-op
    fn delete_friendship(&self, key: FriendKey) -> impl Future<Output = AppResult<()>> + Send;

    fn list_friendships_of(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = AppResult<Vec<Friendship>>> + Send;
}

/// 服务层对存储的完整依赖
pub trait Store:
    UserStore + MarkerStore + FriendStore + Clone + Send + Sync + 'static
{
}

impl<T> Store for T where T: UserStore + MarkerStore + FriendStore + Clone + Send + Sync + 'static {}
