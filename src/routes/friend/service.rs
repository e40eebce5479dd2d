//! 好友关系状态机。每个有序对 (A, B) 的迁移：
//! none → pending(A→B) → friends(A,B)（接受）或 none（拒绝），
//! friends → none（任一方解除）。
//!
//! send_request 不检查反向请求和既有好友关系，双向交叉的请求
//! 可以并存，各自独立处理；接受时好友行按规范化键幂等写入。

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{FriendStore, UserStore};

use super::model::{FriendKey, FriendRequest, Friendship};

/// 目标用户不存在时返回 NotFound，两种存储表现一致
async fn ensure_user_exists<S: UserStore>(store: &S, user_id: Uuid) -> AppResult<()> {
    store
        .find_user_by_id(user_id)
        .await?
        .map(|_| ())
        .ok_or(AppError::NotFound)
}

pub async fn send_request<S: FriendStore + UserStore>(
    store: &S,
    requester_id: Uuid,
    recipient_id: Uuid,
) -> AppResult<FriendRequest> {
    if requester_id == recipient_id {
        return Err(AppError::validation(
            "target_user_id",
            "不能向自己发送好友请求",
        ));
    }
    ensure_user_exists(store, recipient_id).await?;
    // 存储层的唯一约束保证并发下重复请求也会被拒绝
    store
        .insert_friend_request(FriendRequest::new(requester_id, recipient_id))
        .await
}

/// 接受或拒绝请求。两种结果都删除请求行；
/// 接受同时幂等写入规范化的好友行。
/// 只有请求的接收者可以处理，存在性检查先于权限检查。
pub async fn handle_request<S: FriendStore>(
    store: &S,
    request_id: Uuid,
    handler_id: Uuid,
    accept: bool,
) -> AppResult<()> {
    let request = store
        .find_friend_request(request_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if request.recipient_id != handler_id {
        return Err(AppError::Forbidden);
    }

    if accept {
        store
            .upsert_friendship(Friendship::new(request.requester_id, request.recipient_id))
            .await?;
    }
    store.delete_friend_request(request_id).await
}

/// 直接建立好友关系，绕过请求流程。本函数自身不做权限
/// 检查，调用方负责限制暴露面。
pub async fn add_friend_direct<S: FriendStore + UserStore>(
    store: &S,
    user_a: Uuid,
    user_b: Uuid,
) -> AppResult<()> {
    if user_a == user_b {
        return Err(AppError::validation(
            "target_user_id",
            "不能添加自己为好友",
        ));
    }
    ensure_user_exists(store, user_b).await?;
    store.upsert_friendship(Friendship::new(user_a, user_b)).await
}

/// 解除好友关系。行不存在时为 no-op，不报错。
pub async fn remove_friend<S: FriendStore>(
    store: &S,
    user_a: Uuid,
    user_b: Uuid,
) -> AppResult<()> {
    store.delete_friendship(FriendKey::new(user_a, user_b)).await
}

/// 返回 user 参与的每条好友行的另一端
pub async fn list_friends<S: FriendStore>(store: &S, user_id: Uuid) -> AppResult<Vec<Friendship>> {
    store.list_friendships_of(user_id).await
}

pub async fn list_received_requests<S: FriendStore>(
    store: &S,
    recipient_id: Uuid,
) -> AppResult<Vec<FriendRequest>> {
    store.list_requests_for(recipient_id).await
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::routes::user::model::{Role, User};
    use crate::store::MemStore;

    async fn user(store: &MemStore) -> Uuid {
        let id = Uuid::new_v4();
        let tag = id.simple().to_string();
        store
            .insert_user(User {
                id,
                username: format!("u{tag}"),
                email: format!("{tag}@test.local"),
                phone: tag.clone(),
                password_hash: String::new(),
                role: Role::User,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn duplicate_send_is_conflict() {
        let store = MemStore::new();
        let a = user(&store).await;
        let b = user(&store).await;

        send_request(&store, a, b).await.unwrap();
        let err = send_request(&store, a, b).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn send_to_self_is_rejected() {
        let store = MemStore::new();
        let a = Uuid::new_v4();
        let err = send_request(&store, a, a).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn accept_creates_single_row_and_deletes_request() {
        let store = MemStore::new();
        let a = user(&store).await;
        let b = user(&store).await;

        let request = send_request(&store, a, b).await.unwrap();
        handle_request(&store, request.id, b, true).await.unwrap();

        let of_a = list_friends(&store, a).await.unwrap();
        let of_b = list_friends(&store, b).await.unwrap();
        assert_eq!(of_a.len(), 1);
        assert_eq!(of_b.len(), 1);
        assert_eq!(of_a[0].other(a), b);
        assert_eq!(of_a[0].key(), of_b[0].key());

        // 请求行已删除，再次处理是 NotFound
        assert_eq!(
            handle_request(&store, request.id, b, true).await.unwrap_err(),
            AppError::NotFound
        );
    }

    #[tokio::test]
    async fn decline_deletes_request_without_friendship() {
        let store = MemStore::new();
        let a = user(&store).await;
        let b = user(&store).await;

        let request = send_request(&store, a, b).await.unwrap();
        handle_request(&store, request.id, b, false).await.unwrap();

        assert!(list_friends(&store, a).await.unwrap().is_empty());
        // 拒绝后同方向可以重新发送
        send_request(&store, a, b).await.unwrap();
    }

    #[tokio::test]
    async fn only_recipient_may_handle() {
        let store = MemStore::new();
        let a = user(&store).await;
        let b = user(&store).await;
        let c = Uuid::new_v4();

        let request = send_request(&store, a, b).await.unwrap();
        assert_eq!(
            handle_request(&store, request.id, c, true).await.unwrap_err(),
            AppError::Forbidden
        );
        // 请求仍然在，真正的接收者可以处理
        handle_request(&store, request.id, b, true).await.unwrap();
    }

    #[tokio::test]
    async fn crossed_requests_resolve_independently() {
        let store = MemStore::new();
        let a = user(&store).await;
        let b = user(&store).await;

        // 反向请求不被查重，允许并存
        let ab = send_request(&store, a, b).await.unwrap();
        let ba = send_request(&store, b, a).await.unwrap();

        handle_request(&store, ab.id, b, true).await.unwrap();
        // 第二次接受是对已有行的幂等写入
        handle_request(&store, ba.id, a, true).await.unwrap();

        assert_eq!(list_friends(&store, a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_friend_twice_is_noop() {
        let store = MemStore::new();
        let a = user(&store).await;
        let b = user(&store).await;

        add_friend_direct(&store, a, b).await.unwrap();
        remove_friend(&store, a, b).await.unwrap();
        assert!(list_friends(&store, a).await.unwrap().is_empty());

        // 第二次删除已经不存在的行不是错误
        remove_friend(&store, b, a).await.unwrap();
    }

    #[tokio::test]
    async fn send_to_unknown_user_is_not_found() {
        let store = MemStore::new();
        let a = user(&store).await;

        // 目标用户不存在时不落任何请求行
        let err = send_request(&store, a, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err, AppError::NotFound);
    }

    #[tokio::test]
    async fn direct_add_unknown_user_is_not_found() {
        let store = MemStore::new();
        let a = user(&store).await;

        let err = add_friend_direct(&store, a, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err, AppError::NotFound);
        assert!(list_friends(&store, a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn direct_add_is_idempotent_and_canonical() {
        let store = MemStore::new();
        let a = user(&store).await;
        let b = user(&store).await;

        add_friend_direct(&store, a, b).await.unwrap();
        add_friend_direct(&store, b, a).await.unwrap();

        let friends = list_friends(&store, a).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert!(friends[0].user_lo <= friends[0].user_hi);
    }
}
