use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 一条方向性的待处理请求。每个有序 (requester, recipient)
/// 对至多存在一条，重复发送会被拒绝。
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FriendRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn new(requester_id: Uuid, recipient_id: Uuid) -> Self {
        FriendRequest {
            id: Uuid::new_v4(),
            requester_id,
            recipient_id,
            created_at: Utc::now(),
        }
    }
}

/// 无序用户对的规范化存储键：小的ID在前。
/// 保证每对用户与方向无关只有一行。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FriendKey {
    pub user_lo: Uuid,
    pub user_hi: Uuid,
}

impl FriendKey {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            FriendKey { user_lo: a, user_hi: b }
        } else {
            FriendKey { user_lo: b, user_hi: a }
        }
    }
}

/// 好友关系行。行存在即互为好友，没有 pending 状态。
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Friendship {
    pub user_lo: Uuid,
    pub user_hi: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        let key = FriendKey::new(a, b);
        Friendship {
            user_lo: key.user_lo,
            user_hi: key.user_hi,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> FriendKey {
        FriendKey::new(self.user_lo, self.user_hi)
    }

    /// 给定一端，返回另一端
    pub fn other(&self, user_id: Uuid) -> Uuid {
        if self.user_lo == user_id {
            self.user_hi
        } else {
            self.user_lo
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendFriendRequestRequest {
    pub target_user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestInfo {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: Option<String>,
    pub request_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FriendInfo {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub since: DateTime<Utc>,
}
