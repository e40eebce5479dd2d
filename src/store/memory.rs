//! 内存实现，测试用。互斥锁内完成“查重 + 写入”，
//! 与生产库的唯一约束提供相同的原子性。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::routes::friend::model::{FriendKey, FriendRequest, Friendship};
use crate::routes::marker::model::{Marker, MarkerFilter, MarkerPage};
use crate::routes::user::model::User;
use crate::store::{FriendStore, MarkerStore, UserStore};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    markers: HashMap<Uuid, Marker>,
    friend_requests: HashMap<Uuid, FriendRequest>,
    friendships: BTreeMap<FriendKey, Friendship>,
}

#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UserStore for MemStore {
    async fn insert_user(&self, user: User) -> AppResult<User> {
        let mut inner = self.lock();
        let duplicate = inner.users.values().any(|u| {
            u.username == user.username || u.email == user.email || u.phone == user.phone
        });
        if duplicate {
            return Err(AppError::conflict("用户名、邮箱或手机号已存在"));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_identity(&self, identity: &str) -> AppResult<Option<User>> {
        let inner = self.lock();
        let by_username = inner.users.values().find(|u| u.username == identity);
        let found = by_username
            .or_else(|| inner.users.values().find(|u| u.email == identity))
            .or_else(|| inner.users.values().find(|u| u.phone == identity));
        Ok(found.cloned())
    }
}

impl MarkerStore for MemStore {
    async fn insert_marker(&self, marker: Marker) -> AppResult<Marker> {
        self.lock().markers.insert(marker.id, marker.clone());
        Ok(marker)
    }

    async fn find_marker(&self, id: Uuid) -> AppResult<Option<Marker>> {
        Ok(self.lock().markers.get(&id).cloned())
    }

    async fn update_marker(&self, marker: Marker) -> AppResult<Marker> {
        let mut inner = self.lock();
        if !inner.markers.contains_key(&marker.id) {
            return Err(AppError::NotFound);
        }
        inner.markers.insert(marker.id, marker.clone());
        Ok(marker)
    }

    async fn delete_marker(&self, id: Uuid) -> AppResult<()> {
        self.lock().markers.remove(&id);
        Ok(())
    }

    async fn list_visible_markers(
        &self,
        viewer: Uuid,
        filter: &MarkerFilter,
        offset: i64,
        limit: i64,
    ) -> AppResult<MarkerPage> {
        let inner = self.lock();
        let mut visible: Vec<Marker> = inner
            .markers
            .values()
            .filter(|m| m.can_view(viewer) && filter.matches(m))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        let total = visible.len() as i64;
        let items = visible
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok(MarkerPage { items, total })
    }
}

impl FriendStore for MemStore {
    async fn insert_friend_request(&self, request: FriendRequest) -> AppResult<FriendRequest> {
        let mut inner = self.lock();
        let duplicate = inner.friend_requests.values().any(|r| {
            r.requester_id == request.requester_id && r.recipient_id == request.recipient_id
        });
        if duplicate {
            return Err(AppError::conflict("好友请求已存在"));
        }
        inner.friend_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_friend_request(&self, id: Uuid) -> AppResult<Option<FriendRequest>> {
        Ok(self.lock().friend_requests.get(&id).cloned())
    }

    async fn delete_friend_request(&self, id: Uuid) -> AppResult<()> {
        self.lock().friend_requests.remove(&id);
        Ok(())
    }

    async fn list_requests_for(&self, recipient_id: Uuid) -> AppResult<Vec<FriendRequest>> {
        let inner = self.lock();
        let mut requests: Vec<FriendRequest> = inner
            .friend_requests
            .values()
            .filter(|r| r.recipient_id == recipient_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(requests)
    }

    async fn upsert_friendship(&self, friendship: Friendship) -> AppResult<()> {
        let mut inner = self.lock();
        // 已存在保留原行，保持首次成为好友的时间
        inner
            .friendships
            .entry(friendship.key())
            .or_insert(friendship);
        Ok(())
    }

    async fn delete_friendship(&self, key: FriendKey) -> AppResult<()> {
        self.lock().friendships.remove(&key);
        Ok(())
    }

    async fn list_friendships_of(&self, user_id: Uuid) -> AppResult<Vec<Friendship>> {
        let inner = self.lock();
        Ok(inner
            .friendships
            .values()
            .filter(|f| f.user_lo == user_id || f.user_hi == user_id)
            .cloned()
            .collect())
    }
}
