//! Postgres 实现。唯一约束违反（23505）映射为 Conflict，
//! 其余数据库错误记日志后降级为 Internal。

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::routes::friend::model::{FriendKey, FriendRequest, Friendship};
use crate::routes::marker::model::{Marker, MarkerFilter, MarkerPage};
use crate::routes::user::model::User;
use crate::store::{FriendStore, MarkerStore, UserStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

fn db_err(err: sqlx::Error) -> AppError {
    match &err {
        // 外键违反意味着调用方引用了不存在的实体
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => AppError::NotFound,
        _ => AppError::internal(err),
    }
}

fn insert_err(err: sqlx::Error, conflict_message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::conflict(conflict_message)
        }
        _ => db_err(err),
    }
}

/// 关键词按字面子串匹配，LIKE 通配符在这里转义
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{}%", escaped)
}

impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, phone, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_err(e, "用户名、邮箱或手机号已存在"))
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn find_user_by_identity(&self, identity: &str) -> AppResult<Option<User>> {
        // 用户名优先于邮箱，邮箱优先于手机号
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE username = $1 OR email = $1 OR phone = $1
            ORDER BY (username = $1) DESC, (email = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }
}

/// 把可见性谓词和筛选条件追加到已有的 WHERE 子句之后
fn push_marker_predicates(
    qb: &mut QueryBuilder<'_, Postgres>,
    viewer: Uuid,
    filter: &MarkerFilter,
) {
    qb.push(" WHERE (visibility = 'public' OR creator_id = ");
    qb.push_bind(viewer);
    qb.push(" OR owner_id = ");
    qb.push_bind(viewer);
    qb.push(")");

    if let Some(keyword) = &filter.keyword {
        let pattern = like_pattern(keyword);
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR description ILIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
    if let Some(min) = filter.min_altitude {
        qb.push(" AND altitude >= ");
        qb.push_bind(min);
    }
    if let Some(max) = filter.max_altitude {
        qb.push(" AND altitude <= ");
        qb.push_bind(max);
    }
    if let Some(from) = filter.time_start {
        qb.push(" AND COALESCE(end_time, start_time) >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filter.time_end {
        qb.push(" AND start_time <= ");
        qb.push_bind(to);
    }
    if let Some(marker_type) = &filter.marker_type {
        qb.push(" AND marker_type = ");
        qb.push_bind(marker_type.clone());
    }
}

impl MarkerStore for PgStore {
    async fn insert_marker(&self, marker: Marker) -> AppResult<Marker> {
        sqlx::query_as::<_, Marker>(
            r#"
            INSERT INTO markers
                (id, title, description, longitude, latitude, altitude,
                 start_time, end_time, marker_type, creator_id, owner_id, visibility)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(marker.id)
        .bind(&marker.title)
        .bind(&marker.description)
        .bind(marker.longitude)
        .bind(marker.latitude)
        .bind(marker.altitude)
        .bind(marker.start_time)
        .bind(marker.end_time)
        .bind(&marker.marker_type)
        .bind(marker.creator_id)
        .bind(marker.owner_id)
        .bind(marker.visibility)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn find_marker(&self, id: Uuid) -> AppResult<Option<Marker>> {
        sqlx::query_as::<_, Marker>("SELECT * FROM markers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn update_marker(&self, marker: Marker) -> AppResult<Marker> {
        // creator_id 不在更新列里，创建后不可变
        sqlx::query_as::<_, Marker>(
            r#"
            UPDATE markers SET
                title = $2, description = $3, longitude = $4, latitude = $5,
                altitude = $6, start_time = $7, end_time = $8, marker_type = $9,
                owner_id = $10, visibility = $11
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(marker.id)
        .bind(&marker.title)
        .bind(&marker.description)
        .bind(marker.longitude)
        .bind(marker.latitude)
        .bind(marker.altitude)
        .bind(marker.start_time)
        .bind(marker.end_time)
        .bind(&marker.marker_type)
        .bind(marker.owner_id)
        .bind(marker.visibility)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(AppError::NotFound)
    }

    async fn delete_marker(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM markers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_visible_markers(
        &self,
        viewer: Uuid,
        filter: &MarkerFilter,
        offset: i64,
        limit: i64,
    ) -> AppResult<MarkerPage> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT count(*) FROM markers");
        push_marker_predicates(&mut count_qb, viewer, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM markers");
        push_marker_predicates(&mut qb, viewer, filter);
        qb.push(" ORDER BY start_time DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let items = qb
            .build_query_as::<Marker>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(MarkerPage { items, total })
    }
}

impl FriendStore for PgStore {
    async fn insert_friend_request(&self, request: FriendRequest) -> AppResult<FriendRequest> {
        sqlx::query_as::<_, FriendRequest>(
            r#"
            INSERT INTO friend_requests (id, requester_id, recipient_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.requester_id)
        .bind(request.recipient_id)
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_err(e, "好友请求已存在"))
    }

    async fn find_friend_request(&self, id: Uuid) -> AppResult<Option<FriendRequest>> {
        sqlx::query_as::<_, FriendRequest>("SELECT * FROM friend_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn delete_friend_request(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM friend_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_requests_for(&self, recipient_id: Uuid) -> AppResult<Vec<FriendRequest>> {
        sqlx::query_as::<_, FriendRequest>(
            "SELECT * FROM friend_requests WHERE recipient_id = $1 ORDER BY created_at",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn upsert_friendship(&self, friendship: Friendship) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO friendships (user_lo, user_hi, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_lo, user_hi) DO NOTHING
            "#,
        )
        .bind(friendship.user_lo)
        .bind(friendship.user_hi)
        .bind(friendship.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_friendship(&self, key: FriendKey) -> AppResult<()> {
        sqlx::query("DELETE FROM friendships WHERE user_lo = $1 AND user_hi = $2")
            .bind(key.user_lo)
            .bind(key.user_hi)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_friendships_of(&self, user_id: Uuid) -> AppResult<Vec<Friendship>> {
        sqlx::query_as::<_, Friendship>(
            "SELECT * FROM friendships WHERE user_lo = $1 OR user_hi = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}
