//! 标记生命周期编排：创建/查询/更新/删除/列表。
//! 检查顺序固定：存在性先于权限，权限先于字段校验，
//! 错误优先级可预期。

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::MarkerStore;

use super::model::{
    CreateMarkerRequest, Marker, MarkerFilter, MarkerPage, UpdateMarkerRequest, Visibility,
    validate_coordinates, validate_time_window,
};

fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::validation("title", "标题不能为空"));
    }
    Ok(())
}

pub async fn create<S: MarkerStore>(
    store: &S,
    creator_id: Uuid,
    req: CreateMarkerRequest,
) -> AppResult<Marker> {
    validate_title(&req.title)?;

    let longitude = req
        .longitude
        .ok_or_else(|| AppError::validation("longitude", "缺少经度"))?;
    let latitude = req
        .latitude
        .ok_or_else(|| AppError::validation("latitude", "缺少纬度"))?;
    validate_coordinates(longitude, latitude)?;

    let start_time = req.start_time.unwrap_or_else(Utc::now);
    validate_time_window(start_time, req.end_time)?;

    let marker = Marker {
        id: Uuid::new_v4(),
        title: req.title,
        description: req.description,
        longitude,
        latitude,
        altitude: req.altitude,
        start_time,
        end_time: req.end_time,
        marker_type: req.marker_type,
        creator_id,
        owner_id: creator_id,
        visibility: req.visibility.unwrap_or(Visibility::Private),
    };

    store.insert_marker(marker).await
}

pub async fn get<S: MarkerStore>(store: &S, id: Uuid, requester_id: Uuid) -> AppResult<Marker> {
    let marker = store.find_marker(id).await?.ok_or(AppError::NotFound)?;
    if !marker.can_view(requester_id) {
        return Err(AppError::Forbidden);
    }
    Ok(marker)
}

pub async fn update<S: MarkerStore>(
    store: &S,
    id: Uuid,
    requester_id: Uuid,
    req: UpdateMarkerRequest,
) -> AppResult<Marker> {
    let mut marker = store.find_marker(id).await?.ok_or(AppError::NotFound)?;
    if !marker.can_mutate(requester_id) {
        return Err(AppError::Forbidden);
    }

    // 只应用显式出现的字段。经纬度必须成对出现，单边不生效。
    if let (Some(longitude), Some(latitude)) = (req.longitude, req.latitude) {
        validate_coordinates(longitude, latitude)?;
        marker.longitude = longitude;
        marker.latitude = latitude;
    }
    if let Some(title) = req.title {
        validate_title(&title)?;
        marker.title = title;
    }
    if let Some(description) = req.description {
        marker.description = Some(description);
    }
    if let Some(altitude) = req.altitude {
        marker.altitude = Some(altitude);
    }
    if let Some(start_time) = req.start_time {
        marker.start_time = start_time;
    }
    if let Some(end_time) = req.end_time {
        marker.end_time = Some(end_time);
    }
    if let Some(marker_type) = req.marker_type {
        marker.marker_type = Some(marker_type);
    }
    if let Some(visibility) = req.visibility {
        marker.visibility = visibility;
    }

    // 合并后的时间窗整体复查
    validate_time_window(marker.start_time, marker.end_time)?;

    store.update_marker(marker).await
}

pub async fn delete<S: MarkerStore>(store: &S, id: Uuid, requester_id: Uuid) -> AppResult<()> {
    let marker = store.find_marker(id).await?.ok_or(AppError::NotFound)?;
    if !marker.can_mutate(requester_id) {
        return Err(AppError::Forbidden);
    }
    store.delete_marker(id).await
}

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

pub async fn list<S: MarkerStore>(
    store: &S,
    requester_id: Uuid,
    filter: &MarkerFilter,
    page: Option<i64>,
    page_size: Option<i64>,
) -> AppResult<MarkerPage> {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * page_size;

    store
        .list_visible_markers(requester_id, filter, offset, page_size)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn request(longitude: f64, latitude: f64) -> CreateMarkerRequest {
        CreateMarkerRequest {
            title: "测试点".to_string(),
            description: None,
            longitude: Some(longitude),
            latitude: Some(latitude),
            altitude: None,
            start_time: None,
            end_time: None,
            marker_type: None,
            visibility: None,
        }
    }

    #[tokio::test]
    async fn create_defaults_owner_visibility_and_start_time() {
        let store = MemStore::new();
        let creator = Uuid::new_v4();
        let before = Utc::now();
        let marker = create(&store, creator, request(10.0, 20.0)).await.unwrap();

        assert_eq!(marker.creator_id, creator);
        assert_eq!(marker.owner_id, creator);
        assert_eq!(marker.visibility, Visibility::Private);
        assert!(marker.start_time >= before && marker.start_time <= Utc::now());
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_coordinates() {
        let store = MemStore::new();
        let creator = Uuid::new_v4();

        // 边界值本身合法
        assert!(create(&store, creator, request(180.0, 90.0)).await.is_ok());

        let err = create(&store, creator, request(180.0001, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "longitude", .. }));
    }

    #[tokio::test]
    async fn create_rejects_missing_coordinates_and_empty_title() {
        let store = MemStore::new();
        let creator = Uuid::new_v4();

        let mut req = request(0.0, 0.0);
        req.latitude = None;
        let err = create(&store, creator, req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "latitude", .. }));

        let mut req = request(0.0, 0.0);
        req.title = "   ".to_string();
        let err = create(&store, creator, req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "title", .. }));
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let store = MemStore::new();
        let creator = Uuid::new_v4();
        let mut req = request(10.0, 20.0);
        req.description = Some("原描述".to_string());
        let marker = create(&store, creator, req).await.unwrap();

        let patch = UpdateMarkerRequest {
            title: Some("新标题".to_string()),
            ..Default::default()
        };
        let updated = update(&store, marker.id, creator, patch).await.unwrap();

        assert_eq!(updated.title, "新标题");
        assert_eq!(updated.description, marker.description);
        assert_eq!(updated.longitude, marker.longitude);
        assert_eq!(updated.latitude, marker.latitude);
        assert_eq!(updated.start_time, marker.start_time);
        assert_eq!(updated.visibility, marker.visibility);
    }

    #[tokio::test]
    async fn update_ignores_one_sided_coordinate() {
        let store = MemStore::new();
        let creator = Uuid::new_v4();
        let marker = create(&store, creator, request(10.0, 20.0)).await.unwrap();

        let patch = UpdateMarkerRequest {
            longitude: Some(50.0),
            ..Default::default()
        };
        let updated = update(&store, marker.id, creator, patch).await.unwrap();
        assert_eq!(updated.longitude, 10.0);
        assert_eq!(updated.latitude, 20.0);
    }

    #[tokio::test]
    async fn update_revalidates_merged_time_window() {
        let store = MemStore::new();
        let creator = Uuid::new_v4();
        let marker = create(&store, creator, request(10.0, 20.0)).await.unwrap();

        let patch = UpdateMarkerRequest {
            end_time: Some(marker.start_time - chrono::Duration::hours(1)),
            ..Default::default()
        };
        let err = update(&store, marker.id, creator, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "end_time", .. }));
    }

    #[tokio::test]
    async fn not_found_takes_precedence_over_forbidden() {
        let store = MemStore::new();
        let stranger = Uuid::new_v4();
        let missing = Uuid::new_v4();

        assert_eq!(get(&store, missing, stranger).await.unwrap_err(), AppError::NotFound);
        assert_eq!(
            update(&store, missing, stranger, UpdateMarkerRequest::default())
                .await
                .unwrap_err(),
            AppError::NotFound
        );
        assert_eq!(delete(&store, missing, stranger).await.unwrap_err(), AppError::NotFound);
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let store = MemStore::new();
        let creator = Uuid::new_v4();
        let marker = create(&store, creator, request(10.0, 20.0)).await.unwrap();

        delete(&store, marker.id, creator).await.unwrap();
        assert_eq!(get(&store, marker.id, creator).await.unwrap_err(), AppError::NotFound);
    }

    #[tokio::test]
    async fn list_returns_only_visible_markers() {
        let store = MemStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        create(&store, alice, request(1.0, 1.0)).await.unwrap();
        let mut public = request(2.0, 2.0);
        public.visibility = Some(Visibility::Public);
        create(&store, alice, public).await.unwrap();

        let page = list(&store, bob, &MarkerFilter::default(), None, None)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].visibility, Visibility::Public);

        let page = list(&store, alice, &MarkerFilter::default(), None, None)
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }
}
