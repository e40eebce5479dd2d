use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppResult,
    middleware::AuthUser,
    result::{ApiResult, ok},
    store::Store,
};

use super::model::{CreateMarkerRequest, Marker, MarkerFilter, MarkerPage, UpdateMarkerRequest};
use super::service;

pub async fn create_marker<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<CreateMarkerRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<Marker>>)> {
    let marker = service::create(&state.store, user_id, req).await?;
    Ok((StatusCode::CREATED, ok(marker)))
}

pub async fn get_marker<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResult<Marker>>> {
    let marker = service::get(&state.store, id, user_id).await?;
    Ok(ok(marker))
}

/// 查询参数与筛选条件一一对应，serde_urlencoded 不支持
/// flatten，字段在这里平铺
#[derive(Debug, Deserialize)]
pub struct ListMarkersQuery {
    pub keyword: Option<String>,
    pub min_altitude: Option<f64>,
    pub max_altitude: Option<f64>,
    pub time_start: Option<DateTime<Utc>>,
    pub time_end: Option<DateTime<Utc>>,
    pub marker_type: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn list_markers<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(query): Query<ListMarkersQuery>,
) -> AppResult<Json<ApiResult<MarkerPage>>> {
    let filter = MarkerFilter {
        keyword: query.keyword,
        min_altitude: query.min_altitude,
        max_altitude: query.max_altitude,
        time_start: query.time_start,
        time_end: query.time_end,
        marker_type: query.marker_type,
    };
    let page = service::list(&state.store, user_id, &filter, query.page, query.page_size).await?;
    Ok(ok(page))
}

pub async fn update_marker<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMarkerRequest>,
) -> AppResult<Json<ApiResult<Marker>>> {
    let marker = service::update(&state.store, id, user_id, req).await?;
    Ok(ok(marker))
}

pub async fn delete_marker<S: Store>(
    State(state): State<AppState<S>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResult<()>>> {
    service::delete(&state.store, id, user_id).await?;
    Ok(ok(()))
}
