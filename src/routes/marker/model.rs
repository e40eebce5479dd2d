use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "marker_visibility", rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
    /// 声明了但没有协作者关系参与判定，访问控制上等同 private
    Shared,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Marker {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: Option<f64>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub marker_type: Option<String>,
    /// 创建者，创建后不可变
    pub creator_id: Uuid,
    /// 当前所有者，创建时等于创建者
    pub owner_id: Uuid,
    pub visibility: Visibility,
}

impl Marker {
    /// 写权限：创建者或所有者
    pub fn can_mutate(&self, user_id: Uuid) -> bool {
        user_id == self.creator_id || user_id == self.owner_id
    }

    /// 读权限：public 对所有人可见，其余仅创建者/所有者
    pub fn can_view(&self, user_id: Uuid) -> bool {
        self.visibility == Visibility::Public || self.can_mutate(user_id)
    }
}

/// 坐标校验。超界或非有限值直接拒绝，不做截断。
pub fn validate_coordinates(longitude: f64, latitude: f64) -> AppResult<()> {
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::validation(
            "longitude",
            format!("经度必须在 [-180, 180] 之间，得到 {}", longitude),
        ));
    }
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::validation(
            "latitude",
            format!("纬度必须在 [-90, 90] 之间，得到 {}", latitude),
        ));
    }
    Ok(())
}

pub fn validate_time_window(
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
) -> AppResult<()> {
    if let Some(end) = end_time {
        if end < start_time {
            return Err(AppError::validation("end_time", "结束时间不能早于开始时间"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateMarkerRequest {
    pub title: String,
    pub description: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub altitude: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub marker_type: Option<String>,
    pub visibility: Option<Visibility>,
}

/// 部分更新：缺省字段保持不变，字段必须显式出现才会生效。
/// 经纬度只有同时提供才会被应用。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMarkerRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub altitude: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub marker_type: Option<String>,
    pub visibility: Option<Visibility>,
}

/// 列表筛选条件，谓词之间取交集
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MarkerFilter {
    /// 大小写不敏感，匹配标题或描述
    pub keyword: Option<String>,
    pub min_altitude: Option<f64>,
    pub max_altitude: Option<f64>,
    pub time_start: Option<DateTime<Utc>>,
    pub time_end: Option<DateTime<Utc>>,
    pub marker_type: Option<String>,
}

impl MarkerFilter {
    pub fn matches(&self, marker: &Marker) -> bool {
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            let in_title = marker.title.to_lowercase().contains(&keyword);
            let in_description = marker
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(&keyword));
            if !in_title && !in_description {
                return false;
            }
        }

        // 高度筛选排除没有高度的标记
        if self.min_altitude.is_some() || self.max_altitude.is_some() {
            let Some(altitude) = marker.altitude else {
                return false;
            };
            if self.min_altitude.is_some_and(|min| altitude < min) {
                return false;
            }
            if self.max_altitude.is_some_and(|max| altitude > max) {
                return false;
            }
        }

        // 时间范围按窗口相交判定，无结束时间视为瞬时点
        let effective_end = marker.end_time.unwrap_or(marker.start_time);
        if self.time_start.is_some_and(|from| effective_end < from) {
            return false;
        }
        if self.time_end.is_some_and(|to| marker.start_time > to) {
            return false;
        }

        if let Some(marker_type) = &self.marker_type {
            if marker.marker_type.as_deref() != Some(marker_type.as_str()) {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Serialize)]
pub struct MarkerPage {
    pub items: Vec<Marker>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(creator: Uuid, visibility: Visibility) -> Marker {
        Marker {
            id: Uuid::new_v4(),
            title: "观测点".to_string(),
            description: Some("Summit Camera".to_string()),
            longitude: 116.4,
            latitude: 39.9,
            altitude: Some(120.0),
            start_time: Utc::now(),
            end_time: None,
            marker_type: Some("camera".to_string()),
            creator_id: creator,
            owner_id: creator,
            visibility,
        }
    }

    #[test]
    fn creator_and_owner_can_mutate_others_cannot() {
        let creator = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let mut m = marker(creator, Visibility::Private);
        assert!(m.can_mutate(creator));
        assert!(!m.can_mutate(stranger));

        // 所有权与创建者分离后两者都可写
        let new_owner = Uuid::new_v4();
        m.owner_id = new_owner;
        assert!(m.can_mutate(creator));
        assert!(m.can_mutate(new_owner));
        assert!(!m.can_mutate(stranger));
    }

    #[test]
    fn visibility_gates_view_not_mutate() {
        let creator = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let private = marker(creator, Visibility::Private);
        assert!(private.can_view(creator));
        assert!(!private.can_view(stranger));

        let public = marker(creator, Visibility::Public);
        assert!(public.can_view(stranger));
        assert!(!public.can_mutate(stranger));

        // shared 未接入协作者关系，等同 private
        let shared = marker(creator, Visibility::Shared);
        assert!(!shared.can_view(stranger));
    }

    #[test]
    fn coordinate_bounds_are_inclusive() {
        assert!(validate_coordinates(180.0, 90.0).is_ok());
        assert!(validate_coordinates(-180.0, -90.0).is_ok());

        let err = validate_coordinates(180.0001, 0.0).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "longitude", .. }));
        let err = validate_coordinates(0.0, -90.5).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "latitude", .. }));
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn end_before_start_rejected() {
        let now = Utc::now();
        assert!(validate_time_window(now, None).is_ok());
        assert!(validate_time_window(now, Some(now)).is_ok());
        let err = validate_time_window(now, Some(now - chrono::Duration::seconds(1))).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "end_time", .. }));
    }

    #[test]
    fn keyword_matches_title_or_description_case_insensitive() {
        let m = marker(Uuid::new_v4(), Visibility::Public);

        let by_title = MarkerFilter {
            keyword: Some("观测".to_string()),
            ..Default::default()
        };
        assert!(by_title.matches(&m));

        let by_description = MarkerFilter {
            keyword: Some("summit camera".to_string()),
            ..Default::default()
        };
        assert!(by_description.matches(&m));

        let miss = MarkerFilter {
            keyword: Some("docks".to_string()),
            ..Default::default()
        };
        assert!(!miss.matches(&m));
    }

    #[test]
    fn filter_predicates_intersect() {
        let m = marker(Uuid::new_v4(), Visibility::Public);

        let matching = MarkerFilter {
            keyword: Some("观测".to_string()),
            min_altitude: Some(100.0),
            max_altitude: Some(200.0),
            marker_type: Some("camera".to_string()),
            ..Default::default()
        };
        assert!(matching.matches(&m));

        // 单个谓词不满足即整体不命中
        let wrong_type = MarkerFilter {
            marker_type: Some("poi".to_string()),
            ..matching.clone()
        };
        assert!(!wrong_type.matches(&m));

        let too_low = MarkerFilter {
            min_altitude: Some(500.0),
            ..Default::default()
        };
        assert!(!too_low.matches(&m));
    }

    #[test]
    fn altitude_filter_excludes_markers_without_altitude() {
        let mut m = marker(Uuid::new_v4(), Visibility::Public);
        m.altitude = None;
        let filter = MarkerFilter {
            min_altitude: Some(0.0),
            ..Default::default()
        };
        assert!(!filter.matches(&m));
    }

    #[test]
    fn time_range_uses_window_overlap() {
        let mut m = marker(Uuid::new_v4(), Visibility::Public);
        let base = m.start_time;
        m.end_time = Some(base + chrono::Duration::hours(2));

        let overlapping = MarkerFilter {
            time_start: Some(base + chrono::Duration::hours(1)),
            time_end: Some(base + chrono::Duration::hours(3)),
            ..Default::default()
        };
        assert!(overlapping.matches(&m));

        let after = MarkerFilter {
            time_start: Some(base + chrono::Duration::hours(3)),
            ..Default::default()
        };
        assert!(!after.matches(&m));

        let before = MarkerFilter {
            time_end: Some(base - chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert!(!before.matches(&m));
    }
}
