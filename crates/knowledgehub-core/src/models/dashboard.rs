//! Dashboard summaries for students and administrators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Enrollment, VideoProgress};

/// `GET /student_dashboard/overview/`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StudentDashboard {
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub enrolled_courses: Vec<DashboardEnrollment>,
    /// Videos started but not finished, most recent first
    #[serde(default)]
    pub continue_watching: Vec<VideoProgress>,
    /// Latest courses the student is not enrolled in
    #[serde(default)]
    pub available_courses: Vec<CourseSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardEnrollment {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    #[serde(default)]
    pub progress_percentage: f64,
    pub course_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CourseSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub course_image_url: Option<String>,
}

/// `GET /admin_dashboard/platform-stats/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PlatformStats {
    pub total_users: u64,
    pub total_courses: u64,
    pub total_enrollments: u64,
    pub total_videos: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CourseCompletion {
    pub course_title: String,
    pub total_students: u64,
    /// Percentage, rounded to two decimals by the server
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ActiveUsersPoint {
    pub date: NaiveDate,
    pub active_users_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_student_dashboard() {
        let json = r#"{
            "user_id": 7,
            "name": "alice",
            "enrolled_courses": [
                {"id": 1, "user": 7, "course": 4, "course_title": "Rust Basics",
                 "course_description": "Ownership", "user_name": "alice",
                 "enrolled_date": "2025-01-10T08:00:00Z",
                 "progress_percentage": 33.3, "course_image_url": null}
            ],
            "continue_watching": [
                {"id": 5, "video": 10, "video_title": "Welcome", "course_id": 4,
                 "progress_percentage": 33.3, "last_watched_position": 42, "is_completed": false}
            ],
            "available_courses": [
                {"id": 9, "title": "Async Rust", "description": "Futures",
                 "start_date": "2025-04-01", "end_date": "2025-06-01", "course_image_url": null}
            ]
        }"#;

        let dashboard: StudentDashboard = serde_json::from_str(json).unwrap();
        assert_eq!(dashboard.enrolled_courses[0].enrollment.course, Some(4));
        assert_eq!(dashboard.enrolled_courses[0].progress_percentage, 33.3);
        assert_eq!(dashboard.continue_watching[0].last_watched_position, 42);
        assert_eq!(dashboard.available_courses[0].title, "Async Rust");
    }

    #[test]
    fn test_parse_active_users() {
        let points: Vec<ActiveUsersPoint> =
            serde_json::from_str(r#"[{"date":"2025-02-01","active_users_count":12}]"#).unwrap();
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(points[0].active_users_count, 12);
    }
}
