use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A course with its videos and resources.
///
/// The public course detail endpoint returns "locked" stubs for videos and
/// resources (id and title only), so most nested fields have defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    pub image_url: Option<String>,
}

impl Course {
    /// Total runtime of the course's videos in seconds
    pub fn total_duration(&self) -> u32 {
        self.videos.iter().map(|v| v.duration).sum()
    }

    pub fn published_videos(&self) -> impl Iterator<Item = &Video> {
        self.videos.iter().filter(|v| v.is_published)
    }
}

/// Fields an admin sends to create or replace a course.
#[derive(Debug, Clone, Serialize)]
pub struct CourseInput {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Length in seconds
    #[serde(default)]
    pub duration: u32,
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_published: bool,
    pub signed_url: Option<String>,
    /// Set on public course listings for users who are not enrolled
    #[serde(default)]
    pub locked: bool,
}

impl Video {
    /// Duration as `HH:MM:SS`
    pub fn formatted_duration(&self) -> String {
        let hours = self.duration / 3600;
        let minutes = (self.duration % 3600) / 60;
        let seconds = self.duration % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Metadata edits for an existing video. The file itself is not replaced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VideoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    #[default]
    Pdf,
    Word,
    Powerpoint,
    Excel,
    Link,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceType::Pdf => "PDF",
            ResourceType::Word => "Word Document",
            ResourceType::Powerpoint => "PowerPoint Presentation",
            ResourceType::Excel => "Excel Spreadsheet",
            ResourceType::Link => "Link",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Resource {
    pub id: i64,
    pub title: String,
    pub file: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub download_count: u32,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_duration() {
        let mut video: Video = serde_json::from_str(r#"{"id":1,"title":"Intro","duration":3725}"#).unwrap();
        assert_eq!(video.formatted_duration(), "01:02:05");
        video.duration = 59;
        assert_eq!(video.formatted_duration(), "00:00:59");
    }

    #[test]
    fn test_parse_course_detail() {
        let json = r#"{
            "id": 4,
            "title": "Rust Basics",
            "description": "Ownership and borrowing",
            "start_date": "2025-01-06",
            "end_date": "2025-03-28",
            "created_at": "2025-01-02T10:15:30.123456+05:30",
            "videos": [
                {"id": 10, "title": "Welcome", "description": null, "duration": 120,
                 "uploaded_at": "2025-01-02T10:20:00+05:30", "is_published": true,
                 "signed_url": "https://cdn.example.com/v/10?sig=x"},
                {"id": 11, "title": "Draft", "duration": 300, "is_published": false}
            ],
            "resources": [
                {"id": 3, "title": "Slides", "file": "resources/course_4/slides.pdf",
                 "resource_type": "powerpoint", "download_count": 12}
            ],
            "image_url": null
        }"#;

        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(course.start_date, NaiveDate::from_ymd_opt(2025, 1, 6));
        assert_eq!(course.total_duration(), 420);
        assert_eq!(course.published_videos().count(), 1);
        assert_eq!(course.resources[0].resource_type, ResourceType::Powerpoint);
        assert_eq!(course.resources[0].resource_type.to_string(), "PowerPoint Presentation");
        // Offsets are normalized to UTC
        assert_eq!(
            course.created_at.map(|t| t.to_rfc3339()),
            Some("2025-01-02T04:45:30.123456+00:00".to_string())
        );
    }

    #[test]
    fn test_parse_locked_public_course() {
        let json = r#"{"id":4,"title":"Rust Basics","description":"",
            "videos":[{"id":10,"title":"Welcome","locked":true}],
            "resources":[{"id":3,"title":"Slides","locked":true}]}"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert!(course.videos[0].locked);
        assert_eq!(course.videos[0].duration, 0);
        assert!(course.resources[0].locked);
        assert_eq!(course.resources[0].resource_type, ResourceType::Pdf);
    }

    #[test]
    fn test_video_update_skips_unset_fields() {
        let update = VideoUpdate {
            is_published: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"is_published": false})
        );
    }
}
