use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Enrollment {
    pub id: i64,
    pub user: Option<i64>,
    pub course: Option<i64>,
    pub course_title: Option<String>,
    pub course_description: Option<String>,
    pub user_name: Option<String>,
    pub enrolled_date: Option<DateTime<Utc>>,
}

/// Answer to an enroll request. Enrolling twice is not an error; the
/// server just says so and omits the date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EnrollResponse {
    #[serde(default)]
    pub message: String,
    pub enrolled_date: Option<DateTime<Utc>>,
}

impl EnrollResponse {
    pub fn newly_enrolled(&self) -> bool {
        self.enrolled_date.is_some()
    }
}

/// A student's position in one video
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct VideoProgress {
    pub id: Option<i64>,
    pub user: Option<i64>,
    pub video: Option<i64>,
    pub video_title: Option<String>,
    pub course_id: Option<i64>,
    pub course_title: Option<String>,
    #[serde(default)]
    pub progress_percentage: f64,
    /// Seconds into the video
    #[serde(default)]
    pub last_watched_position: u32,
    #[serde(default)]
    pub is_completed: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub video_thumbnail_url: Option<String>,
}

/// Playback position reported while a student watches a video.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressUpdate {
    pub progress_percentage: f64,
    pub last_watched_position: u32,
}

impl ProgressUpdate {
    /// Build an update from the playback position and the video length.
    /// Percentages are clamped to 0..=100; a zero-length video counts as done.
    pub fn at_position(position_secs: u32, duration_secs: u32) -> Self {
        let percentage = if duration_secs == 0 {
            100.0
        } else {
            (f64::from(position_secs) / f64::from(duration_secs) * 100.0).clamp(0.0, 100.0)
        };
        Self {
            progress_percentage: percentage,
            last_watched_position: if duration_secs == 0 {
                position_secs
            } else {
                position_secs.min(duration_secs)
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SaveProgressResponse {
    #[serde(default)]
    pub message: String,
    pub progress: VideoProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CourseProgress {
    pub course_title: Option<String>,
    pub total_videos: u32,
    pub completed_videos: u32,
    pub progress_percentage: f64,
}

impl CourseProgress {
    pub fn is_complete(&self) -> bool {
        self.total_videos > 0 && self.completed_videos >= self.total_videos
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct VideoHistoryEntry {
    pub video: i64,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub last_watched_position: u32,
    #[serde(default)]
    pub is_completed: bool,
    pub updated_at: Option<DateTime<Utc>>,
}
