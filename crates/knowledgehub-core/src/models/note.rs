use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note a student took at a point in a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Note {
    pub id: i64,
    pub user: Option<i64>,
    pub video: Option<i64>,
    pub video_title: Option<String>,
    pub content: String,
    /// Seconds into the video where the note was taken
    #[serde(default)]
    pub video_position: u32,
    pub timestamp: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Playback position as `MM:SS`, or `H:MM:SS` past the first hour
    pub fn position_display(&self) -> String {
        let hours = self.video_position / 3600;
        let minutes = (self.video_position % 3600) / 60;
        let seconds = self.video_position % 60;
        if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteInput {
    pub content: String,
    pub video_position: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        let mut note: Note =
            serde_json::from_str(r#"{"id":1,"content":"ownership rules","video_position":95}"#).unwrap();
        assert_eq!(note.position_display(), "01:35");

        note.video_position = 3661;
        assert_eq!(note.position_display(), "1:01:01");
    }
}
