use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Notification {
    /// UUID used by the mark-read and update endpoints
    pub notification_id: String,
    pub user: Option<i64>,
    /// Set for course announcements, absent for platform-wide ones
    pub course: Option<i64>,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Announcement sent by an admin, either to one course or to every student.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<i64>,
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notifications() {
        let json = r#"[
            {"notification_id":"8f14e45f-ceea-4e7a-9d1b-2c3b6f5a1d90","user":7,"course":4,
             "message":"New video uploaded","is_read":false,"created_at":"2025-02-01T09:00:00Z"},
            {"notification_id":"c9f0f895-fb98-4b3c-8a6e-1f2d3c4b5a69","user":7,"course":null,
             "message":"Maintenance tonight","is_read":true}
        ]"#;
        let notifications: Vec<Notification> = serde_json::from_str(json).unwrap();
        assert_eq!(notifications[0].course, Some(4));
        assert_eq!(notifications[1].course, None);
        assert_eq!(unread_count(&notifications), 1);
    }

    #[test]
    fn test_global_request_omits_course() {
        let request = NotificationRequest {
            message: "Welcome".to_string(),
            course: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"message": "Welcome"})
        );
    }
}
