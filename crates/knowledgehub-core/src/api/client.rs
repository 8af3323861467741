//! API client for the KnowledgeHub LMS REST API.
//!
//! `LmsClient` wraps a `SessionClient` with one typed method per endpoint.
//! Every call goes through the session pipeline, so an expired access
//! token is refreshed transparently.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use tracing::{debug, info};

use super::session_client::{to_body, RequestOptions, SessionClient};
use super::ApiError;
use crate::auth::Session;
use crate::models::{
    ActiveUsersPoint, ChangePasswordRequest, Course, CourseCompletion, CourseInput,
    CourseProgress, Credentials, EnrollResponse, Enrollment, ForgotPasswordRequest,
    MessageResponse, Note, NoteInput, Notification, NotificationRequest, PlatformStats,
    ProfileUpdate, ProgressUpdate, RegisterRequest, ResetPasswordRequest, Resource,
    ResourceUpdate, SaveProgressResponse, Secret, StudentDashboard, UserProfile,
    VideoHistoryEntry, VideoProgress, Video, VideoUpdate,
};

/// Days of history the admin active-users chart covers by default
pub const DEFAULT_ACTIVE_USER_DAYS: u32 = 30;

/// Typed client for the LMS endpoints.
/// Clone is cheap; clones share the session and the connection pool.
#[derive(Clone)]
pub struct LmsClient {
    http: SessionClient,
}

impl LmsClient {
    pub fn new(http: SessionClient) -> Self {
        Self { http }
    }

    /// Client over a real HTTP transport
    pub fn connect(session: Arc<Session>, base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self::new(SessionClient::with_http(session, base_url, timeout)?))
    }

    pub fn http(&self) -> &SessionClient {
        &self.http
    }

    pub fn session(&self) -> &Arc<Session> {
        self.http.session()
    }

    // ===== Account =====

    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        self.http.login(credentials).await
    }

    pub fn logout(&self) {
        self.http.logout();
    }

    pub async fn refresh(&self) -> Result<String, ApiError> {
        self.http.refresh().await
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.http.fetch_profile().await
    }

    /// Create an account and log straight into it
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        info!(username = %request.username, role = %request.user_type, "Registering account");
        let _: serde_json::Value = self
            .http
            .request(
                Method::POST,
                "/auth/register/",
                Some(to_body(request)?),
                &RequestOptions::public(),
            )
            .await?;
        self.http.login(&request.credentials()).await
    }

    /// Update the current user's profile, then reload it from the server
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let role = self.session().user().map(|u| u.role()).unwrap_or_default();
        let path = format!("/auth/{}/profile/", role.profile_segment());
        let _: serde_json::Value = self.http.put(&path, update).await?;
        self.http.fetch_profile().await
    }

    pub async fn change_password(&self, old_password: Secret, new_password: Secret) -> Result<MessageResponse, ApiError> {
        let body = ChangePasswordRequest {
            old_password,
            new_password,
        };
        self.http.post("/auth/change-password/", &body).await
    }

    /// Ask the server to email a one-time reset code
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let body = ForgotPasswordRequest {
            email: email.to_string(),
        };
        self.http
            .request(
                Method::POST,
                "/auth/forgot-password/",
                Some(to_body(&body)?),
                &RequestOptions::public(),
            )
            .await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<MessageResponse, ApiError> {
        self.http
            .request(
                Method::POST,
                "/auth/reset-password/",
                Some(to_body(request)?),
                &RequestOptions::public(),
            )
            .await
    }

    // ===== Courses =====

    pub async fn fetch_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.http.get("/courses/").await
    }

    pub async fn fetch_course(&self, course_id: i64) -> Result<Course, ApiError> {
        self.http.get(&format!("/courses/{}/", course_id)).await
    }

    /// Catalog visible without logging in
    pub async fn fetch_public_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.http
            .request(Method::GET, "/courses/public/", None, &RequestOptions::public())
            .await
    }

    pub async fn fetch_public_course(&self, course_id: i64) -> Result<Course, ApiError> {
        self.http
            .request(
                Method::GET,
                &format!("/courses/public/{}/", course_id),
                None,
                &RequestOptions::public(),
            )
            .await
    }

    pub async fn create_course(&self, input: &CourseInput) -> Result<Course, ApiError> {
        info!(title = %input.title, "Creating course");
        self.http.post("/courses/", input).await
    }

    pub async fn update_course(&self, course_id: i64, input: &CourseInput) -> Result<Course, ApiError> {
        self.http.put(&format!("/courses/{}/", course_id), input).await
    }

    pub async fn delete_course(&self, course_id: i64) -> Result<(), ApiError> {
        info!(course_id, "Deleting course");
        self.delete_ignoring_body(&format!("/courses/{}/", course_id)).await
    }

    pub async fn fetch_videos(&self, course_id: i64) -> Result<Vec<Video>, ApiError> {
        self.http.get(&format!("/courses/{}/videos/", course_id)).await
    }

    pub async fn fetch_video(&self, course_id: i64, video_id: i64) -> Result<Video, ApiError> {
        self.http
            .get(&format!("/courses/{}/videos/{}/", course_id, video_id))
            .await
    }

    pub async fn update_video(&self, course_id: i64, video_id: i64, update: &VideoUpdate) -> Result<Video, ApiError> {
        self.http
            .patch(&format!("/courses/{}/videos/{}/", course_id, video_id), update)
            .await
    }

    pub async fn delete_video(&self, course_id: i64, video_id: i64) -> Result<(), ApiError> {
        self.delete_ignoring_body(&format!("/courses/{}/videos/{}/", course_id, video_id))
            .await
    }

    pub async fn fetch_resources(&self, course_id: i64) -> Result<Vec<Resource>, ApiError> {
        self.http
            .get(&format!("/courses/{}/resources/", course_id))
            .await
    }

    pub async fn fetch_resource(&self, course_id: i64, resource_id: i64) -> Result<Resource, ApiError> {
        self.http
            .get(&format!("/courses/{}/resources/{}/", course_id, resource_id))
            .await
    }

    pub async fn update_resource(
        &self,
        course_id: i64,
        resource_id: i64,
        update: &ResourceUpdate,
    ) -> Result<Resource, ApiError> {
        self.http
            .patch(&format!("/courses/{}/resources/{}/", course_id, resource_id), update)
            .await
    }

    pub async fn delete_resource(&self, course_id: i64, resource_id: i64) -> Result<(), ApiError> {
        self.delete_ignoring_body(&format!("/courses/{}/resources/{}/", course_id, resource_id))
            .await
    }

    // ===== Enrollment & progress =====

    /// Enroll the current student. Enrolling twice is not an error; the
    /// response then reports the existing enrollment.
    pub async fn enroll(&self, course_id: i64) -> Result<EnrollResponse, ApiError> {
        info!(course_id, "Enrolling in course");
        self.http
            .post(&format!("/courses/student/{}/enroll/", course_id), &serde_json::json!({}))
            .await
    }

    pub async fn fetch_enrolled_courses(&self) -> Result<Vec<Enrollment>, ApiError> {
        self.http.get("/courses/student/enrolled/").await
    }

    /// Full course content for an enrolled student, with lock flags
    pub async fn fetch_enrolled_course(&self, course_id: i64) -> Result<Course, ApiError> {
        self.http
            .get(&format!("/courses/student/enrolled/{}/", course_id))
            .await
    }

    pub async fn save_progress(
        &self,
        course_id: i64,
        video_id: i64,
        update: &ProgressUpdate,
    ) -> Result<SaveProgressResponse, ApiError> {
        debug!(
            course_id,
            video_id,
            position = update.last_watched_position,
            percent = update.progress_percentage,
            "Saving video progress"
        );
        self.http
            .post(
                &format!("/courses/student/{}/videos/{}/progress/", course_id, video_id),
                update,
            )
            .await
    }

    pub async fn fetch_course_progress(&self, course_id: i64) -> Result<CourseProgress, ApiError> {
        self.http
            .get(&format!("/courses/student/{}/progress/", course_id))
            .await
    }

    pub async fn fetch_watch_history(&self, course_id: i64) -> Result<Vec<VideoHistoryEntry>, ApiError> {
        self.http
            .get(&format!("/courses/student/{}/history/", course_id))
            .await
    }

    /// Progress of every student on one video (admin)
    pub async fn fetch_video_progress(&self, course_id: i64, video_id: i64) -> Result<Vec<VideoProgress>, ApiError> {
        self.http
            .get(&format!("/courses/admin/{}/videos/{}/progress/", course_id, video_id))
            .await
    }

    // ===== Notes =====

    pub async fn fetch_notes(&self, video_id: i64) -> Result<Vec<Note>, ApiError> {
        self.http
            .get(&format!("/notes/student/video/{}/notes/", video_id))
            .await
    }

    pub async fn create_note(&self, video_id: i64, note: &NoteInput) -> Result<Note, ApiError> {
        self.http
            .post(&format!("/notes/student/video/{}/notes/", video_id), note)
            .await
    }

    pub async fn update_note(&self, note_id: i64, note: &NoteInput) -> Result<Note, ApiError> {
        self.http
            .put(&format!("/notes/student/note/{}/", note_id), note)
            .await
    }

    pub async fn delete_note(&self, note_id: i64) -> Result<(), ApiError> {
        self.delete_ignoring_body(&format!("/notes/student/note/{}/", note_id))
            .await
    }

    // ===== Dashboards =====

    pub async fn fetch_student_dashboard(&self) -> Result<StudentDashboard, ApiError> {
        self.http.get("/student_dashboard/overview/").await
    }

    pub async fn fetch_platform_stats(&self) -> Result<PlatformStats, ApiError> {
        self.http.get("/admin_dashboard/platform-stats/").await
    }

    pub async fn fetch_course_completion(&self) -> Result<Vec<CourseCompletion>, ApiError> {
        self.http.get("/admin_dashboard/course-completion/").await
    }

    /// Daily active-user counts for the last `days` days
    pub async fn fetch_active_users(&self, days: u32) -> Result<Vec<ActiveUsersPoint>, ApiError> {
        self.http
            .get(&format!("/admin_dashboard/active-users/?days={}", days))
            .await
    }

    pub async fn fetch_students(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.http.get("/admin_dashboard/students/").await
    }

    pub async fn delete_student(&self, user_id: i64) -> Result<MessageResponse, ApiError> {
        info!(user_id, "Deleting student");
        self.http
            .delete(&format!("/admin_dashboard/students/{}/delete/", user_id))
            .await
    }

    pub async fn reset_student_password(&self, user_id: i64, new_password: Secret) -> Result<MessageResponse, ApiError> {
        self.http
            .post(
                &format!("/admin_dashboard/students/{}/reset-password/", user_id),
                &serde_json::json!({ "new_password": new_password.expose() }),
            )
            .await
    }

    // ===== Notifications =====

    pub async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.http.get("/notifications/list/").await
    }

    /// Notifications for the courses the student is enrolled in plus global ones
    pub async fn fetch_relevant_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.http.get("/notifications/student/relevant/").await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<MessageResponse, ApiError> {
        self.http
            .post(
                &format!("/notifications/mark_read/{}/", notification_id),
                &serde_json::json!({}),
            )
            .await
    }

    /// Send to the students of `request.course`
    pub async fn send_notification(&self, request: &NotificationRequest) -> Result<MessageResponse, ApiError> {
        if request.course.is_none() {
            return Err(ApiError::InvalidRequest(
                "A course notification needs a course id".to_string(),
            ));
        }
        self.http.post("/notifications/admin/send/", request).await
    }

    /// Send to every user on the platform
    pub async fn send_global_notification(&self, message: &str) -> Result<MessageResponse, ApiError> {
        let request = NotificationRequest {
            message: message.to_string(),
            course: None,
        };
        self.http
            .post("/notifications/admin/global_send/", &request)
            .await
    }

    async fn delete_ignoring_body(&self, path: &str) -> Result<(), ApiError> {
        self.http
            .execute(Method::DELETE, path, None, &RequestOptions::default())
            .await
            .map(|_| ())
    }
}
