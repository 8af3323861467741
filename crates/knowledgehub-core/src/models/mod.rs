//! Data models for KnowledgeHub entities.
//!
//! This module contains the request and response types of the LMS REST API:
//!
//! - `UserProfile`, `Credentials` and the other `/auth/` payloads
//! - `Course`, `Video`, `Resource`: catalog content
//! - `Enrollment`, `VideoProgress`, `CourseProgress`: student progress
//! - `Note`: notes pinned to a video position
//! - `StudentDashboard`, `PlatformStats`: dashboard summaries
//! - `Notification`: course and platform announcements

pub mod course;
pub mod dashboard;
pub mod note;
pub mod notification;
pub mod progress;
pub mod user;

pub use course::{Course, CourseInput, Resource, ResourceType, ResourceUpdate, Video, VideoUpdate};
pub use dashboard::{
    ActiveUsersPoint, CourseCompletion, CourseSummary, DashboardEnrollment, PlatformStats,
    StudentDashboard,
};
pub use note::{Note, NoteInput};
pub use notification::{unread_count, Notification, NotificationRequest};
pub use progress::{
    CourseProgress, EnrollResponse, Enrollment, ProgressUpdate, SaveProgressResponse,
    VideoHistoryEntry, VideoProgress,
};
pub use user::{
    ChangePasswordRequest, Credentials, ForgotPasswordRequest, LoginResponse, MessageResponse,
    ProfileUpdate, RefreshRequest, RefreshResponse, RegisterRequest, ResetPasswordRequest, Secret,
    UserProfile, UserRole,
};
