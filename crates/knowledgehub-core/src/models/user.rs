//! Account, credential and profile types for the `/auth/` endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A string that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Accounts without a known role are treated as students.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Student,
}

impl UserRole {
    /// Path segment of the role's profile endpoint: `/auth/{segment}/profile/`
    pub fn profile_segment(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Student => "student",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile_segment())
    }
}

/// The logged-in user as the client knows it.
///
/// Every field is optional: the login response carries a partial record and
/// the profile endpoints fill in the rest. Fields this client does not model
/// are kept in `extra` so they survive a save/restore cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Role used to pick the profile endpoint. Unknown roles are treated as students.
    pub fn role(&self) -> UserRole {
        self.user_type.unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == Some(UserRole::Admin)
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !first.is_empty() || !last.is_empty() => {
                format!("{} {}", first, last).trim().to_string()
            }
            _ => self
                .username
                .clone()
                .unwrap_or_else(|| "Unknown user".to_string()),
        }
    }

    /// Overlay a freshly fetched profile onto this one.
    ///
    /// The stored `id` (the account id from login) and `user_type` win over
    /// the fetched record, which may carry a profile-table id and no role.
    /// Fields the fetched record lacks are kept. `signed_url` gets a
    /// `timestamp` query parameter so image caches see a new URL.
    pub fn merge_fetched(&mut self, fetched: UserProfile, now_millis: i64) {
        let UserProfile {
            id,
            username,
            email,
            first_name,
            last_name,
            user_type,
            signed_url,
            country,
            about,
            extra,
        } = fetched;

        self.id = self.id.or(id);
        self.user_type = self.user_type.or(user_type);
        overlay(&mut self.username, username);
        overlay(&mut self.email, email);
        overlay(&mut self.first_name, first_name);
        overlay(&mut self.last_name, last_name);
        overlay(&mut self.country, country);
        overlay(&mut self.about, about);
        self.signed_url = signed_url.map(|url| cache_busted(&url, now_millis));
        self.extra.extend(extra);
    }
}

fn overlay(field: &mut Option<String>, fetched: Option<String>) {
    if fetched.is_some() {
        *field = fetched;
    }
}

fn cache_busted(url: &str, now_millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}timestamp={}", url, separator, now_millis)
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: Secret,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<Secret>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: Secret,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserRole,
}

impl RegisterRequest {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// `POST /auth/login/` response. Tokens are optional here so a malformed
/// success response can be reported instead of failing to parse.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: Option<String>,
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// `POST /auth/token/refresh/` response. `refresh` is only present when the
/// server rotates refresh tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Editable profile fields. Unset fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub old_password: Secret,
    pub new_password: Secret,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: Secret,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let credentials = Credentials::new("alice", "pw");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("\"pw\""));

        let json = serde_json::to_value(&credentials).unwrap();
        assert_eq!(json, serde_json::json!({"username": "alice", "password": "pw"}));
    }

    #[test]
    fn test_parse_login_user_partial() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"access":"A1","refresh":"R1","user":{"id":7}}"#).unwrap();
        let user = resp.user.unwrap();
        assert_eq!(user.id, Some(7));
        assert_eq!(user.user_type, None);
        assert_eq!(user.role(), UserRole::Student);
    }

    #[test]
    fn test_profile_keeps_unknown_fields() {
        let json = r#"{"id":3,"username":"bob","user_type":"admin","date":"2025-01-01"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert!(profile.is_admin());
        assert_eq!(profile.extra.get("date"), Some(&serde_json::json!("2025-01-01")));

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["date"], "2025-01-01");
    }

    #[test]
    fn test_merge_fetched_keeps_id_and_role() {
        let mut stored = UserProfile {
            id: Some(7),
            username: Some("alice".to_string()),
            first_name: Some("Alice".to_string()),
            user_type: Some(UserRole::Admin),
            ..Default::default()
        };
        let fetched = UserProfile {
            id: Some(99),
            email: Some("alice@example.com".to_string()),
            signed_url: Some("https://cdn.example.com/a.jpg?sig=abc".to_string()),
            ..Default::default()
        };

        stored.merge_fetched(fetched, 1_700_000_000_000);

        assert_eq!(stored.id, Some(7));
        assert_eq!(stored.user_type, Some(UserRole::Admin));
        assert_eq!(stored.first_name.as_deref(), Some("Alice"));
        assert_eq!(stored.email.as_deref(), Some("alice@example.com"));
        assert_eq!(
            stored.signed_url.as_deref(),
            Some("https://cdn.example.com/a.jpg?sig=abc&timestamp=1700000000000")
        );
    }

    #[test]
    fn test_merge_fetched_backfills_role() {
        let mut stored = UserProfile {
            id: Some(7),
            ..Default::default()
        };
        let fetched = UserProfile {
            user_type: Some(UserRole::Student),
            signed_url: Some("https://cdn.example.com/a.jpg".to_string()),
            ..Default::default()
        };
        stored.merge_fetched(fetched, 5);
        assert_eq!(stored.user_type, Some(UserRole::Student));
        assert_eq!(stored.signed_url.as_deref(), Some("https://cdn.example.com/a.jpg?timestamp=5"));
    }

    #[test]
    fn test_display_name() {
        let profile = UserProfile {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "alice");

        let named = UserProfile {
            first_name: Some("Alice".to_string()),
            last_name: Some("Smith".to_string()),
            ..Default::default()
        };
        assert_eq!(named.display_name(), "Alice Smith");
    }
}
