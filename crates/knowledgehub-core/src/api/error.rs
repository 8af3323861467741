use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The session could not be kept alive and has been cleared.
    /// Callers should send the user back to the login flow.
    #[error("Not authenticated - please log in again")]
    Unauthenticated,

    /// 401 with the server's reason, e.g. an expired token or bad credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Keys the backend uses for a single human-readable error message
const MESSAGE_KEYS: [&str; 4] = ["detail", "message", "error", "non_field_errors"];

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull the server-provided message out of an error body.
    ///
    /// The backend answers with `{"detail": ...}`, `{"message": ...}`,
    /// `{"error": ...}` or a map of field errors such as
    /// `{"non_field_errors": ["Invalid credentials."]}`. Falls back to the
    /// (truncated) raw body when none of these shapes match.
    pub fn server_message(body: &str) -> String {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
            return Self::truncate_body(body.trim());
        };

        if let Some(object) = value.as_object() {
            for key in MESSAGE_KEYS {
                if let Some(text) = object.get(key).and_then(first_text) {
                    return text;
                }
            }
            // Field errors: {"username": ["This field is required."]}
            if let Some((field, text)) = object
                .iter()
                .find_map(|(field, v)| first_text(v).map(|text| (field, text)))
            {
                return format!("{}: {}", field, text);
            }
        }

        first_text(&value).unwrap_or_else(|| Self::truncate_body(body.trim()))
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::server_message(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(message),
            401 if message.is_empty() => ApiError::Unauthorized("token may be expired".to_string()),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// True for errors after which the session no longer holds usable credentials
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated)
    }
}

fn first_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}
