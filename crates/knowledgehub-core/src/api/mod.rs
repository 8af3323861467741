//! REST API client module for the KnowledgeHub LMS backend.
//!
//! This module provides:
//! - `SessionClient`: the authenticated request pipeline with the
//!   refresh-on-401 cycle
//! - `LmsClient`: typed wrappers for each endpoint
//! - `Transport`: the seam between the pipeline and the HTTP stack
//!
//! The API uses JWT bearer tokens obtained from `/auth/login/` and renewed
//! through `/auth/token/refresh/`.

pub mod client;
pub mod error;
pub mod session_client;
pub mod transport;

pub use client::{LmsClient, DEFAULT_ACTIVE_USER_DAYS};
pub use error::ApiError;
pub use session_client::{RequestOptions, RequestPhase, SessionClient, DEFAULT_BASE_URL};
pub use transport::{HttpTransport, OutboundRequest, RawResponse, Transport, REQUEST_TIMEOUT_SECS};
