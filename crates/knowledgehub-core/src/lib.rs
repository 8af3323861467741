//! Core library for the KnowledgeHub LMS client.
//!
//! Keeps a user logged in against the LMS REST API: the `Session` holds the
//! access and refresh tokens, `SessionClient` attaches them to requests and
//! renews an expired access token once per failing request, and `LmsClient`
//! exposes the course, progress, note, dashboard and notification endpoints
//! on top of it.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, LmsClient, RequestOptions, SessionClient};
pub use auth::{Session, TokenStore};
pub use config::{Config, TokenStoreKind};
