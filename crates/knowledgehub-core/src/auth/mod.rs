//! Authentication state for the LMS client.
//!
//! This module provides:
//! - `Session`: access token, refresh token and user profile, shared as
//!   `Arc<Session>` and written through to a store on every change
//! - `TokenStore`: where the session is persisted, with file, OS keyring
//!   and in-memory implementations
//!
//! All three values live under the keys `accessToken`, `refreshToken` and
//! `user` and are always cleared together.

pub mod session;
pub mod store;

pub use session::{Session, SessionData};
pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, StorageKey, TokenStore};
