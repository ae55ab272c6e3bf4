//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- requires a valid JWT Bearer token.
//! - [`auth::MaybeAuthUser`] -- accepts anonymous callers.

pub mod auth;
