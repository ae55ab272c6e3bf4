//! Authentication primitives.
//!
//! - [`jwt`] -- verification of HS256 access tokens issued by the identity
//!   provider. This service never issues tokens itself.

pub mod jwt;
