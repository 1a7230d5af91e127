//! Shared building blocks for HMPPS services written with axum.
//!
//! - [`auth`]: bearer token resource server and its customization
//! - [`oauth2`]: client credentials tokens for calling other services
//! - [`client_tracking`]: caller details on telemetry spans
//! - [`health`]: health and info endpoints
//! - [`sar`]: subject access request endpoint

pub mod auth;
pub mod cache;
pub mod client_tracking;
pub mod config;
pub mod errors;
pub mod health;
pub mod oauth2;
pub mod openapi;
pub mod sar;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
