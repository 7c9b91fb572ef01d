//! Tidepool storefront library.
//!
//! The storefront is exposed as a library so the reconciliation service and
//! its collaborator seams can be exercised in tests without a running server.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
