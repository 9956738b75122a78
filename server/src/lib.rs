//! Warden Server
//!
//! Avatar uploads validated in layers before they reach disk, and
//! role-gated endpoints behind verified HS256 access tokens.

pub mod api;
pub mod auth;
pub mod config;
pub mod uploads;
pub mod util;
