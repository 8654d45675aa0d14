//! services/api/src/lib.rs
//!
//! The library crate behind the `api` and `openapi` binaries: configuration,
//! error types, the port adapters, and the web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
