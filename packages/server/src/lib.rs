//! Ravel HTTP server library
//!
//! Wires the core services into an axum REST API. The binary in
//! `main.rs` is a thin wrapper around [`api::start_server`]; the router
//! is exposed separately so tests can drive it in-process.

pub mod api;
