//! HTTP API: configuration, routing, authentication, and response mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
