//! Taskboard server library.
//!
//! Exposes the store, the change-request workflow, and the HTTP server for
//! use in tests and embedding. Members propose task changes, workspace
//! admins and owners approve or reject them, and every step is reflected in
//! per-user notification feeds.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod workflow;
