//! Shared domain and wire types for Taskboard.
//!
//! Everything here is plain data plus the pure rules that operate on it
//! (status projection, role ordering, unread-count aggregation). Storage and
//! HTTP live in `taskboard-server`.

pub mod api;
pub mod change_request;
pub mod ids;
pub mod notification;
pub mod patch;
pub mod role;
pub mod task;
