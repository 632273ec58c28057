//! HTTP handlers for the server.

pub mod batch;
pub mod fill;
pub mod rows;
