//! Infrastructure layer
//!
//! Handles filesystem access: the per-project package store, user
//! directories and generated output.

pub mod dirs;
pub mod filesystem;
pub mod store;
