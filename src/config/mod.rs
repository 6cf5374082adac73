//! Configuration constants
//!
//! - [`defaults`] - Default values and directory layout
//! - [`urls`] - Registry URLs

pub mod defaults;
pub mod urls;
