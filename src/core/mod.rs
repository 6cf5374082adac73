//! Core business logic module
//!
//! Resolution, flag propagation and target graph construction. File and
//! network access goes through [`crate::infra`] and [`crate::registry`].
//!
//! # Submodules
//!
//! - [`manifest`] - Manifest (cforge.toml) parsing
//! - [`version`] - Version constraint matching
//! - [`catalog`] - Memoized package lookups
//! - [`resolver`] - Version resolution
//! - [`tree`] - Dependency tree construction
//! - [`flags`] - Flag and definition propagation
//! - [`standard`] - C/C++ standard parsing
//! - [`targets`] - Build target graph
//! - [`emit`] - CMake file generation
//! - [`build`] - Per-project orchestration
//! - [`global_config`] - Global configuration management

pub mod build;
pub mod catalog;
pub mod emit;
pub mod flags;
pub mod global_config;
pub mod manifest;
pub mod resolver;
pub mod standard;
pub mod targets;
pub mod tree;
pub mod version;
