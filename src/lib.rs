//! cforge - dependency resolver and CMake target generator for C/C++
//!
//! This library resolves the dependency tree of a native or AVR project,
//! propagates compile flags and definitions along it and writes one
//! `dependencies.cmake` per project target.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Resolution and target graph logic
//! - [`registry`] - Package registry clients
//! - [`infra`] - Infrastructure layer (package store, directories, files)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod registry;

#[cfg(test)]
pub mod test_utils;
