//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
    /// Per-test user directories so runs never touch the real cache
    pub home: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            home: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Write the project manifest
    pub fn manifest(&self, content: &str) {
        self.create_file("cforge.toml", content);
    }

    /// Vendor a package as `vendor/<name>__<version>`
    pub fn vendor(&self, name: &str, version: &str, content: &str) {
        self.create_file(&format!("vendor/{name}__{version}/cforge.toml"), content);
        self.create_file(&format!("vendor/{name}__{version}/include/{name}.h"), "#pragma once\n");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// `cforge` invocation in the project directory
    ///
    /// The registry points at an unroutable address unless overridden.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cforge"));
        cmd.current_dir(self.dir.path())
            .env("CFORGE_CACHE_DIR", self.home.path().join("cache"))
            .env("CFORGE_CONFIG_DIR", self.home.path().join("config"))
            .env("CFORGE_REGISTRY_URL", "http://127.0.0.1:9")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run `cforge` with arguments
    pub fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("Failed to execute cforge")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Application with a native and an AVR target depending on `lib-a`
pub const APP_MANIFEST: &str = r#"
[app]
name = "blink"
version = "0.1.0"

[targets.default]
platform = "native"

[targets.default.flags]
global = ["-DCOMMON"]

[targets.uno]
platform = "avr"
framework = "arduino"
board = "uno"

[targets.uno.flags]
global = ["-DCOMMON"]

[dependencies.lib-a]
version = "1.0.0"
compile_flags = ["level->3"]
"#;

/// Package requiring a global flag and a `level` placeholder
pub const LIB_A_MANIFEST: &str = r#"
[pkg]
name = "lib-a"
version = "1.0.0"

[pkg.flags]
global = ["-DCOMMON"]
required = ["$(level)"]

[dependencies.common]
version = "^1.0.0"
"#;

/// Header-only leaf package
pub const COMMON_MANIFEST: &str = r#"
[pkg]
name = "common"
version = "1.2.0"
header_only = true
"#;
