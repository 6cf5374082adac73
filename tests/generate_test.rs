//! Integration tests for `cforge generate`
//!
//! Projects are laid out with vendored packages so no registry is needed.

mod common;

use assert_fs::prelude::*;
use common::{TestProject, APP_MANIFEST, COMMON_MANIFEST, LIB_A_MANIFEST};
use predicates::prelude::*;

fn setup_project() -> TestProject {
    let project = TestProject::new();
    project.manifest(APP_MANIFEST);
    project.vendor("lib-a", "1.0.0", LIB_A_MANIFEST);
    project.vendor("common", "1.2.0", COMMON_MANIFEST);
    project
}

#[test]
fn test_generate_all_targets() {
    let project = setup_project();

    let output = project.run(&["generate"]);
    assert!(
        output.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("default: 2 target(s), 2 link(s)"));
    assert!(stdout.contains("uno: 2 target(s), 2 link(s)"));

    let native = project.read_file(".cforge/targets/default/dependencies.cmake");
    assert!(native.starts_with("# Generated by cforge. Do not edit.\n"));
    assert!(native.contains("add_library(common__1.2.0 INTERFACE)"));
    assert!(native.contains("target_link_libraries(${TARGET_NAME} PRIVATE lib-a__1.0.0)"));
    assert!(native.contains("target_link_libraries(lib-a__1.0.0 INTERFACE common__1.2.0)"));
    assert!(native.contains("    -DCOMMON 3)"));

    let avr = project.read_file(".cforge/targets/uno/dependencies.cmake");
    assert!(avr.contains("generate_arduino_library("));
    assert!(!avr.contains("CFORGE_PLATFORM_"));
}

#[test]
fn test_generate_single_target() {
    let project = setup_project();

    let output = project.run(&["generate", "--target", "uno"]);
    assert!(output.status.success());

    assert!(project.file_exists(".cforge/targets/uno/dependencies.cmake"));
    assert!(!project.file_exists(".cforge/targets/default/dependencies.cmake"));
}

#[test]
fn test_generate_unknown_target_fails() {
    let project = setup_project();

    let output = project.run(&["generate", "--target", "mega"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("'mega' is not defined"));
}

#[test]
fn test_generate_unfilled_placeholder_fails() {
    let project = TestProject::new();
    project.manifest(&APP_MANIFEST.replace("compile_flags = [\"level->3\"]", ""));
    project.vendor("lib-a", "1.0.0", LIB_A_MANIFEST);
    project.vendor("common", "1.2.0", COMMON_MANIFEST);

    let output = project.run(&["generate", "--target", "default"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("'$(level)' unfilled in lib-a@1.0.0"), "stderr: {stderr}");
    assert!(!project.file_exists(".cforge/targets/default/dependencies.cmake"));
}

#[test]
fn test_generate_package_project() {
    let temp = assert_fs::TempDir::new().unwrap();
    let home = assert_fs::TempDir::new().unwrap();
    temp.child("cforge.toml")
        .write_str(
            r#"
[pkg]
name = "uart"
version = "0.3.0"
standard = "c++17, c11"

[pkg.flags]
required = ["$(baud)"]

[targets.tests]
src = "tests"
platform = "native"

[targets.tests.flags]
package = ["baud->-DBAUD=9600", "-lm"]
"#,
        )
        .unwrap();

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_cforge"))
        .args(["-q", "generate", "-C"])
        .arg(temp.path())
        .env("CFORGE_CACHE_DIR", home.path().join("cache"))
        .env("CFORGE_CONFIG_DIR", home.path().join("config"))
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());

    let cmake = temp.child(".cforge/targets/tests/dependencies.cmake");
    cmake.assert(predicate::path::exists());
    cmake.assert(predicate::str::contains("CXX_STANDARD 17"));
    cmake.assert(predicate::str::contains("C_STANDARD 11"));
    cmake.assert(predicate::str::contains("    -DBAUD=9600)"));
    cmake.assert(predicate::str::contains(
        "target_link_libraries(${TARGET_NAME} PRIVATE uart__0.3.0 -lm)",
    ));
}

#[test]
fn test_visibility_warning_reported_once() {
    let project = TestProject::new();
    project.manifest(
        r#"
[app]
name = "blink"

[targets.default]
platform = "native"

[dependencies.common]
version = "1.2.0"
link_visibility = "public"
"#,
    );
    project.vendor("common", "1.2.0", COMMON_MANIFEST);

    let output = project.run(&["generate"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("requested 'public'").count(), 1, "stderr: {stderr}");
    assert!(project
        .read_file(".cforge/targets/default/dependencies.cmake")
        .contains("target_link_libraries(${TARGET_NAME} INTERFACE common__1.2.0)"));
}
