//! Integration tests for `cforge install` against a mock HTTP registry

mod common;

use std::collections::BTreeMap;
use std::process::Output;

use cforge::core::manifest::Manifest;
use cforge::registry::client::{Dist, RegistryPackage, RegistryVersion};
use common::TestProject;
use flate2::write::GzEncoder;
use flate2::Compression;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIB_A: &str = "[pkg]\nname = \"lib-a\"\nversion = \"1.0.0\"\n";

fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

async fn registry() -> MockServer {
    let server = MockServer::start().await;
    let mut versions = BTreeMap::new();
    versions.insert(
        "1.0.0".to_string(),
        RegistryVersion {
            manifest: Manifest::from_toml(LIB_A).unwrap(),
            dist: Dist {
                tarball: format!("{}/lib-a/-/lib-a-1.0.0.tgz", server.uri()),
                sha256: None,
            },
        },
    );
    let document = serde_json::to_string(&RegistryPackage {
        name: "lib-a".to_string(),
        versions,
    })
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/lib-a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(document))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lib-a/-/lib-a-1.0.0.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(tarball(&[
            ("package/cforge.toml", LIB_A),
            ("package/src/lib_a.c", "int lib_a(void) { return 0; }\n"),
        ])))
        .mount(&server)
        .await;
    server
}

fn project() -> TestProject {
    let project = TestProject::new();
    project.manifest(
        r#"
[app]
name = "blink"

[targets.default]
platform = "native"

[dependencies.lib-a]
version = "^1.0.0"
"#,
    );
    project
}

async fn run(project: &TestProject, uri: &str, args: &[&str]) -> Output {
    let mut cmd = project.command();
    cmd.env("CFORGE_REGISTRY_URL", uri).args(args);
    tokio::task::spawn_blocking(move || cmd.output().expect("Failed to execute cforge"))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_install_then_generate() {
    let server = registry().await;
    let project = project();

    let output = run(&project, &server.uri(), &["install"]).await;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Installed 1 package(s)"));
    assert!(project.file_exists(".cforge/modules/lib-a__1.0.0/cforge.toml"));
    assert!(project.file_exists(".cforge/modules/lib-a__1.0.0/src/lib_a.c"));

    let output = run(&project, &server.uri(), &["install"]).await;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("All dependencies are installed"));

    let output = run(&project, &server.uri(), &["generate"]).await;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let cmake = project.read_file(".cforge/targets/default/dependencies.cmake");
    assert!(cmake.contains("target_link_libraries(${TARGET_NAME} PRIVATE lib-a__1.0.0)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_generate_before_install_fails() {
    let server = registry().await;
    let project = project();

    let output = run(&project, &server.uri(), &["generate"]).await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Run 'cforge install'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_package() {
    let server = registry().await;
    let project = TestProject::new();
    project.manifest("[app]\nname = \"blink\"\n\n[dependencies.ghost]\nversion = \"1.0.0\"\n");

    let output = run(&project, &server.uri(), &["install"]).await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Package 'ghost' not found in registry"));
}
