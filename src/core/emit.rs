//! CMake dependency file generation
//!
//! Converts a finished [`TargetGraph`] into an ordered list of
//! declarations (one per target, then one per link edge) and renders them
//! with the native or AVR templates. Emission performs no resolution; its
//! only failure is an edge that points outside the graph.

use std::path::{Path, PathBuf};

use crate::config::defaults::{DEPENDENCIES_FILE, MAIN_TARGET, STATE_DIR, TARGETS_DIR};
use crate::core::manifest::{DefinitionSet, LinkVisibility};
use crate::core::targets::{LinkSource, TargetGraph};
use crate::error::{EmitError, FilesystemError};
use crate::infra::filesystem;

/// Build platform of a project target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    #[default]
    Native,
    Avr,
}

impl Platform {
    /// `avr` (any case) selects AVR; anything else is native
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(platform) if platform.trim().eq_ignore_ascii_case("avr") => Self::Avr,
            _ => Self::Native,
        }
    }
}

/// One statement group of the generated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// Interface library exposing only headers
    HeaderOnly {
        name: String,
        path: PathBuf,
        flags: Vec<String>,
        definitions: DefinitionSet,
    },
    /// Compiled static library
    Library {
        name: String,
        path: PathBuf,
        flags: Vec<String>,
        definitions: DefinitionSet,
        cxx_standard: String,
        c_standard: String,
    },
    /// `from` links against `to`
    Link {
        from: String,
        to: String,
        visibility: LinkVisibility,
        linker_flags: Vec<String>,
    },
}

/// Declarations for every target and edge, in graph order
pub fn declarations(graph: &TargetGraph) -> Result<Vec<Declaration>, EmitError> {
    let mut decls: Vec<Declaration> = graph
        .targets()
        .iter()
        .map(|target| {
            if target.header_only {
                Declaration::HeaderOnly {
                    name: target.qualified_name(),
                    path: target.source_path.clone(),
                    flags: target.flags.clone(),
                    definitions: target.definitions.clone(),
                }
            } else {
                Declaration::Library {
                    name: target.qualified_name(),
                    path: target.source_path.clone(),
                    flags: target.flags.clone(),
                    definitions: target.definitions.clone(),
                    cxx_standard: target.cxx_standard.clone(),
                    c_standard: target.c_standard.clone(),
                }
            }
        })
        .collect();

    for (i, edge) in graph.edges().iter().enumerate() {
        let dangling = |id: usize| EmitError::DanglingEdge { edge: i, target: id };
        let to = graph.get(edge.to).ok_or_else(|| dangling(edge.to.index()))?;
        let from = match edge.from {
            LinkSource::Root => MAIN_TARGET.to_string(),
            LinkSource::Target(id) => graph
                .get(id)
                .ok_or_else(|| dangling(id.index()))?
                .qualified_name(),
        };
        decls.push(Declaration::Link {
            from,
            to: to.qualified_name(),
            visibility: edge.visibility,
            linker_flags: edge.linker_flags.clone(),
        });
    }
    Ok(decls)
}

const AVR_HEADER: &str = r#"
add_library({{NAME}} INTERFACE)

target_compile_definitions(
    {{NAME}}
    INTERFACE
    CFORGE_FRAMEWORK_${FRAMEWORK}
    {{DEFINITIONS}})

target_compile_options(
    {{NAME}}
    INTERFACE
    {{FLAGS}})

target_include_directories(
    {{NAME}}
    INTERFACE
    "{{PATH}}/include")
"#;

const AVR_LIBRARY: &str = r#"
file(GLOB_RECURSE
    {{NAME}}_files
    "{{PATH}}/src/*.cpp"
    "{{PATH}}/src/*.cc"
    "{{PATH}}/src/*.c")

generate_arduino_library(
    {{NAME}}
    SRCS ${{{NAME}}_files}
    BOARD ${BOARD})

target_compile_definitions(
    {{NAME}}
    PRIVATE
    CFORGE_FRAMEWORK_${FRAMEWORK}
    {{PRIVATE_DEFINITIONS}})

target_compile_definitions(
    {{NAME}}
    PUBLIC
    {{PUBLIC_DEFINITIONS}})

target_compile_options(
    {{NAME}}
    PRIVATE
    {{FLAGS}})

set_target_properties(
    {{NAME}}
    PROPERTIES
    CXX_STANDARD {{CXX_STANDARD}}
    C_STANDARD {{C_STANDARD}})

target_include_directories(
    {{NAME}}
    PUBLIC
    "{{PATH}}/include")

target_include_directories(
    {{NAME}}
    PRIVATE
    "{{PATH}}/src")
"#;

const NATIVE_HEADER: &str = r#"
add_library({{NAME}} INTERFACE)

target_compile_definitions(
    {{NAME}}
    INTERFACE
    CFORGE_PLATFORM_${PLATFORM}
    CFORGE_FRAMEWORK_${FRAMEWORK}
    CFORGE_BOARD_${BOARD}
    {{DEFINITIONS}})

target_compile_options(
    {{NAME}}
    INTERFACE
    {{FLAGS}})

target_include_directories(
    {{NAME}}
    INTERFACE
    "{{PATH}}/include")
"#;

const NATIVE_LIBRARY: &str = r#"
file(GLOB_RECURSE
    {{NAME}}_files
    "{{PATH}}/src/*.cpp"
    "{{PATH}}/src/*.cc"
    "{{PATH}}/src/*.c")

add_library(
    {{NAME}}
    STATIC
    ${{{NAME}}_files})

target_compile_definitions(
    {{NAME}}
    PRIVATE
    CFORGE_PLATFORM_${PLATFORM}
    CFORGE_FRAMEWORK_${FRAMEWORK}
    CFORGE_BOARD_${BOARD}
    {{PRIVATE_DEFINITIONS}})

target_compile_definitions(
    {{NAME}}
    PUBLIC
    {{PUBLIC_DEFINITIONS}})

target_compile_options(
    {{NAME}}
    PRIVATE
    {{FLAGS}})

set_target_properties(
    {{NAME}}
    PROPERTIES
    CXX_STANDARD {{CXX_STANDARD}}
    C_STANDARD {{C_STANDARD}})

target_include_directories(
    {{NAME}}
    PUBLIC
    "{{PATH}}/include")

target_include_directories(
    {{NAME}}
    PRIVATE
    "{{PATH}}/src")
"#;

const LINK: &str = "target_link_libraries({{FROM}} {{VISIBILITY}} {{TO}}{{LINKER_FLAGS}})";

/// Replace every `{{KEY}}` in `template`
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{{{key}}}}}"), value)
    })
}

/// Render declarations as CMake text
pub fn render(decls: &[Declaration], platform: Platform) -> String {
    let (header_template, library_template) = match platform {
        Platform::Native => (NATIVE_HEADER, NATIVE_LIBRARY),
        Platform::Avr => (AVR_HEADER, AVR_LIBRARY),
    };

    let mut blocks = Vec::with_capacity(decls.len());
    let mut links = Vec::new();
    for decl in decls {
        match decl {
            Declaration::HeaderOnly {
                name,
                path,
                flags,
                definitions,
            } => {
                let path = cmake_path(path);
                blocks.push(fill_template(
                    header_template,
                    &[
                        ("NAME", name),
                        ("PATH", &path),
                        ("FLAGS", &flags.join(" ")),
                        ("DEFINITIONS", &definitions.merged().join(" ")),
                    ],
                ));
            }
            Declaration::Library {
                name,
                path,
                flags,
                definitions,
                cxx_standard,
                c_standard,
            } => {
                let path = cmake_path(path);
                blocks.push(fill_template(
                    library_template,
                    &[
                        ("NAME", name),
                        ("PATH", &path),
                        ("FLAGS", &flags.join(" ")),
                        ("PRIVATE_DEFINITIONS", &definitions.private.join(" ")),
                        ("PUBLIC_DEFINITIONS", &definitions.public.join(" ")),
                        ("CXX_STANDARD", cxx_standard),
                        ("C_STANDARD", c_standard),
                    ],
                ));
            }
            Declaration::Link {
                from,
                to,
                visibility,
                linker_flags,
            } => {
                let extra = if linker_flags.is_empty() {
                    String::new()
                } else {
                    format!(" {}", linker_flags.join(" "))
                };
                links.push(fill_template(
                    LINK,
                    &[
                        ("FROM", from),
                        ("VISIBILITY", visibility.as_str()),
                        ("TO", to),
                        ("LINKER_FLAGS", &extra),
                    ],
                ));
            }
        }
    }

    let mut output = String::from("# Generated by cforge. Do not edit.\n");
    for block in blocks {
        output.push_str(&block);
    }
    if !links.is_empty() {
        output.push('\n');
        output.push_str(&links.join("\n"));
        output.push('\n');
    }
    output
}

fn cmake_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Path of the generated file for a project target
pub fn dependencies_path(project_dir: &Path, target: &str) -> PathBuf {
    project_dir
        .join(STATE_DIR)
        .join(TARGETS_DIR)
        .join(target)
        .join(DEPENDENCIES_FILE)
}

/// Write rendered content for a project target
pub fn write_dependencies_file(
    project_dir: &Path,
    target: &str,
    content: &str,
) -> Result<PathBuf, FilesystemError> {
    let path = dependencies_path(project_dir, target);
    filesystem::write_file(&path, content)?;
    tracing::info!("Wrote {}", path.display());
    Ok(path)
}
