//! C/C++ standard parsing
//!
//! A manifest names its dialects in one comma-separated string, e.g.
//! `"c++14, c99"`. Each entry maps to the number CMake expects in
//! `CXX_STANDARD` / `C_STANDARD`.

use crate::config::defaults::{DEFAULT_CXX_STANDARD, DEFAULT_C_STANDARD};
use crate::error::GraphError;

/// CMake standard numbers of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standards {
    pub cxx: String,
    pub c: String,
}

impl Default for Standards {
    fn default() -> Self {
        Self {
            cxx: DEFAULT_CXX_STANDARD.to_string(),
            c: DEFAULT_C_STANDARD.to_string(),
        }
    }
}

fn cxx_standard(dialect: &str) -> Option<&'static str> {
    match dialect {
        "c++98" | "c++03" => Some("98"),
        "c++0x" | "c++11" => Some("11"),
        "c++14" => Some("14"),
        "c++17" => Some("17"),
        "c++2a" | "c++20" => Some("20"),
        _ => None,
    }
}

fn c_standard(dialect: &str) -> Option<&'static str> {
    match dialect {
        "iso9899:1990" | "c90" | "gnu90" => Some("90"),
        "iso9899:1999" | "c99" | "gnu99" => Some("99"),
        "iso9899:2011" | "c11" | "iso9899:2017" | "c17" | "gnu11" => Some("11"),
        _ => None,
    }
}

/// Parse a standard string; `package` names the owner in errors
pub fn parse_standard(package: &str, standard: Option<&str>) -> Result<Standards, GraphError> {
    let mut standards = Standards::default();
    let Some(standard) = standard else {
        return Ok(standards);
    };

    for dialect in standard.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        let lowered = dialect.to_ascii_lowercase();
        if let Some(cxx) = cxx_standard(&lowered) {
            standards.cxx = cxx.to_string();
        } else if let Some(c) = c_standard(&lowered) {
            standards.c = c.to_string();
        } else {
            return Err(GraphError::InvalidStandard {
                package: package.to_string(),
                standard: dialect.to_string(),
            });
        }
    }
    Ok(standards)
}
