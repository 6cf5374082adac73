//! Flag and definition propagation
//!
//! A package publishes a contract for the flags and definitions it is
//! compiled with. The contract has three tiers:
//!
//! - `global` entries must be matched by values the project root hands
//!   to the whole tree
//! - `required` entries are filled from what the immediate consumer
//!   passes on the dependency edge; an unfilled `$(key)` is an error
//! - `optional` entries are filled the same way but may stay empty
//!
//! A given value `key->value` fills `$(key)` with `value`; a given value
//! `key=value` fills it with the literal `key=value`. Entries that are
//! not placeholders are used verbatim.

use regex::Regex;
use std::sync::OnceLock;

use crate::core::manifest::{DefinitionSet, DependencySpec, Manifest};
use crate::error::{ContractKind, FlagError};

/// Values the project target hands to every package in the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalGiven {
    pub flags: Vec<String>,
    pub definitions: Vec<String>,
}

/// Values a consumer hands to one dependency edge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentGivenInfo {
    pub flags: Vec<String>,
    pub definitions: Vec<String>,
    pub link_visibility: Option<String>,
    pub linker_flags: Vec<String>,
}

/// Final flags and definitions of one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFlags {
    pub flags: Vec<String>,
    pub definitions: DefinitionSet,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$\(([a-zA-Z_-][a-zA-Z0-9_]*)\)$").expect("valid placeholder regex"))
}

fn linker_flag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-l\s*[A-Za-z0-9_.+-]+$").expect("valid linker flag regex"))
}

/// Key of a `$(key)` placeholder, or `None` for a plain entry
pub fn placeholder_key(entry: &str) -> Option<&str> {
    placeholder_regex()
        .captures(entry.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_placeholder(entry: &str) -> bool {
    placeholder_key(entry).is_some()
}

/// Value `given` supplies for `key`, if it names that key
pub fn try_match(key: &str, given: &str) -> Option<String> {
    let given = given.trim();
    let rest = given.strip_prefix(key)?;
    if let Some(value) = rest.strip_prefix("->") {
        Some(value.trim().to_string())
    } else if rest.starts_with('=') {
        Some(given.to_string())
    } else {
        None
    }
}

/// First given value that fills `key`, with its position
fn fill(key: &str, given: &[String]) -> Option<(usize, String)> {
    given
        .iter()
        .enumerate()
        .find_map(|(i, g)| try_match(key, g).map(|value| (i, value)))
}

fn append_unique(target: &mut Vec<String>, values: impl IntoIterator<Item = String>) {
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

/// Identifies the package whose contract is being filled
struct Contract<'a> {
    package: &'a str,
    version: &'a str,
    kind: ContractKind,
}

impl Contract<'_> {
    fn unfilled_global(&self, key: &str) -> FlagError {
        FlagError::UnfilledGlobal {
            package: self.package.to_string(),
            version: self.version.to_string(),
            kind: self.kind,
            key: key.to_string(),
        }
    }

    fn unfilled_required(&self, key: &str) -> FlagError {
        FlagError::UnfilledRequired {
            package: self.package.to_string(),
            version: self.version.to_string(),
            kind: self.kind,
            key: key.to_string(),
        }
    }

    /// Global entries matched against root-given values
    fn fill_global(&self, entries: &[String], given: &[String]) -> Result<Vec<String>, FlagError> {
        entries
            .iter()
            .map(|entry| {
                let key = placeholder_key(entry).unwrap_or(entry.as_str());
                if given.iter().any(|g| g == entry) {
                    return Ok(entry.clone());
                }
                fill(key, given)
                    .map(|(_, value)| value)
                    .ok_or_else(|| self.unfilled_global(key))
            })
            .collect()
    }

    /// Required or optional entries filled from parent-given values
    ///
    /// Marks every given value that filled a placeholder in `consumed`.
    fn fill_tier(
        &self,
        entries: &[String],
        given: &[String],
        consumed: &mut [bool],
        required: bool,
    ) -> Result<Vec<String>, FlagError> {
        let mut filled = Vec::new();
        for entry in entries {
            let Some(key) = placeholder_key(entry) else {
                filled.push(entry.clone());
                continue;
            };
            match fill(key, given) {
                Some((i, value)) => {
                    consumed[i] = true;
                    filled.push(value);
                }
                None if required => return Err(self.unfilled_required(key)),
                None => tracing::debug!("Optional {} '$({})' of {} left empty", self.kind, key, self.package),
            }
        }
        Ok(filled)
    }
}

/// Compute the final flags and definitions of a package
pub fn propagate(
    manifest: &Manifest,
    globals: &GlobalGiven,
    parent: &ParentGivenInfo,
) -> Result<ResolvedFlags, FlagError> {
    let package = manifest.name();
    let version = manifest.version();

    let flag_contract = Contract {
        package,
        version,
        kind: ContractKind::Flag,
    };
    let policy = manifest.flag_policy();
    let mut consumed = vec![false; parent.flags.len()];
    let mut flags = Vec::new();
    append_unique(&mut flags, flag_contract.fill_global(&policy.global, &globals.flags)?);
    append_unique(
        &mut flags,
        flag_contract.fill_tier(&policy.required, &parent.flags, &mut consumed, true)?,
    );
    append_unique(
        &mut flags,
        flag_contract.fill_tier(&policy.optional, &parent.flags, &mut consumed, false)?,
    );
    if policy.passthrough {
        let unconsumed = parent
            .flags
            .iter()
            .zip(&consumed)
            .filter(|(_, used)| !**used)
            .map(|(flag, _)| flag.clone());
        append_unique(&mut flags, unconsumed);
    }

    let def_contract = Contract {
        package,
        version,
        kind: ContractKind::Definition,
    };
    let policy = manifest.definition_policy();
    let mut definitions = DefinitionSet {
        private: def_contract.fill_global(&policy.global.private, &globals.definitions)?,
        public: def_contract.fill_global(&policy.global.public, &globals.definitions)?,
    };
    if policy.singleton {
        tracing::debug!("{}@{} is a singleton; consumer definitions ignored", package, version);
    } else {
        let mut consumed = vec![false; parent.definitions.len()];
        for (tier, required) in [(&policy.required, true), (&policy.optional, false)] {
            let private = def_contract.fill_tier(&tier.private, &parent.definitions, &mut consumed, required)?;
            let public = def_contract.fill_tier(&tier.public, &parent.definitions, &mut consumed, required)?;
            append_unique(&mut definitions.private, private);
            append_unique(&mut definitions.public, public);
        }
    }
    dedup(&mut definitions.private);
    dedup(&mut definitions.public);

    Ok(ResolvedFlags { flags, definitions })
}

fn dedup(values: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(values.len());
    values.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}

/// What a package hands to one of its declared dependencies
///
/// `$(key)` entries in the dependency spec are filled from the package's
/// own final flags and definitions. `package`/`version` name the
/// declaring package in errors.
pub fn child_given(
    spec: &DependencySpec,
    resolved: &ResolvedFlags,
    package: &str,
    version: &str,
) -> Result<ParentGivenInfo, FlagError> {
    let fill_from = |entries: &[String], pool: &[String], kind: ContractKind| {
        entries
            .iter()
            .map(|entry| match placeholder_key(entry) {
                Some(key) => fill(key, pool).map(|(_, value)| value).ok_or_else(|| {
                    FlagError::UnfilledRequired {
                        package: package.to_string(),
                        version: version.to_string(),
                        kind,
                        key: key.to_string(),
                    }
                }),
                None => Ok(entry.clone()),
            })
            .collect::<Result<Vec<_>, _>>()
    };

    Ok(ParentGivenInfo {
        flags: fill_from(&spec.compile_flags, &resolved.flags, ContractKind::Flag)?,
        definitions: fill_from(
            &spec.definitions,
            &resolved.definitions.merged(),
            ContractKind::Definition,
        )?,
        link_visibility: spec.link_visibility.clone(),
        linker_flags: spec.linker_flags.clone(),
    })
}

/// Split `-l<lib>` entries off a flag list; returns (compile, linker)
pub fn split_linker_flags(flags: &[String]) -> (Vec<String>, Vec<String>) {
    flags
        .iter()
        .cloned()
        .partition(|flag| !linker_flag_regex().is_match(flag.trim()))
}
