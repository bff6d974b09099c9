//! Shared helpers for the integration suites.
#![allow(dead_code)]

use std::collections::HashMap;
use symref::{CallReference, CallType, FilePath, Project, Settings};

/// A project whose module resolver answers from a fixed specifier → file map.
pub fn project_with_modules(map: HashMap<&'static str, &'static str>) -> Project {
    let map: HashMap<String, String> = map
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Project::with_resolver(
        Settings::default(),
        Box::new(move |_importer, spec| map.get(spec).map(|f| FilePath::from(f.as_str()))),
    )
}

pub fn project() -> Project {
    project_with_modules(HashMap::new())
}

/// First call of the given name and type in a file.
pub fn find_call<'a>(
    project: &'a Project,
    file: &str,
    name: &str,
    call_type: CallType,
) -> &'a CallReference {
    project
        .calls_for_file(&FilePath::from(file))
        .iter()
        .find(|c| c.name.as_str() == name && c.call_type == call_type)
        .unwrap_or_else(|| panic!("no {call_type:?} call '{name}' in {file}"))
}

/// Symbol ids of a call's resolutions.
pub fn resolution_ids(call: &CallReference) -> Vec<&str> {
    call.resolutions
        .iter()
        .map(|r| r.symbol_id.as_str())
        .collect()
}
