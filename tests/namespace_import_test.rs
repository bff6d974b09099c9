//! Cross-file resolution: namespace imports, named re-export chains, default
//! imports, and Rust use paths.

mod common;

use common::{find_call, project_with_modules, resolution_ids};
use std::collections::HashMap;
use symref::{CallType, ResolutionReason};

#[test]
fn namespace_import_reaches_exported_function() {
    let mut project = project_with_modules(HashMap::from([("./utils", "utils.js")]));
    project
        .index_source("utils.js", "export function helper() {}\n")
        .unwrap();
    project
        .index_source("app.js", "import * as utils from './utils';\nutils.helper();\n")
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.js", "helper", CallType::Method);
    assert_eq!(call.resolutions.len(), 1);
    assert_eq!(call.resolutions[0].reason, ResolutionReason::NamespaceImport);
    assert!(call.resolutions[0].symbol_id.as_str().starts_with("function:helper:utils.js:"));
}

#[test]
fn namespace_import_ignores_non_exported_functions() {
    let mut project = project_with_modules(HashMap::from([("./utils", "utils.js")]));
    project
        .index_source("utils.js", "function hidden() {}\n")
        .unwrap();
    project
        .index_source("app.js", "import * as utils from './utils';\nutils.hidden();\n")
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.js", "hidden", CallType::Method);
    assert!(!call.is_resolved(), "non-exported targets stay unresolved");
}

#[test]
fn named_import_follows_reexport_chain() {
    let mut project = project_with_modules(HashMap::from([
        ("./leaf", "leaf.js"),
        ("./mid", "mid.js"),
    ]));
    project
        .index_source("leaf.js", "export function deep() {}\n")
        .unwrap();
    project
        .index_source("mid.js", "export { deep as shallow } from './leaf';\n")
        .unwrap();
    project
        .index_source("app.js", "import { shallow } from './mid';\nshallow();\n")
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.js", "shallow", CallType::Function);
    let ids = resolution_ids(call);
    assert_eq!(ids.len(), 1);
    assert!(ids[0].starts_with("function:deep:leaf.js:"));
}

#[test]
fn default_import_resolves_by_flag() {
    let mut project = project_with_modules(HashMap::from([("./main", "main.js")]));
    project
        .index_source("main.js", "export default function entry() {}\n")
        .unwrap();
    project
        .index_source("app.js", "import start from './main';\nstart();\n")
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.js", "start", CallType::Function);
    assert!(call.resolutions[0].symbol_id.as_str().starts_with("function:entry:main.js:"));
}

#[test]
fn unresolvable_import_is_skipped_not_fatal() {
    let mut project = project_with_modules(HashMap::new());
    project
        .index_source("app.js", "import { gone } from './missing';\ngone();\n")
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.js", "gone", CallType::Function);
    assert!(!call.is_resolved());
}

#[test]
fn rust_use_resolves_across_files() {
    let mut project = project_with_modules(HashMap::from([("crate::store", "store.rs")]));
    project
        .index_source(
            "store.rs",
            "pub struct Store;\n\nimpl Store {\n    pub fn new() -> Self {\n        Store\n    }\n\n    pub fn flush(&self) {}\n}\n",
        )
        .unwrap();
    project
        .index_source(
            "main.rs",
            "use crate::store::Store;\n\nfn main() {\n    let s = Store::new();\n    s.flush();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let ctor = find_call(&project, "main.rs", "Store", CallType::Constructor);
    assert!(ctor.resolutions[0].symbol_id.as_str().starts_with("constructor:new:store.rs:"));

    let flush = find_call(&project, "main.rs", "flush", CallType::Method);
    assert!(flush.resolutions[0].symbol_id.as_str().starts_with("method:flush:store.rs:"));
}

#[test]
fn python_from_import_resolves() {
    let mut project = project_with_modules(HashMap::from([("helpers", "helpers.py")]));
    project
        .index_source("helpers.py", "def make_thing():\n    pass\n")
        .unwrap();
    project
        .index_source("app.py", "from helpers import make_thing\n\nmake_thing()\n")
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.py", "make_thing", CallType::Function);
    assert!(call.resolutions[0].symbol_id.as_str().starts_with("function:make_thing:helpers.py:"));
}
