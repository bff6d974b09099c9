//! Incremental invariants: atomic replacement, clean removal, idempotent
//! re-resolution, and the strict phase ordering contract.

mod common;

use common::{project, project_with_modules};
use std::collections::HashMap;
use symref::{
    DefinitionRegistry, ExportRegistry, FilePath, ImportGraph, Language, Project,
    ReferenceRegistry, RegistryContext, ResolutionRegistry, ScopeRegistry, TypeRegistry,
    index_source,
};

const FILE_A: &str = "export class Widget {\n  render() {}\n}\nexport function helper() {}\n";
const FILE_B: &str = "import { Widget } from './a';\nconst w = new Widget();\nw.render();\n";
const FILE_C: &str = "import { helper } from './a';\nhelper();\n";

fn seeded_project() -> Project {
    let mut project = project_with_modules(HashMap::from([("./a", "a.ts")]));
    project.index_source("a.ts", FILE_A).unwrap();
    project.index_source("b.ts", FILE_B).unwrap();
    project
}

/// A stable, order-insensitive digest of every observable output.
fn snapshot(project: &Project) -> String {
    let mut files: Vec<&FilePath> = project.references().files().collect();
    files.sort_unstable();
    let mut parts = Vec::new();
    for file in files {
        parts.push(serde_json::to_string(&(file, project.calls_for_file(file))).unwrap());
    }
    let mut referenced: Vec<&str> = project
        .all_referenced_symbols()
        .iter()
        .map(|s| s.as_str())
        .collect();
    referenced.sort_unstable();
    parts.push(format!("{referenced:?}"));
    let mut reach: Vec<String> = project
        .indirect_reachability()
        .iter()
        .map(|(file, entries)| serde_json::to_string(&(file, entries)).unwrap())
        .collect();
    reach.sort_unstable();
    parts.extend(reach);
    parts.join("\n")
}

#[test]
fn rerunning_the_pipeline_is_a_no_op() {
    let mut project = seeded_project();
    project.resolve_all();
    let first = snapshot(&project);
    project.resolve_all();
    let second = snapshot(&project);
    assert_eq!(first, second);
}

#[test]
fn removal_restores_prior_state() {
    let mut project = seeded_project();
    project.resolve_all();
    let baseline = snapshot(&project);

    project.index_source("c.ts", FILE_C).unwrap();
    project.resolve_all();
    assert_ne!(snapshot(&project), baseline, "c.ts contributed output");

    project.remove_file(&FilePath::from("c.ts"));
    project.resolve_all();
    assert_eq!(
        snapshot(&project),
        baseline,
        "removing c.ts must leave state as if it was never indexed"
    );
}

#[test]
fn update_then_remove_empties_every_registry() {
    let mut project = project();
    project.index_source("a.ts", FILE_A).unwrap();
    project.resolve_all();
    project.remove_file(&FilePath::from("a.ts"));

    assert!(project.definitions().is_empty());
    assert!(project.scopes().is_empty());
    assert!(project.references().is_empty());
    assert!(project.exports().is_empty());
    assert!(project.calls_for_file(&FilePath::from("a.ts")).is_empty());
    // Removing again is idempotent.
    project.remove_file(&FilePath::from("a.ts"));
}

#[test]
fn reindexing_changed_content_replaces_contribution() {
    let mut project = project();
    project
        .index_source("a.ts", "export function one() {}\none();\n")
        .unwrap();
    project.resolve_all();
    assert!(
        project
            .calls_for_file(&FilePath::from("a.ts"))
            .iter()
            .any(|c| c.name.as_str() == "one")
    );

    project
        .index_source("a.ts", "export function two() {}\ntwo();\n")
        .unwrap();
    project.resolve_all();
    let calls = project.calls_for_file(&FilePath::from("a.ts"));
    assert!(calls.iter().any(|c| c.name.as_str() == "two"));
    assert!(calls.iter().all(|c| c.name.as_str() != "one"));
}

#[test]
fn name_resolution_is_idempotent() {
    let mut project = seeded_project();
    project.resolve_all();
    let index = index_source("a.ts", Language::TypeScript, FILE_A).unwrap();
    let root = index.scopes.root_id().clone();
    let first = project.resolve_name(&root, "Widget");
    assert!(first.is_some());
    project.resolve_all();
    assert_eq!(project.resolve_name(&root, "Widget"), first);
}

#[test]
fn skipping_phase_one_yields_empty_resolutions_not_errors() {
    let index = index_source(
        "a.ts",
        Language::TypeScript,
        "class C {\n  run() {}\n}\nconst c = new C();\nc.run();\n",
    )
    .unwrap();

    let mut definitions = DefinitionRegistry::new();
    let mut scopes = ScopeRegistry::new();
    let mut references = ReferenceRegistry::new();
    let mut exports = ExportRegistry::new();
    let mut imports = ImportGraph::new();
    definitions.update_file(&index);
    scopes.update_file(&index);
    references.update_file(&index);
    exports.update_file(&index);
    let no_resolver: Box<symref::ModuleResolver> = Box::new(|_, _| None);
    imports.update_file(&index, &no_resolver);

    let types = TypeRegistry::new();
    let mut resolutions = ResolutionRegistry::new();
    let ctx = RegistryContext {
        definitions: &definitions,
        scopes: &scopes,
        references: &references,
        exports: &exports,
        imports: &imports,
        resolver: &*no_resolver,
    };
    // Phase 2 without Phase 1: the contract is empty resolution sets.
    resolutions.resolve_calls_for_files(&[FilePath::from("a.ts")], &ctx, &types);
    let calls = resolutions.calls_for_file(&FilePath::from("a.ts"));
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|c| !c.is_resolved()));
}

#[test]
fn parallel_and_serial_indexing_agree() {
    let sources = vec![
        (
            FilePath::from("a.ts"),
            Language::TypeScript,
            FILE_A.to_string(),
        ),
        (
            FilePath::from("b.ts"),
            Language::TypeScript,
            FILE_B.to_string(),
        ),
    ];

    let mut parallel = project_with_modules(HashMap::from([("./a", "a.ts")]));
    parallel.index_sources_parallel(sources).unwrap();
    parallel.resolve_all();

    let mut serial = seeded_project();
    serial.resolve_all();

    assert_eq!(snapshot(&parallel), snapshot(&serial));
}

#[test]
fn every_language_produces_valid_indexes() {
    let samples = [
        (
            "s.js",
            Language::JavaScript,
            "class A { run() {} }\nconst a = new A();\na.run();\n",
        ),
        (
            "s.ts",
            Language::TypeScript,
            "interface I { go(): void }\nclass B implements I { go(): void {} }\n",
        ),
        (
            "s.py",
            Language::Python,
            "class P:\n    def __init__(self):\n        pass\n\np = P()\n",
        ),
        (
            "s.rs",
            Language::Rust,
            "pub struct S;\nimpl S {\n    pub fn new() -> Self { S }\n}\n",
        ),
    ];
    for (path, language, source) in samples {
        let index = index_source(path, language, source).unwrap();
        index.validate().unwrap_or_else(|e| panic!("{path}: {e}"));
        assert!(index.definition_count() > 0, "{path} extracted nothing");
    }
}
