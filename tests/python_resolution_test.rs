//! Python-specific behaviors: `__init__` as the constructor, call/construct
//! disambiguation in Phase 2, and self/cls receivers.

mod common;

use common::{find_call, project};
use symref::{CallType, DefinitionKind, FilePath};

const PERSON: &str = "class Person:\n    def __init__(self, name: str):\n        self.name = name\n\n    def greet(self):\n        return self.name\n\np = Person(\"ada\")\np.greet()\n";

#[test]
fn init_is_tracked_as_constructor() {
    let mut project = project();
    project.index_source("person.py", PERSON).unwrap();
    project.resolve_all();

    let class = project
        .definitions()
        .all_definitions()
        .find(|d| d.kind == DefinitionKind::Class && d.name.as_str() == "Person")
        .expect("Person class");
    let detail = class.as_class().unwrap();
    assert_eq!(detail.constructors.len(), 1);
    let ctor = &detail.constructors[0];
    assert_eq!(ctor.name.as_str(), "__init__");
    assert!(detail.methods.iter().all(|m| m.name.as_str() != "__init__"));

    let params = match &ctor.detail {
        symref::DefinitionDetail::Constructor(c) => &c.signature.parameters,
        _ => unreachable!(),
    };
    assert!(
        params
            .iter()
            .any(|p| p.name.as_str() == "name" && p.type_name.as_deref() == Some("str"))
    );
}

#[test]
fn bare_call_on_a_class_rewrites_to_construction() {
    let mut project = project();
    project.index_source("person.py", PERSON).unwrap();
    project.resolve_all();

    // The extractor records a plain function call; Phase 2 rewrites it once
    // the callee resolves to a class.
    let ctor = find_call(&project, "person.py", "Person", CallType::Constructor);
    assert_eq!(ctor.resolutions.len(), 1);
    assert!(
        ctor.resolutions[0]
            .symbol_id
            .as_str()
            .starts_with("constructor:__init__:")
    );
    assert!(
        project
            .calls_for_file(&FilePath::from("person.py"))
            .iter()
            .all(|c| !(c.name.as_str() == "Person" && c.call_type == CallType::Function)),
        "no function-call record survives the rewrite"
    );
}

#[test]
fn constructed_binding_types_the_receiver() {
    let mut project = project();
    project.index_source("person.py", PERSON).unwrap();
    project.resolve_all();

    let call = find_call(&project, "person.py", "greet", CallType::Method);
    assert_eq!(call.resolutions.len(), 1);
    assert!(call.resolutions[0].symbol_id.as_str().starts_with("method:greet:"));
}

#[test]
fn self_receiver_resolves_in_methods() {
    let mut project = project();
    project
        .index_source(
            "worker.py",
            "class Worker:\n    def step(self):\n        pass\n\n    def run(self):\n        self.step()\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "worker.py", "step", CallType::Method);
    assert!(call.resolutions[0].symbol_id.as_str().starts_with("method:step:"));
    // The caller is run's body scope.
    assert!(call.caller_scope_id.as_str().starts_with("method:"));
}

#[test]
fn super_call_reaches_the_base_method() {
    let mut project = project();
    project
        .index_source(
            "base.py",
            "class Base:\n    def setup(self):\n        pass\n\nclass Child(Base):\n    def setup(self):\n        super().setup()\n",
        )
        .unwrap();
    project.resolve_all();

    let calls: Vec<_> = project
        .calls_for_file(&FilePath::from("base.py"))
        .iter()
        .filter(|c| c.name.as_str() == "setup")
        .cloned()
        .collect();
    assert!(!calls.is_empty());
    assert!(
        calls.iter().any(|c| c
            .resolutions
            .iter()
            .any(|r| r.symbol_id.as_str().contains(":setup:base.py:2:"))),
        "super().setup() reaches Base.setup"
    );
}

#[test]
fn plain_function_calls_stay_function_calls() {
    let mut project = project();
    project
        .index_source(
            "util.py",
            "def compute():\n    return 1\n\nresult = compute()\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "util.py", "compute", CallType::Function);
    assert_eq!(call.resolutions.len(), 1);
    assert!(call.resolutions[0].symbol_id.as_str().starts_with("function:compute:"));
}
