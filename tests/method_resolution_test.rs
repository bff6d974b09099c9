//! Method receiver typing and dispatch across the supported languages.

mod common;

use common::{find_call, project, resolution_ids};
use symref::{CallType, FilePath, ResolutionReason};

#[test]
fn js_constructor_then_method_receiver() {
    let mut project = project();
    project
        .index_source(
            "app.js",
            "class MyClass {\n  method() {}\n}\nconst obj = new MyClass();\nobj.method();\n",
        )
        .unwrap();
    project.resolve_all();

    // The construction resolves against the class; with no declared
    // constructor it synthesizes the default.
    let ctor = find_call(&project, "app.js", "MyClass", CallType::Constructor);
    assert_eq!(ctor.resolutions.len(), 1);
    assert_eq!(
        ctor.resolutions[0].reason,
        ResolutionReason::DefaultConstructor
    );
    assert!(ctor.resolutions[0].symbol_id.as_str().starts_with("class:MyClass:"));

    // The receiver's type flows from the constructor initializer.
    let call = find_call(&project, "app.js", "method", CallType::Method);
    let ids = resolution_ids(call);
    assert_eq!(ids.len(), 1);
    assert!(ids[0].starts_with("method:method:app.js:"));
}

#[test]
fn declared_constructor_is_the_target() {
    let mut project = project();
    project
        .index_source(
            "app.ts",
            "class Service {\n  constructor(url: string) {}\n}\nconst s = new Service(\"x\");\n",
        )
        .unwrap();
    project.resolve_all();

    let ctor = find_call(&project, "app.ts", "Service", CallType::Constructor);
    assert_eq!(ctor.resolutions.len(), 1);
    assert!(ctor.resolutions[0]
        .symbol_id
        .as_str()
        .starts_with("constructor:constructor:"));
}

#[test]
fn self_and_super_calls() {
    let mut project = project();
    project
        .index_source(
            "app.js",
            "class Base {\n  helper() {}\n}\nclass Child extends Base {\n  helper() {}\n  run() {\n    this.helper();\n    super.helper();\n  }\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let calls = project.calls_for_file(&FilePath::from("app.js"));
    let helper_calls: Vec<_> = calls.iter().filter(|c| c.name.as_str() == "helper").collect();
    assert_eq!(helper_calls.len(), 2);

    // `this.helper()` finds the override; `super.helper()` reaches the base
    // method (its expansion may add the override too).
    assert!(helper_calls.iter().all(|c| c.is_resolved()));
    assert!(helper_calls.iter().any(|c| c
        .resolutions
        .iter()
        .any(|r| r.symbol_id.as_str().contains(":helper:app.js:5:"))));
    assert!(helper_calls.iter().any(|c| c
        .resolutions
        .iter()
        .any(|r| r.symbol_id.as_str().contains(":helper:app.js:2:"))));
}

#[test]
fn annotated_parameter_receiver() {
    let mut project = project();
    project
        .index_source(
            "app.ts",
            "class Store {\n  flush(): void {}\n}\nfunction close(s: Store) {\n  s.flush();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.ts", "flush", CallType::Method);
    assert_eq!(call.resolutions.len(), 1);
    assert!(call.resolutions[0].symbol_id.as_str().starts_with("method:flush:"));
    // The caller scope is close's body, not the module.
    assert!(call.caller_scope_id.as_str().starts_with("function:"));
}

#[test]
fn fluent_chain_through_declared_return_types() {
    let mut project = project();
    project
        .index_source(
            "app.ts",
            "class Widget {\n  show(): void {}\n}\nclass Builder {\n  width(w: number): this {\n    return this;\n  }\n  build(): Widget {\n    return new Widget();\n  }\n}\nconst b = new Builder();\nconst c = b.width(3);\nconst w = c.build();\nw.show();\n",
        )
        .unwrap();
    project.resolve_all();

    // `width` returns this → c: Builder; `build` returns Widget → w: Widget.
    let build = find_call(&project, "app.ts", "build", CallType::Method);
    assert!(resolution_ids(build)[0].starts_with("method:build:"));
    let show = find_call(&project, "app.ts", "show", CallType::Method);
    assert!(resolution_ids(show)[0].starts_with("method:show:"));
}

#[test]
fn intermediate_chain_members_are_walked() {
    let mut project = project();
    project
        .index_source(
            "app.ts",
            "class Engine {\n  start(): void {}\n}\nclass Car {\n  engine: Engine;\n}\nfunction drive(car: Car) {\n  car.engine.start();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.ts", "start", CallType::Method);
    assert_eq!(call.resolutions.len(), 1);
    assert!(call.resolutions[0].symbol_id.as_str().starts_with("method:start:"));
}

#[test]
fn rust_inherent_method_and_static_constructor() {
    let mut project = project();
    project
        .index_source(
            "store.rs",
            "pub struct Store {\n    count: u32,\n}\n\nimpl Store {\n    pub fn new() -> Self {\n        Store { count: 0 }\n    }\n\n    pub fn bump(&mut self) {\n        self.count += 1;\n    }\n\n    pub fn spin(&mut self) {\n        self.bump();\n    }\n}\n\nfn main() {\n    let mut s = Store::new();\n    s.bump();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let ctor = find_call(&project, "store.rs", "Store", CallType::Constructor);
    assert!(ctor.resolutions[0].symbol_id.as_str().starts_with("constructor:new:"));

    // `s` is typed by its Store::new initializer.
    let calls = project.calls_for_file(&FilePath::from("store.rs"));
    let bump_calls: Vec<_> = calls
        .iter()
        .filter(|c| c.name.as_str() == "bump" && c.is_resolved())
        .collect();
    assert_eq!(bump_calls.len(), 2, "s.bump() and self.bump() both resolve");
    for call in bump_calls {
        assert!(call.resolutions[0].symbol_id.as_str().starts_with("method:bump:"));
    }
}

#[test]
fn dynamic_receivers_stay_unresolved() {
    let mut project = project();
    project
        .index_source("app.js", "getApi().users.list();\n")
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.js", "list", CallType::Method);
    assert!(
        !call.is_resolved(),
        "a dynamic root aborts the chain and yields the empty set"
    );
}
