//! Polymorphic expansion: interface and base-class receivers reach every
//! implementation.

mod common;

use common::{find_call, project, resolution_ids};
use symref::{CallType, ResolutionReason};

#[test]
fn interface_call_expands_to_all_implementations() {
    let mut project = project();
    project
        .index_source(
            "app.ts",
            "interface Handler {\n  process(): void;\n}\nclass A implements Handler {\n  process(): void {}\n}\nclass B implements Handler {\n  process(): void {}\n}\nfunction run(h: Handler) {\n  h.process();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.ts", "process", CallType::Method);
    let mut ids = resolution_ids(call);
    ids.sort_unstable();
    assert_eq!(ids.len(), 2, "A.process and B.process, duplicate-free");
    assert!(ids[0].contains(":process:app.ts:5:"), "A.process: {}", ids[0]);
    assert!(ids[1].contains(":process:app.ts:8:"), "B.process: {}", ids[1]);
    assert!(
        call.resolutions
            .iter()
            .all(|r| r.reason == ResolutionReason::InterfaceImplementation)
    );
}

#[test]
fn interface_without_implementations_resolves_empty() {
    let mut project = project();
    project
        .index_source(
            "app.ts",
            "interface Sink {\n  drain(): void;\n}\nfunction pour(s: Sink) {\n  s.drain();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.ts", "drain", CallType::Method);
    assert!(
        !call.is_resolved(),
        "an interface's own declaration has no body to reach"
    );
}

#[test]
fn base_class_call_includes_base_and_overrides() {
    let mut project = project();
    project
        .index_source(
            "app.ts",
            "class Base {\n  render(): void {}\n}\nclass Derived extends Base {\n  render(): void {}\n}\nfunction draw(b: Base) {\n  b.render();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.ts", "render", CallType::Method);
    assert_eq!(call.resolutions.len(), 2, "base is included, not replaced");
    assert!(call.resolutions.iter().any(|r| {
        r.reason == ResolutionReason::Direct && r.symbol_id.as_str().contains(":render:app.ts:2:")
    }));
    assert!(call.resolutions.iter().any(|r| {
        r.reason == ResolutionReason::InterfaceImplementation
            && r.symbol_id.as_str().contains(":render:app.ts:5:")
    }));
}

#[test]
fn transitive_subtypes_are_included() {
    let mut project = project();
    project
        .index_source(
            "app.ts",
            "interface Node {\n  visit(): void;\n}\nclass Middle implements Node {\n  visit(): void {}\n}\nclass Leaf extends Middle {\n  visit(): void {}\n}\nfunction walk(n: Node) {\n  n.visit();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "app.ts", "visit", CallType::Method);
    assert_eq!(
        call.resolutions.len(),
        2,
        "Middle.visit and Leaf.visit through the transitive chain"
    );
}

#[test]
fn rust_trait_receiver_expands_to_impls() {
    let mut project = project();
    project
        .index_source(
            "render.rs",
            "pub trait Render {\n    fn draw(&self);\n}\n\npub struct Circle;\n\npub struct Square;\n\nimpl Render for Circle {\n    fn draw(&self) {}\n}\n\nimpl Render for Square {\n    fn draw(&self) {}\n}\n\nfn paint(shape: &dyn Render) {\n    shape.draw();\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "render.rs", "draw", CallType::Method);
    assert_eq!(call.resolutions.len(), 2, "both impls of Render::draw");
    assert!(
        call.resolutions
            .iter()
            .all(|r| r.reason == ResolutionReason::InterfaceImplementation)
    );
}

#[test]
fn python_base_class_dispatch() {
    let mut project = project();
    project
        .index_source(
            "shapes.py",
            "class Shape:\n    def area(self):\n        pass\n\nclass Circle(Shape):\n    def area(self):\n        pass\n\ndef measure(shape):\n    shape = Shape()\n    return shape.area()\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "shapes.py", "area", CallType::Method);
    assert_eq!(
        call.resolutions.len(),
        2,
        "Shape.area plus the Circle override"
    );
}
