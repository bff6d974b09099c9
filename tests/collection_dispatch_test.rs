//! Collection-stored function dispatch, indirect reachability, and callback
//! invocation synthesis.

mod common;

use common::{find_call, project};
use symref::{CallType, FilePath, ReachabilityReason, ResolutionReason};

#[test]
fn dispatcher_function_fans_out_to_the_collection() {
    let mut project = project();
    project
        .index_source(
            "handlers.js",
            "function fnA() {}\nfunction fnB() {}\nconst HANDLERS = { a: fnA, b: fnB };\nexport function dispatch(k) {\n  return HANDLERS[k];\n}\ndispatch(\"a\")();\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "handlers.js", "dispatch", CallType::Function);
    assert_eq!(call.resolutions.len(), 2, "both stored handlers");
    assert!(
        call.resolutions
            .iter()
            .all(|r| r.reason == ResolutionReason::CollectionDispatch)
    );
    let ids: Vec<_> = call.resolutions.iter().map(|r| r.symbol_id.as_str()).collect();
    assert!(ids.iter().any(|id| id.starts_with("function:fnA:")));
    assert!(ids.iter().any(|id| id.starts_with("function:fnB:")));
}

#[test]
fn collection_read_marks_functions_indirectly_reachable() {
    let mut project = project();
    project
        .index_source(
            "handlers.js",
            "function fnA() {}\nfunction fnB() {}\nconst HANDLERS = { a: fnA, b: fnB };\nexport function dispatch(k) {\n  return HANDLERS[k];\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let reachability = project.indirect_reachability();
    let entries = reachability
        .get(&FilePath::from("handlers.js"))
        .expect("entries keyed by the read-site file");
    let collected: Vec<_> = entries
        .iter()
        .filter(|e| {
            matches!(&e.reason, ReachabilityReason::CollectionRead { collection_id, .. }
                if collection_id.as_str().contains(":HANDLERS:"))
        })
        .map(|e| e.symbol_id.as_str())
        .collect();
    assert!(collected.iter().any(|id| id.starts_with("function:fnA:")));
    assert!(collected.iter().any(|id| id.starts_with("function:fnB:")));
}

#[test]
fn spread_references_are_followed_transitively() {
    let mut project = project();
    project
        .index_source(
            "app.js",
            "function fnA() {}\nfunction fnB() {}\nconst BASE = { a: fnA };\nconst ALL = { ...BASE, b: fnB };\nfunction expose() {\n  return ALL;\n}\n",
        )
        .unwrap();
    project.resolve_all();

    let entries = project
        .indirect_reachability()
        .get(&FilePath::from("app.js"))
        .expect("read of ALL inside expose");
    let ids: Vec<_> = entries.iter().map(|e| e.symbol_id.as_str()).collect();
    assert!(ids.iter().any(|id| id.starts_with("function:fnB:")));
    assert!(
        ids.iter().any(|id| id.starts_with("function:fnA:")),
        "spread into BASE is followed"
    );
}

#[test]
fn object_literal_member_call_resolves_inline_function() {
    let mut project = project();
    project
        .index_source(
            "api.js",
            "const api = {\n  run() {},\n  stop: function () {},\n};\napi.run();\napi.stop();\n",
        )
        .unwrap();
    project.resolve_all();

    let run = find_call(&project, "api.js", "run", CallType::Method);
    assert_eq!(run.resolutions.len(), 1);
    assert!(run.resolutions[0].symbol_id.as_str().starts_with("function:run:"));
}

#[test]
fn function_value_read_is_reachable() {
    let mut project = project();
    project
        .index_source(
            "app.js",
            "function worker() {}\nconst task = worker;\n",
        )
        .unwrap();
    project.resolve_all();

    let entries = project
        .indirect_reachability()
        .get(&FilePath::from("app.js"))
        .expect("worker read");
    assert!(entries.iter().any(|e| {
        e.symbol_id.as_str().starts_with("function:worker:")
            && matches!(e.reason, ReachabilityReason::FunctionReference { .. })
    }));
}

#[test]
fn anonymous_callbacks_get_synthetic_invocation_edges() {
    let mut project = project();
    project
        .index_source(
            "app.js",
            "const items = [];\nitems.forEach(function (item) {\n  console.log(item);\n});\n",
        )
        .unwrap();
    project.resolve_all();

    let synthetic = project
        .calls_for_file(&FilePath::from("app.js"))
        .iter()
        .find(|c| c.is_callback_invocation)
        .expect("synthesized invocation edge");
    assert_eq!(synthetic.resolutions.len(), 1);
    assert_eq!(
        synthetic.resolutions[0].reason,
        ResolutionReason::CallbackInvocation
    );
    assert!(synthetic.resolutions[0].symbol_id.as_str().contains(":<anonymous>:"));
}

#[test]
fn python_dict_dispatch_through_get() {
    let mut project = project();
    project
        .index_source(
            "registry.py",
            "def handle_a():\n    pass\n\ndef handle_b():\n    pass\n\nHANDLERS = {\"a\": handle_a, \"b\": handle_b}\n\ndef dispatch(kind):\n    return HANDLERS.get(kind)\n\ndispatch(\"a\")()\n",
        )
        .unwrap();
    project.resolve_all();

    let call = find_call(&project, "registry.py", "dispatch", CallType::Function);
    assert_eq!(call.resolutions.len(), 2);
    assert!(
        call.resolutions
            .iter()
            .all(|r| r.reason == ResolutionReason::CollectionDispatch)
    );
}
