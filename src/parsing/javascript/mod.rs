//! JavaScript lowering.
//!
//! Thin front over the shared ECMAScript core; JavaScript trees simply never
//! produce the TypeScript-only captures.

use crate::parsing::ecma::EcmaLowering;
use crate::parsing::{FileContext, Language, LoweredFile, Lowering};
use tree_sitter::Tree;

pub struct JavaScriptLowering;

impl Lowering for JavaScriptLowering {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn lower(&self, ctx: &FileContext, tree: Option<&Tree>, source: &str) -> LoweredFile {
        EcmaLowering {
            language: Language::JavaScript,
        }
        .lower(ctx, tree, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{DefinitionKind, ExportEntry, ImportKind, Initializer};
    use crate::reference::{AccessType, ReferenceDetail};

    fn lower(source: &str) -> LoweredFile {
        let ctx = FileContext::for_source("test.js", Language::JavaScript, source);
        let tree = Language::JavaScript.parse(source).unwrap();
        JavaScriptLowering.lower(&ctx, tree.as_ref(), source)
    }

    #[test]
    fn constructor_call_records_construct_target() {
        let lowered = lower("const obj = new MyClass();\nobj.method();\n");
        let ctor = lowered
            .references
            .iter()
            .find_map(|r| match &r.detail {
                ReferenceDetail::ConstructorCall { construct_target } => {
                    Some((r.name.as_str(), construct_target.clone()))
                }
                _ => None,
            })
            .expect("constructor call");
        assert_eq!(ctor.0, "MyClass");
        let target = ctor.1.expect("construct target");
        assert_eq!((target.start_line, target.start_column), (1, 7));
    }

    #[test]
    fn method_call_chain_is_fully_rooted() {
        let lowered = lower("const obj = new MyClass();\nobj.method();\n");
        let call = lowered
            .references
            .iter()
            .find_map(|r| match &r.detail {
                ReferenceDetail::MethodCall {
                    property_chain,
                    receiver_location,
                    ..
                } => Some((r.name.as_str(), property_chain.clone(), receiver_location.clone())),
                _ => None,
            })
            .expect("method call");
        assert_eq!(call.0, "method");
        let chain: Vec<_> = call.1.iter().map(|s| s.as_str().to_string()).collect();
        assert_eq!(chain, vec!["obj", "method"]);
        assert_eq!((call.2.start_line, call.2.start_column), (2, 1));
    }

    #[test]
    fn optional_chaining_is_sticky_over_the_chain() {
        let lowered = lower("api?.posts?.comments?.create();\n");
        let call = lowered
            .references
            .iter()
            .find_map(|r| match &r.detail {
                ReferenceDetail::MethodCall {
                    property_chain,
                    optional_chaining,
                    ..
                } => Some((r.name.as_str(), property_chain.clone(), *optional_chaining)),
                _ => None,
            })
            .expect("method call");
        assert_eq!(call.0, "create");
        let chain: Vec<_> = call.1.iter().map(|s| s.as_str().to_string()).collect();
        assert_eq!(chain, vec!["api", "posts", "comments", "create"]);
        assert!(call.2, "any ?. in the prefix sets the flag");
    }

    #[test]
    fn dynamic_root_aborts_chain() {
        let lowered = lower("getApi().users.list();\n");
        let call = lowered
            .references
            .iter()
            .find_map(|r| match &r.detail {
                ReferenceDetail::MethodCall { property_chain, .. } => {
                    Some((r.name.as_str(), property_chain.len()))
                }
                _ => None,
            })
            .expect("method call");
        assert_eq!(call.0, "list");
        assert_eq!(call.1, 0, "dynamic root leaves no chain");
    }

    #[test]
    fn imports_bind_one_definition_per_name() {
        let lowered = lower(
            "import def, { a, b as c } from './m';\nimport * as ns from './n';\nimport './side';\n",
        );
        let imports: Vec<_> = lowered
            .definitions
            .iter()
            .filter(|d| d.kind == DefinitionKind::Import)
            .collect();
        let names: Vec<_> = imports.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"def"));
        assert!(names.contains(&"a"));
        assert!(names.contains(&"c"));
        assert!(names.contains(&"ns"));
        let aliased = imports.iter().find(|d| d.name.as_str() == "c").unwrap();
        let import = aliased.as_import().unwrap();
        assert_eq!(import.import_kind, ImportKind::Named);
        assert_eq!(import.original_name.as_ref().map(|n| n.as_str()), Some("b"));
        let ns = imports.iter().find(|d| d.name.as_str() == "ns").unwrap();
        assert_eq!(ns.as_import().unwrap().import_kind, ImportKind::Namespace);
        // The side-effect import binds nothing usable.
        assert!(
            imports
                .iter()
                .any(|d| d.as_import().unwrap().import_kind == ImportKind::SideEffect)
        );
    }

    #[test]
    fn export_clause_and_reexports() {
        let lowered = lower(
            "function helper() {}\nexport { helper };\nexport { deep as shallow } from './other';\nexport * from './star';\n",
        );
        assert!(lowered.exports.iter().any(|e| matches!(
            e,
            ExportEntry::Local { name, is_default: false, .. } if name.as_str() == "helper"
        )));
        assert!(lowered.exports.iter().any(|e| matches!(
            e,
            ExportEntry::Reexport { exported, original, source }
                if exported.as_str() == "shallow"
                    && original.as_str() == "deep"
                    && &**source == "./other"
        )));
        assert!(lowered.exports.iter().any(|e| matches!(
            e,
            ExportEntry::ReexportAll { source } if &**source == "./star"
        )));
    }

    #[test]
    fn collection_literal_stores_references_not_reads() {
        let lowered = lower(
            "function fnA() {}\nfunction fnB() {}\nconst HANDLERS = { a: fnA, b: fnB };\n",
        );
        let handlers = lowered
            .definitions
            .iter()
            .find(|d| d.name.as_str() == "HANDLERS")
            .expect("HANDLERS");
        let collection = handlers
            .as_variable()
            .unwrap()
            .function_collection
            .as_ref()
            .expect("function collection");
        let refs: Vec<_> = collection
            .stored_references
            .iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(refs, vec!["fnA", "fnB"]);
        // The literal's identifiers are not also variable reads.
        assert!(!lowered.references.iter().any(|r| {
            matches!(
                r.detail,
                ReferenceDetail::VariableReference {
                    access_type: AccessType::Read
                }
            ) && (r.name.as_str() == "fnA" || r.name.as_str() == "fnB")
        }));
    }

    #[test]
    fn destructuring_stays_literal() {
        let lowered = lower("const { a, b } = load();\n");
        let def = lowered
            .definitions
            .iter()
            .find(|d| d.kind == DefinitionKind::Constant)
            .expect("destructured binding");
        assert_eq!(def.name.as_str(), "{ a, b }");
    }

    #[test]
    fn augmented_assignment_reads_and_writes() {
        let lowered = lower("let total = 0;\ntotal += 1;\n");
        let accesses: Vec<_> = lowered
            .references
            .iter()
            .filter_map(|r| match &r.detail {
                ReferenceDetail::VariableReference { access_type }
                    if r.name.as_str() == "total" =>
                {
                    Some(*access_type)
                }
                _ => None,
            })
            .collect();
        assert!(accesses.contains(&AccessType::Read));
        assert!(accesses.contains(&AccessType::Write));
    }

    #[test]
    fn callback_argument_is_marked() {
        let lowered = lower("items.forEach(function (item) { use(item); });\n");
        let callback = lowered
            .definitions
            .iter()
            .find_map(|d| d.as_function().and_then(|f| f.callback_context.clone()))
            .expect("callback context");
        assert!(callback.is_callback);
        assert_eq!(callback.receiver_location.start_line, 1);
    }

    #[test]
    fn dispatcher_function_records_collection_source() {
        let lowered = lower(
            "const HANDLERS = { a: fnA };\nfunction dispatch(k) { return HANDLERS[k]; }\n",
        );
        let dispatch = lowered
            .definitions
            .iter()
            .find(|d| d.name.as_str() == "dispatch")
            .expect("dispatch");
        let source = dispatch
            .as_function()
            .unwrap()
            .collection_source
            .as_ref()
            .expect("collection source");
        assert_eq!(source.collection_name.as_str(), "HANDLERS");
    }

    #[test]
    fn variable_initializer_shapes() {
        let lowered = lower(
            "const a = new Widget();\nconst b = api.fetch();\nconst c = helpers;\n",
        );
        let init = |name: &str| {
            lowered
                .definitions
                .iter()
                .find(|d| d.name.as_str() == name)
                .and_then(|d| d.as_variable())
                .and_then(|v| v.initializer.clone())
        };
        assert!(matches!(
            init("a"),
            Some(Initializer::ConstructorCall { class_name, .. }) if class_name.as_str() == "Widget"
        ));
        assert!(matches!(
            init("b"),
            Some(Initializer::MethodCall { property_chain, .. }) if property_chain.len() == 2
        ));
        assert!(matches!(
            init("c"),
            Some(Initializer::FunctionRef { name }) if name.as_str() == "helpers"
        ));
    }
}
