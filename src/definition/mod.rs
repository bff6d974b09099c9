//! Definition model.
//!
//! A `Definition` is a named entity introduced by source text: function,
//! class, interface, method, constructor, property, variable, constant,
//! import, enum, or type alias. Methods, constructors, and properties are
//! owned by their class and never appear as top-level index entries.
//!
//! Constructors are a separate kind: a member named `constructor`, `__init__`,
//! or `new` (per language) lands in the class's `constructors` array and must
//! not appear among `methods`.

use crate::types::{Location, ScopeId, SymbolId, SymbolName};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Modifier flags shared by all definition kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DefinitionFlags: u32 {
        const EXPORTED       = 1 << 0;
        const DEFAULT_EXPORT = 1 << 1;
        const STATIC         = 1 << 2;
        const ASYNC          = 1 << 3;
        const ABSTRACT       = 1 << 4;
        const CONSTANT       = 1 << 5;
        const PARAMETER      = 1 << 6;
        const GENERATOR      = 1 << 7;
    }
}

impl Serialize for DefinitionFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for DefinitionFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_bits_truncate(u32::deserialize(deserializer)?))
    }
}

/// Discriminant for definitions; also the token used in id synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Function,
    Class,
    Interface,
    Method,
    Constructor,
    Property,
    Variable,
    Constant,
    Import,
    Enum,
    TypeAlias,
}

impl DefinitionKind {
    pub fn token(self) -> &'static str {
        match self {
            DefinitionKind::Function => "function",
            DefinitionKind::Class => "class",
            DefinitionKind::Interface => "interface",
            DefinitionKind::Method => "method",
            DefinitionKind::Constructor => "constructor",
            DefinitionKind::Property => "property",
            DefinitionKind::Variable => "variable",
            DefinitionKind::Constant => "constant",
            DefinitionKind::Import => "import",
            DefinitionKind::Enum => "enum",
            DefinitionKind::TypeAlias => "type_alias",
        }
    }
}

/// One formal parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Parameter {
    pub name: SymbolName,
    pub type_name: Option<Box<str>>,
    pub default_value: Option<Box<str>>,
}

impl Parameter {
    pub fn new(name: impl Into<SymbolName>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            default_value: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<Box<str>>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_default(mut self, default_value: impl Into<Box<str>>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

/// Callable signature: parameters plus optional declared return type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<Box<str>>,
}

/// Marks an anonymous function that appears in argument position of a call.
/// Phase 2 synthesizes an invocation edge from that call to the function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackContext {
    pub is_callback: bool,
    /// Location of the call expression receiving the callback.
    pub receiver_location: Location,
}

/// A variable bound to a literal container of functions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionCollection {
    /// Functions defined inline in the container literal.
    pub stored_functions: Vec<SymbolId>,
    /// Named references stored in the container, resolved lazily at the
    /// collection's defining scope. Spread sources land here too.
    pub stored_references: Vec<SymbolName>,
}

impl FunctionCollection {
    pub fn is_empty(&self) -> bool {
        self.stored_functions.is_empty() && self.stored_references.is_empty()
    }
}

/// A binding whose value was read out of a function collection
/// (`HANDLERS[kind]`, `table.get(kind)`). Calls through such a binding fan out
/// to every function the collection stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSource {
    pub collection_name: SymbolName,
    pub location: Location,
}

/// Raw syntactic shape of a variable initializer, kept for type inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Initializer {
    /// `let x = new C(...)` / `x = C(...)` where `C` later resolves to a class.
    ConstructorCall {
        class_name: SymbolName,
        location: Location,
    },
    /// `let x = recv.chain.method(...)`; the rooted chain including the method.
    MethodCall {
        property_chain: Vec<SymbolName>,
        location: Location,
    },
    /// `let x = someFunction` (bare reference, no call).
    FunctionRef { name: SymbolName },
    /// Object/array literal; details live in the `FunctionCollection`.
    CollectionLiteral,
    /// Anything else (literals, arithmetic, awaits, ...).
    Other,
}

/// Payload per definition kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefinitionDetail {
    Function(FunctionDef),
    Class(ClassDef),
    Interface(InterfaceDef),
    Method(MethodDef),
    Constructor(ConstructorDef),
    Property(PropertyDef),
    Variable(VariableDef),
    Import(ImportDef),
    Enum(EnumDef),
    TypeAlias(TypeAliasDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub signature: Signature,
    pub body_scope_id: ScopeId,
    pub decorators: Vec<Box<str>>,
    pub callback_context: Option<CallbackContext>,
    /// Set when the function's return expression reads out of a collection,
    /// making it a dispatcher.
    pub collection_source: Option<CollectionSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub extends: Vec<SymbolName>,
    pub implements: Vec<SymbolName>,
    pub methods: Vec<Definition>,
    pub properties: Vec<Definition>,
    /// Multiple constructors are syntactically permitted; all are kept.
    pub constructors: Vec<Definition>,
    pub decorators: Vec<Box<str>>,
    pub body_scope_id: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub extends: Vec<SymbolName>,
    pub methods: Vec<Definition>,
    pub properties: Vec<Definition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub signature: Signature,
    pub body_scope_id: Option<ScopeId>,
    pub decorators: Vec<Box<str>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDef {
    pub signature: Signature,
    pub body_scope_id: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub type_name: Option<Box<str>>,
    pub initial_value: Option<Box<str>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub type_name: Option<Box<str>>,
    pub initial_value: Option<Box<str>>,
    pub initializer: Option<Initializer>,
    pub function_collection: Option<FunctionCollection>,
    pub collection_source: Option<CollectionSource>,
}

impl Default for VariableDef {
    fn default() -> Self {
        Self {
            type_name: None,
            initial_value: None,
            initializer: None,
            function_collection: None,
            collection_source: None,
        }
    }
}

/// How an import binds a local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Named,
    Default,
    Namespace,
    SideEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDef {
    pub import_kind: ImportKind,
    /// The module specifier as written (`"./users"`, `"pkg.mod"`).
    pub source_path: Box<str>,
    /// Original exported name when aliased (`import { a as b }`).
    pub original_name: Option<SymbolName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub members: Vec<SymbolName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDef {
    pub type_expression: Box<str>,
}

/// A named entity introduced by source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub symbol_id: SymbolId,
    pub name: SymbolName,
    /// The scope in which this name is visible to siblings. For a class this
    /// is the surrounding scope, never the class's own body scope.
    pub defining_scope_id: ScopeId,
    pub location: Location,
    pub doc: Option<Box<str>>,
    pub flags: DefinitionFlags,
    pub detail: DefinitionDetail,
}

impl Definition {
    pub fn new(
        kind: DefinitionKind,
        name: impl Into<SymbolName>,
        defining_scope_id: ScopeId,
        location: Location,
        detail: DefinitionDetail,
    ) -> Self {
        let name = name.into();
        let symbol_id = SymbolId::synthesize(kind.token(), name.as_str(), &location);
        Self {
            kind,
            symbol_id,
            name,
            defining_scope_id,
            location,
            doc: None,
            flags: DefinitionFlags::empty(),
            detail,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<Box<str>>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_flags(mut self, flags: DefinitionFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_exported(&self) -> bool {
        self.flags
            .intersects(DefinitionFlags::EXPORTED | DefinitionFlags::DEFAULT_EXPORT)
    }

    pub fn as_function(&self) -> Option<&FunctionDef> {
        match &self.detail {
            DefinitionDetail::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDef> {
        match &self.detail {
            DefinitionDetail::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceDef> {
        match &self.detail {
            DefinitionDetail::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableDef> {
        match &self.detail {
            DefinitionDetail::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_import(&self) -> Option<&ImportDef> {
        match &self.detail {
            DefinitionDetail::Import(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodDef> {
        match &self.detail {
            DefinitionDetail::Method(m) => Some(m),
            _ => None,
        }
    }

    /// Declared return type, for methods and functions.
    pub fn return_type(&self) -> Option<&str> {
        match &self.detail {
            DefinitionDetail::Function(f) => f.signature.return_type.as_deref(),
            DefinitionDetail::Method(m) => m.signature.return_type.as_deref(),
            _ => None,
        }
    }

    /// Body scope, when the definition has one.
    pub fn body_scope_id(&self) -> Option<&ScopeId> {
        match &self.detail {
            DefinitionDetail::Function(f) => Some(&f.body_scope_id),
            DefinitionDetail::Class(c) => Some(&c.body_scope_id),
            DefinitionDetail::Method(m) => m.body_scope_id.as_ref(),
            DefinitionDetail::Constructor(c) => c.body_scope_id.as_ref(),
            _ => None,
        }
    }
}

/// How a file exposes a name to importers. Produced per file by the
/// extractors; the ExportRegistry walks re-export hops across files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportEntry {
    /// A definition exported by this file.
    Local {
        name: SymbolName,
        symbol_id: SymbolId,
        is_default: bool,
    },
    /// `export { original as exported } from "source"` / `pub use`.
    Reexport {
        exported: SymbolName,
        original: SymbolName,
        source: Box<str>,
    },
    /// `export * from "source"`.
    ReexportAll { source: Box<str> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(sl: u32, sc: u32, el: u32, ec: u32) -> Location {
        Location::new("m.ts", sl, sc, el, ec)
    }

    fn scope() -> ScopeId {
        ScopeId::from("module:m.ts:1:1:9:1")
    }

    #[test]
    fn symbol_id_reflects_kind_and_range() {
        let def = Definition::new(
            DefinitionKind::Class,
            "Widget",
            scope(),
            loc(2, 1, 8, 2),
            DefinitionDetail::Class(ClassDef {
                extends: vec![],
                implements: vec![],
                methods: vec![],
                properties: vec![],
                constructors: vec![],
                decorators: vec![],
                body_scope_id: ScopeId::from("class:m.ts:2:14:8:2"),
            }),
        );
        assert_eq!(def.symbol_id.as_str(), "class:Widget:m.ts:2:1:8:2");
    }

    #[test]
    fn exported_covers_default_exports() {
        let def = Definition::new(
            DefinitionKind::Function,
            "main",
            scope(),
            loc(1, 1, 3, 2),
            DefinitionDetail::Function(FunctionDef {
                signature: Signature::default(),
                body_scope_id: ScopeId::from("function:m.ts:1:1:3:2"),
                decorators: vec![],
                callback_context: None,
                collection_source: None,
            }),
        )
        .with_flags(DefinitionFlags::DEFAULT_EXPORT);
        assert!(def.is_exported());
    }

    #[test]
    fn constant_kind_keeps_variable_payload() {
        let def = Definition::new(
            DefinitionKind::Constant,
            "LIMIT",
            scope(),
            loc(4, 1, 4, 16),
            DefinitionDetail::Variable(VariableDef {
                initial_value: Some("100".into()),
                ..VariableDef::default()
            }),
        )
        .with_flags(DefinitionFlags::CONSTANT);
        assert_eq!(def.kind, DefinitionKind::Constant);
        assert_eq!(
            def.as_variable().unwrap().initial_value.as_deref(),
            Some("100")
        );
    }

    #[test]
    fn return_type_comes_from_signature() {
        let def = Definition::new(
            DefinitionKind::Method,
            "area",
            scope(),
            loc(5, 3, 5, 30),
            DefinitionDetail::Method(MethodDef {
                signature: Signature {
                    parameters: vec![Parameter::new("scale").with_type("number")],
                    return_type: Some("number".into()),
                },
                body_scope_id: None,
                decorators: vec![],
            }),
        );
        assert_eq!(def.return_type(), Some("number"));
    }
}
