//! Reference model.
//!
//! A `Reference` is any textual use of a name: a call, a read or write, a
//! property access, a type mention, or an assignment. The payload is a closed
//! discriminated union; Phase 2 dispatch over it is exhaustive by
//! construction.

use crate::types::{Location, ScopeId, SymbolId, SymbolName};
use serde::{Deserialize, Serialize};

/// Receiver keyword of a self-reference call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfKeyword {
    This,
    SelfParam,
    Super,
    Cls,
}

impl SelfKeyword {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "this" => Some(SelfKeyword::This),
            "self" => Some(SelfKeyword::SelfParam),
            "super" => Some(SelfKeyword::Super),
            "cls" => Some(SelfKeyword::Cls),
            _ => None,
        }
    }
}

/// Read or write access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Read,
    Write,
}

/// Property access flavor: dotted member or index expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAccessKind {
    Property,
    Index,
}

/// Syntactic position of a type mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeContext {
    Annotation,
    Extends,
    Implements,
    Generic,
    Return,
}

/// Payload per reference kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceDetail {
    /// `this.m()`, `self.helper()`, `super.init()`, `cls.create()`.
    SelfReferenceCall {
        keyword: SelfKeyword,
        /// Chain after the keyword, terminal method included.
        property_chain: Vec<SymbolName>,
    },
    /// A call whose callee is a member access; the chain is fully rooted
    /// including the terminal method. An empty chain means extraction hit a
    /// dynamic root and aborted.
    MethodCall {
        receiver_location: Location,
        property_chain: Vec<SymbolName>,
        optional_chaining: bool,
    },
    /// A bare-identifier call. Some languages cannot distinguish calls from
    /// constructions syntactically; the target of a surrounding binding is
    /// recorded so Phase 2 can rewrite.
    FunctionCall {
        potential_construct_target: Option<Location>,
    },
    /// `new C(...)` and struct-literal construction.
    ConstructorCall { construct_target: Option<Location> },
    /// A bare identifier read or written.
    VariableReference { access_type: AccessType },
    /// Member or index access that is not a call.
    PropertyAccess {
        receiver_location: Location,
        property_chain: Vec<SymbolName>,
        access_type: PropertyAccessKind,
        is_optional_chain: bool,
    },
    /// A name used in type position.
    TypeReference {
        type_context: TypeContext,
        type_info: Option<Box<str>>,
    },
    /// An assignment statement/expression, pointing at its target.
    Assignment {
        target_location: Location,
        assignment_type: Option<Box<str>>,
    },
}

impl ReferenceDetail {
    /// Short tag, mainly for logs.
    pub fn kind_token(&self) -> &'static str {
        match self {
            ReferenceDetail::SelfReferenceCall { .. } => "self_reference_call",
            ReferenceDetail::MethodCall { .. } => "method_call",
            ReferenceDetail::FunctionCall { .. } => "function_call",
            ReferenceDetail::ConstructorCall { .. } => "constructor_call",
            ReferenceDetail::VariableReference { .. } => "variable_reference",
            ReferenceDetail::PropertyAccess { .. } => "property_access",
            ReferenceDetail::TypeReference { .. } => "type_reference",
            ReferenceDetail::Assignment { .. } => "assignment",
        }
    }
}

/// One textual use of a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub name: SymbolName,
    pub location: Location,
    pub scope_id: ScopeId,
    pub detail: ReferenceDetail,
}

impl Reference {
    pub fn new(
        name: impl Into<SymbolName>,
        location: Location,
        scope_id: ScopeId,
        detail: ReferenceDetail,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            scope_id,
            detail,
        }
    }
}

/// Kind of a resolved call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Function,
    Method,
    Constructor,
}

/// Why a resolution candidate was included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    Direct,
    InterfaceImplementation,
    CollectionDispatch,
    NamespaceImport,
    DefaultConstructor,
    CallbackInvocation,
}

/// One candidate target of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub symbol_id: SymbolId,
    pub confidence: f32,
    pub reason: ResolutionReason,
}

impl Resolution {
    pub fn direct(symbol_id: SymbolId) -> Self {
        Self {
            symbol_id,
            confidence: 1.0,
            reason: ResolutionReason::Direct,
        }
    }

    pub fn with_reason(symbol_id: SymbolId, confidence: f32, reason: ResolutionReason) -> Self {
        Self {
            symbol_id,
            confidence,
            reason,
        }
    }
}

/// A call reference after Phase 2: the call site plus every candidate target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallReference {
    pub location: Location,
    pub name: SymbolName,
    pub scope_id: ScopeId,
    pub call_type: CallType,
    pub resolutions: Vec<Resolution>,
    /// Nearest enclosing function/method/constructor body scope; the module
    /// root for top-level calls.
    pub caller_scope_id: ScopeId,
    pub is_callback_invocation: bool,
}

impl CallReference {
    pub fn is_resolved(&self) -> bool {
        !self.resolutions.is_empty()
    }

    pub fn resolution_ids(&self) -> impl Iterator<Item = &SymbolId> {
        self.resolutions.iter().map(|r| &r.symbol_id)
    }
}

/// Why a function is considered reached without a direct call edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReachabilityReason {
    /// Its containing collection was read.
    CollectionRead {
        collection_id: SymbolId,
        read_location: Location,
    },
    /// Its value was read somewhere other than its definition site.
    FunctionReference { read_location: Location },
}

/// One indirectly reachable function, keyed by the read-site file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityEntry {
    pub symbol_id: SymbolId,
    pub reason: ReachabilityReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn loc() -> Location {
        Location::new("a.js", 3, 1, 3, 20)
    }

    #[test]
    fn self_keyword_parsing() {
        assert_eq!(SelfKeyword::parse("this"), Some(SelfKeyword::This));
        assert_eq!(SelfKeyword::parse("cls"), Some(SelfKeyword::Cls));
        assert_eq!(SelfKeyword::parse("that"), None);
    }

    #[test]
    fn kind_tokens_cover_every_variant() {
        let details = [
            ReferenceDetail::SelfReferenceCall {
                keyword: SelfKeyword::This,
                property_chain: vec![],
            },
            ReferenceDetail::MethodCall {
                receiver_location: loc(),
                property_chain: vec![],
                optional_chaining: false,
            },
            ReferenceDetail::FunctionCall {
                potential_construct_target: None,
            },
            ReferenceDetail::ConstructorCall {
                construct_target: None,
            },
            ReferenceDetail::VariableReference {
                access_type: AccessType::Read,
            },
            ReferenceDetail::PropertyAccess {
                receiver_location: loc(),
                property_chain: vec![],
                access_type: PropertyAccessKind::Index,
                is_optional_chain: false,
            },
            ReferenceDetail::TypeReference {
                type_context: TypeContext::Annotation,
                type_info: None,
            },
            ReferenceDetail::Assignment {
                target_location: loc(),
                assignment_type: None,
            },
        ];
        let tokens: std::collections::HashSet<_> =
            details.iter().map(|d| d.kind_token()).collect();
        assert_eq!(tokens.len(), details.len());
    }

    #[test]
    fn call_reference_resolution_state() {
        let call = CallReference {
            location: loc(),
            name: SymbolName::from("render"),
            scope_id: ScopeId::from("module:a.js:1:1:9:1"),
            call_type: CallType::Method,
            resolutions: vec![Resolution::direct(SymbolId::from(
                "method:render:a.js:5:3:7:4",
            ))],
            caller_scope_id: ScopeId::from("module:a.js:1:1:9:1"),
            is_callback_invocation: false,
        };
        assert!(call.is_resolved());
        assert_eq!(call.resolution_ids().count(), 1);
    }
}
