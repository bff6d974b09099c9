//! Lexical scope model.
//!
//! Each file lowers to a `ScopeTree`: exactly one module root, strictly nested
//! children. Class scopes cover only the class body (the brace or colon
//! onward), so a class name is visible to its siblings, not to itself. A named
//! function expression's scope covers the whole expression including its own
//! name, so the function can self-refer.

use crate::types::{FilePath, Location, ScopeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What kind of construct opened a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    Method,
    Constructor,
    Block,
}

impl ScopeKind {
    /// Token used in scope id synthesis.
    pub fn token(self) -> &'static str {
        match self {
            ScopeKind::Module => "module",
            ScopeKind::Class => "class",
            ScopeKind::Function => "function",
            ScopeKind::Method => "method",
            ScopeKind::Constructor => "constructor",
            ScopeKind::Block => "block",
        }
    }

    /// Scopes that can act as the caller context of a call.
    pub fn is_callable_body(self) -> bool {
        matches!(
            self,
            ScopeKind::Function | ScopeKind::Method | ScopeKind::Constructor
        )
    }
}

/// One lexical scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent_id: Option<ScopeId>,
    pub child_ids: Vec<ScopeId>,
    pub location: Location,
}

/// The scope tree of a single file, in pre-order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTree {
    file_path: FilePath,
    root_id: ScopeId,
    scopes: IndexMap<ScopeId, Scope>,
}

impl ScopeTree {
    pub fn file_path(&self) -> &FilePath {
        &self.file_path
    }

    pub fn root_id(&self) -> &ScopeId {
        &self.root_id
    }

    pub fn get(&self, id: &ScopeId) -> Option<&Scope> {
        self.scopes.get(id)
    }

    pub fn contains(&self, id: &ScopeId) -> bool {
        self.scopes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Pre-order iteration (parents before children).
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.values()
    }

    /// The innermost scope whose range contains `location`.
    ///
    /// Falls back to the root for locations outside every child (the root
    /// covers the whole file).
    pub fn innermost_at(&self, location: &Location) -> &ScopeId {
        let mut current = &self.root_id;
        'descend: loop {
            let scope = &self.scopes[current];
            for child_id in &scope.child_ids {
                if self.scopes[child_id].location.contains(location) {
                    current = child_id;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// The scope in which a definition spanning `range` is visible to its
    /// siblings. Descent stops before a scope whose range equals `range`,
    /// which keeps a function declaration out of its own scope.
    pub fn defining_scope_for(&self, range: &Location) -> &ScopeId {
        let mut current = &self.root_id;
        'descend: loop {
            let scope = &self.scopes[current];
            for child_id in &scope.child_ids {
                if self.scopes[child_id].location.strictly_contains(range) {
                    current = child_id;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Walk from `id` towards the root, inclusive.
    pub fn ancestors<'a>(&'a self, id: &ScopeId) -> impl Iterator<Item = &'a Scope> {
        let mut current = self.scopes.get(id);
        std::iter::from_fn(move || {
            let scope = current?;
            current = scope.parent_id.as_ref().and_then(|p| self.scopes.get(p));
            Some(scope)
        })
    }

    /// Nearest enclosing scope (inclusive) matching a predicate.
    pub fn nearest(&self, id: &ScopeId, pred: impl Fn(&Scope) -> bool) -> Option<&Scope> {
        self.ancestors(id).find(|s| pred(s))
    }
}

/// Builds a `ScopeTree` from scope-opening constructs visited in pre-order.
///
/// The builder keeps a stack of open scopes; entering a scope pops everything
/// that does not contain it. Malformed trees therefore degrade to whatever
/// nesting the ranges support, never to an error.
pub struct ScopeBuilder {
    file_path: FilePath,
    root_id: ScopeId,
    scopes: IndexMap<ScopeId, Scope>,
    stack: Vec<ScopeId>,
}

impl ScopeBuilder {
    /// Start a tree with the module root covering the whole file.
    pub fn new(file_path: FilePath, file_lines: u32, file_end_column: u32) -> Self {
        let location = Location::new(
            file_path.clone(),
            1,
            1,
            file_lines.max(1),
            file_end_column.max(1),
        );
        let root_id = ScopeId::synthesize(ScopeKind::Module.token(), &location);
        let mut scopes = IndexMap::new();
        scopes.insert(
            root_id.clone(),
            Scope {
                id: root_id.clone(),
                kind: ScopeKind::Module,
                parent_id: None,
                child_ids: Vec::new(),
                location,
            },
        );
        Self {
            file_path,
            root_id: root_id.clone(),
            scopes,
            stack: vec![root_id],
        }
    }

    /// Open a scope of `kind` over `location`; returns its id.
    pub fn enter(&mut self, kind: ScopeKind, location: Location) -> ScopeId {
        while self.stack.len() > 1 {
            let top = self.stack.last().expect("stack keeps the root");
            if self.scopes[top].location.contains(&location) {
                break;
            }
            self.stack.pop();
        }
        let parent_id = self.stack.last().expect("stack keeps the root").clone();
        let id = ScopeId::synthesize(kind.token(), &location);
        if self.scopes.contains_key(&id) {
            // Identical construct ranges collapse to one scope.
            return id;
        }
        self.scopes.insert(
            id.clone(),
            Scope {
                id: id.clone(),
                kind,
                parent_id: Some(parent_id.clone()),
                child_ids: Vec::new(),
                location,
            },
        );
        self.scopes
            .get_mut(&parent_id)
            .expect("parent came from the stack")
            .child_ids
            .push(id.clone());
        self.stack.push(id.clone());
        id
    }

    pub fn root_id(&self) -> &ScopeId {
        &self.root_id
    }

    pub fn file_path(&self) -> &FilePath {
        &self.file_path
    }

    pub fn finish(self) -> ScopeTree {
        ScopeTree {
            file_path: self.file_path,
            root_id: self.root_id,
            scopes: self.scopes,
        }
    }
}
