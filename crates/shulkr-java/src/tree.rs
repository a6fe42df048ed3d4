//! Structural representation of one parsed revision.
//!
//! A [`SourceTree`] is an arena of [`Scope`]s and [`Declaration`]s built once
//! per analysis call by a [`TreeBuilder`]. Scopes are stored in pre-order, so a
//! scope's descendants always follow it. Every scope carries a
//! [`StructuralPath`]: a name-independent key built from member signatures and
//! sibling positions, unique within its tree and used to align the two
//! revisions.
//!
//! Identifier occurrences come in two flavors:
//! - **Usages** bound to exactly one local declaration (the innermost visible one)
//! - **Free references** that resolve to no local (fields, types, static imports).
//!   They are never rewritten but take part in capture checking.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use shulkr_core::patch::Span;

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a scope within its [`SourceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub u32);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// Index of a declaration within its [`SourceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(pub u32);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl_{}", self.0)
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// What introduced a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKind {
    /// Method declaration (parameters and body).
    Method,
    /// Constructor, including compact record constructors.
    Constructor,
    /// Static or instance initializer block.
    Initializer,
    /// Field initializer; hosts lambdas and anonymous classes.
    Field,
    /// Nested block, `for` header, `catch` clause, resource list, switch block.
    Block,
    /// Lambda expression.
    Lambda,
}

impl ScopeKind {
    /// Returns the string representation used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Method => "method",
            ScopeKind::Constructor => "constructor",
            ScopeKind::Initializer => "initializer",
            ScopeKind::Field => "field",
            ScopeKind::Block => "block",
            ScopeKind::Lambda => "lambda",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What introduced a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Parameter,
    Local,
    LambdaParameter,
    CatchParameter,
    Resource,
    /// `instanceof` or switch pattern variable.
    Pattern,
    /// Variable declared in a `for` or enhanced `for` header.
    LoopVariable,
}

// ============================================================================
// Structural Paths
// ============================================================================

/// One step of a [`StructuralPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Named type declaration; `ordinal` separates same-named siblings.
    Type { name: String, ordinal: usize },
    /// Anonymous class body, by position among anonymous siblings.
    Anonymous(usize),
    /// Member scope keyed by its signature, e.g. `run(int,String[])`.
    Member {
        kind: ScopeKind,
        signature: String,
        ordinal: usize,
    },
    /// Nested scope, by position among siblings of the same kind.
    Nested { kind: ScopeKind, index: usize },
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Type { name, ordinal: 0 } => write!(f, "{}", name),
            PathSegment::Type { name, ordinal } => write!(f, "{}#{}", name, ordinal),
            PathSegment::Anonymous(index) => write!(f, "new#{}", index),
            PathSegment::Member {
                signature,
                ordinal: 0,
                ..
            } => write!(f, "{}", signature),
            PathSegment::Member {
                signature, ordinal, ..
            } => write!(f, "{}#{}", signature, ordinal),
            PathSegment::Nested { kind, index } => write!(f, "{}#{}", kind, index),
        }
    }
}

/// Name-independent position of a scope within its compilation unit.
///
/// Renders as the `/`-joined segments: `Outer/run(int,String[])/block#0/lambda#1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructuralPath(Vec<PathSegment>);

impl StructuralPath {
    pub fn root() -> Self {
        StructuralPath(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        StructuralPath(segments)
    }

    /// Segments of `self` below `ancestor`, or `None` if `ancestor` is not a prefix.
    pub fn relative_to(&self, ancestor: &StructuralPath) -> Option<&[PathSegment]> {
        self.0.strip_prefix(ancestor.0.as_slice())
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for StructuralPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Vec<PathSegment>> for StructuralPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        StructuralPath(segments)
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A lexical region establishing visibility for local declarations.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub path: StructuralPath,
    /// Byte range the scope's declarations are visible in (at most).
    pub span: Span,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Owned declarations in declaration order.
    pub declarations: Vec<DeclId>,
}

/// A local variable or parameter.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclId,
    /// Owning scope.
    pub scope: ScopeId,
    /// Position among the owning scope's declarations.
    pub index: usize,
    pub name: String,
    /// Whitespace-normalized type text, e.g. `int`, `String[]`, `var`.
    pub declared_type: String,
    pub kind: DeclarationKind,
    pub name_span: Span,
    /// References bound to this declaration, in source order.
    pub usages: Vec<Usage>,
}

impl Declaration {
    /// Declaration site followed by every usage, in source order.
    pub fn occurrences(&self) -> impl Iterator<Item = Occurrence> + '_ {
        std::iter::once(Occurrence {
            span: self.name_span,
            scope: self.scope,
        })
        .chain(self.usages.iter().map(|usage| Occurrence {
            span: usage.span,
            scope: usage.scope,
        }))
    }
}

/// An identifier reference bound to one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub span: Span,
    /// Innermost scope containing the reference.
    pub scope: ScopeId,
}

/// Any identifier occurrence of a declaration, including its declaration site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub span: Span,
    pub scope: ScopeId,
}

/// An identifier that resolved to no local declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeReference {
    pub name: String,
    pub span: Span,
    pub scope: Option<ScopeId>,
}

/// A class body region where a member name hides enclosing locals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberShadow {
    pub name: String,
    pub span: Span,
}

// ============================================================================
// SourceTree
// ============================================================================

/// Parsed structure of one revision. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    scopes: Vec<Scope>,
    declarations: Vec<Declaration>,
    free_references: Vec<FreeReference>,
    member_shadows: Vec<MemberShadow>,
    by_path: BTreeMap<StructuralPath, ScopeId>,
    /// Start offsets of every bound occurrence, sorted.
    occurrence_offsets: Vec<usize>,
}

impl SourceTree {
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declaration(&self, id: DeclId) -> &Declaration {
        &self.declarations[id.0 as usize]
    }

    pub fn free_references(&self) -> &[FreeReference] {
        &self.free_references
    }

    pub fn member_shadows(&self) -> &[MemberShadow] {
        &self.member_shadows
    }

    pub fn scope_by_path(&self, path: &StructuralPath) -> Option<&Scope> {
        self.by_path.get(path).map(|id| self.scope(*id))
    }

    /// Declarations owned by `scope`, in declaration order.
    pub fn declarations_in(&self, scope: ScopeId) -> impl Iterator<Item = &Declaration> + '_ {
        self.scope(scope)
            .declarations
            .iter()
            .map(|id| self.declaration(*id))
    }

    /// Number of bound occurrences starting inside `span` before `offset`.
    pub fn occurrence_ordinal(&self, span: Span, offset: usize) -> usize {
        let lo = self.occurrence_offsets.partition_point(|&o| o < span.start);
        let hi = self
            .occurrence_offsets
            .partition_point(|&o| o < offset.min(span.end));
        hi.saturating_sub(lo)
    }

    /// Region where a declaration's name is visible: from its name to the end of its scope.
    pub fn visibility(&self, decl: DeclId) -> Span {
        let decl = self.declaration(decl);
        Span::new(decl.name_span.start, self.scope(decl.scope).span.end)
    }
}

// ============================================================================
// TreeBuilder
// ============================================================================

/// Incremental constructor for a [`SourceTree`].
///
/// Scopes must be opened in source order (pre-order), which the parser's
/// walk guarantees.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: SourceTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a scope under `parent` and return its id.
    pub fn add_scope(
        &mut self,
        kind: ScopeKind,
        path: StructuralPath,
        span: Span,
        parent: Option<ScopeId>,
    ) -> ScopeId {
        let id = ScopeId(self.tree.scopes.len() as u32);
        if let Some(parent) = parent {
            self.tree.scopes[parent.0 as usize].children.push(id);
        }
        debug_assert!(
            !self.tree.by_path.contains_key(&path),
            "duplicate structural path {}",
            path
        );
        self.tree.by_path.insert(path.clone(), id);
        self.tree.scopes.push(Scope {
            id,
            kind,
            path,
            span,
            parent,
            children: Vec::new(),
            declarations: Vec::new(),
        });
        id
    }

    /// Record a declaration owned by `scope`.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        declared_type: impl Into<String>,
        kind: DeclarationKind,
        name_span: Span,
    ) -> DeclId {
        let id = DeclId(self.tree.declarations.len() as u32);
        let owner = &mut self.tree.scopes[scope.0 as usize];
        let index = owner.declarations.len();
        owner.declarations.push(id);
        self.tree.declarations.push(Declaration {
            id,
            scope,
            index,
            name: name.into(),
            declared_type: declared_type.into(),
            kind,
            name_span,
            usages: Vec::new(),
        });
        id
    }

    /// Bind a reference at `span` to `decl`.
    pub fn add_usage(&mut self, decl: DeclId, span: Span, scope: ScopeId) {
        self.tree.declarations[decl.0 as usize]
            .usages
            .push(Usage { span, scope });
    }

    pub fn add_free_reference(
        &mut self,
        name: impl Into<String>,
        span: Span,
        scope: Option<ScopeId>,
    ) {
        self.tree.free_references.push(FreeReference {
            name: name.into(),
            span,
            scope,
        });
    }

    pub fn add_member_shadow(&mut self, name: impl Into<String>, span: Span) {
        self.tree.member_shadows.push(MemberShadow {
            name: name.into(),
            span,
        });
    }

    pub fn finish(mut self) -> SourceTree {
        let mut offsets: Vec<usize> = self
            .tree
            .declarations
            .iter()
            .flat_map(|decl| decl.occurrences().map(|o| o.span.start))
            .collect();
        offsets.sort_unstable();
        self.tree.occurrence_offsets = offsets;
        self.tree
    }
}

// ============================================================================
// Tests
// ============================================================================
