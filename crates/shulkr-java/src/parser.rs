//! Structural parser for Java compilation units.
//!
//! [`JavaParser`] parses source text with the tree-sitter Java grammar and
//! walks the syntax tree once, producing a [`SourceTree`] of scopes,
//! declarations, and bound usages.
//!
//! # Scopes
//!
//! - Methods and constructors open a scope holding their parameters; their
//!   body block is walked inline rather than as a nested block.
//! - Static and instance initializers, and field declarations with an
//!   initializer, open member-level scopes.
//! - Blocks, `for` and enhanced `for` statements, `catch` clauses,
//!   try-with-resources headers, and switch blocks open `Block` scopes.
//! - Lambdas open `Lambda` scopes.
//!
//! Class bodies (named, local, anonymous, enum constant bodies) contribute a
//! path segment but no scope. Their field names are pushed as a resolution
//! frame so they hide enclosing locals of the same name.
//!
//! # Resolution
//!
//! An identifier in expression position binds to the innermost visible local
//! declared before it. Anything else (fields, types used as qualifiers,
//! static imports) is recorded as a free reference. Method names, field
//! names after `.`, labels, and annotation contents are never references.

use std::collections::HashMap;

use shulkr_core::patch::Span;
use shulkr_core::text::{byte_offset_to_position_str, extract_span_str, line_at_offset, line_count};
use tracing::debug;
use tree_sitter::{Node, Parser};

use crate::error::AnalysisError;
use crate::tree::{
    DeclId, DeclarationKind, PathSegment, ScopeId, ScopeKind, SourceTree, StructuralPath,
    TreeBuilder,
};

/// Declared type recorded for lambda parameters without a written type.
pub const INFERRED_TYPE: &str = "<inferred>";

/// Deepest syntax nesting the walker follows before giving up on a file.
pub const MAX_NESTING: usize = 1000;

/// Turns source text into a [`SourceTree`].
///
/// Implementations must be deterministic and hold no state between calls.
pub trait StructuralParser {
    fn parse(&self, source: &str) -> Result<SourceTree, AnalysisError>;
}

/// The Java grammar front end.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaParser;

impl JavaParser {
    pub fn new() -> Self {
        JavaParser
    }
}

impl StructuralParser for JavaParser {
    fn parse(&self, source: &str) -> Result<SourceTree, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| {
                AnalysisError::parse_failure(format!("failed to load Java grammar: {}", e), None)
            })?;
        let syntax = parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::parse_failure("parser produced no syntax tree", None))?;

        let root = syntax.root_node();
        if root.has_error() {
            return Err(syntax_error(source, root));
        }

        let mut walker = Walker::new(source);
        walker.visit(root);
        let tree = walker.finish()?;
        debug!(
            lines = line_count(source),
            scopes = tree.scopes().len(),
            declarations = tree.declarations().len(),
            "parsed source tree"
        );
        Ok(tree)
    }
}

// ============================================================================
// Syntax errors
// ============================================================================

fn syntax_error(source: &str, root: Node<'_>) -> AnalysisError {
    let Some(node) = first_error(root) else {
        return AnalysisError::parse_failure("syntax error", None);
    };
    let location = byte_offset_to_position_str(source, node.start_byte());
    let problem = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text: String = extract_span_str(source, &span_of(node))
            .unwrap_or("")
            .chars()
            .take(32)
            .collect();
        format!("unexpected `{}`", text.trim())
    };
    let line = line_at_offset(source, node.start_byte()).trim();
    AnalysisError::parse_failure(format!("{} in `{}`", problem, line), Some(location))
}

/// First ERROR or MISSING node in source order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    None
}

// ============================================================================
// Node helpers
// ============================================================================

fn span_of(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    children
}

fn children_by_field<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children_by_field_name(field, &mut cursor).collect();
    children
}

/// All children, named or not, paired with their field name.
fn children_with_fields(node: Node<'_>) -> Vec<(Option<&'static str>, Node<'_>)> {
    let mut cursor = node.walk();
    let mut children = Vec::new();
    if cursor.goto_first_child() {
        loop {
            children.push((cursor.field_name(), cursor.node()));
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    children
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Collapse whitespace in type text, keeping a single space only between words.
///
/// `Map< String , int[] >` becomes `Map<String,int[]>`; `? extends T` keeps its spaces.
pub fn normalize_type(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && is_word_char(c) && out.chars().last().is_some_and(is_word_char) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

// ============================================================================
// Walker
// ============================================================================

/// Path-building context: the innermost scope or type body being walked.
struct PathContext {
    path: StructuralPath,
    /// Innermost enclosing scope; type bodies inherit it.
    scope: Option<ScopeId>,
    counters: HashMap<String, usize>,
}

impl PathContext {
    fn next_index(&mut self, key: String) -> usize {
        let counter = self.counters.entry(key).or_insert(0);
        let index = *counter;
        *counter += 1;
        index
    }
}

#[derive(Debug, Clone, Copy)]
enum Binding {
    Local(DeclId),
    Member,
}

#[derive(Default)]
struct Frame {
    bindings: Vec<(String, Binding)>,
}

struct Walker<'src> {
    source: &'src str,
    builder: TreeBuilder,
    contexts: Vec<PathContext>,
    frames: Vec<Frame>,
    depth: usize,
    /// Start of the first node nested deeper than [`MAX_NESTING`].
    too_deep: Option<usize>,
}

impl<'src> Walker<'src> {
    fn new(source: &'src str) -> Self {
        Walker {
            source,
            builder: TreeBuilder::new(),
            contexts: vec![PathContext {
                path: StructuralPath::root(),
                scope: None,
                counters: HashMap::new(),
            }],
            frames: vec![Frame::default()],
            depth: 0,
            too_deep: None,
        }
    }

    fn finish(self) -> Result<SourceTree, AnalysisError> {
        if let Some(offset) = self.too_deep {
            return Err(AnalysisError::parse_failure(
                format!("nesting deeper than {} levels", MAX_NESTING),
                Some(byte_offset_to_position_str(self.source, offset)),
            ));
        }
        Ok(self.builder.finish())
    }

    fn text(&self, node: Node<'_>) -> &'src str {
        extract_span_str(self.source, &span_of(node)).unwrap_or("")
    }

    fn type_text(&self, node: Node<'_>) -> String {
        normalize_type(self.text(node))
    }

    fn current_scope(&self) -> Option<ScopeId> {
        self.contexts.last().and_then(|ctx| ctx.scope)
    }

    fn next_index(&mut self, key: String) -> usize {
        match self.contexts.last_mut() {
            Some(ctx) => ctx.next_index(key),
            None => 0,
        }
    }

    fn current_path(&self) -> StructuralPath {
        self.contexts
            .last()
            .map(|ctx| ctx.path.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Scope and frame management
    // ------------------------------------------------------------------

    fn open_scope(&mut self, kind: ScopeKind, segment: PathSegment, span: Span) -> ScopeId {
        let path = self.current_path().child(segment);
        let parent = self.current_scope();
        let id = self.builder.add_scope(kind, path.clone(), span, parent);
        self.contexts.push(PathContext {
            path,
            scope: Some(id),
            counters: HashMap::new(),
        });
        self.frames.push(Frame::default());
        id
    }

    fn open_nested(&mut self, kind: ScopeKind, span: Span) -> ScopeId {
        let index = self.next_index(kind.as_str().to_string());
        self.open_scope(kind, PathSegment::Nested { kind, index }, span)
    }

    fn open_member(&mut self, kind: ScopeKind, signature: String, span: Span) -> ScopeId {
        let ordinal = self.next_index(format!("member:{}", signature));
        self.open_scope(
            kind,
            PathSegment::Member {
                kind,
                signature,
                ordinal,
            },
            span,
        )
    }

    fn close_scope(&mut self) {
        self.contexts.pop();
        self.frames.pop();
    }

    fn open_type(&mut self, segment: PathSegment, members: Vec<String>, body: Span) {
        let path = self.current_path().child(segment);
        let scope = self.current_scope();
        if scope.is_some() {
            for name in &members {
                self.builder.add_member_shadow(name.clone(), body);
            }
        }
        self.contexts.push(PathContext {
            path,
            scope,
            counters: HashMap::new(),
        });
        self.frames.push(Frame {
            bindings: members
                .into_iter()
                .map(|name| (name, Binding::Member))
                .collect(),
        });
    }

    fn close_type(&mut self) {
        self.contexts.pop();
        self.frames.pop();
    }

    fn lookup(&self, name: &str) -> Option<Binding> {
        self.frames.iter().rev().find_map(|frame| {
            frame
                .bindings
                .iter()
                .rev()
                .find(|(bound, _)| bound == name)
                .map(|(_, binding)| *binding)
        })
    }

    fn declare(&mut self, name_node: Node<'_>, declared_type: String, kind: DeclarationKind) {
        if name_node.kind() != "identifier" {
            return;
        }
        let Some(scope) = self.current_scope() else {
            return;
        };
        let name = self.text(name_node);
        let id = self
            .builder
            .declare(scope, name, declared_type, kind, span_of(name_node));
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.push((name.to_string(), Binding::Local(id)));
        }
    }

    fn reference(&mut self, node: Node<'_>) {
        let name = self.text(node);
        let scope = self.current_scope();
        match (self.lookup(name), scope) {
            (Some(Binding::Local(decl)), Some(scope)) => {
                self.builder.add_usage(decl, span_of(node), scope)
            }
            _ => self.builder.add_free_reference(name, span_of(node), scope),
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn visit(&mut self, node: Node<'_>) {
        if self.too_deep.is_some() {
            return;
        }
        if self.depth >= MAX_NESTING {
            self.too_deep = Some(node.start_byte());
            return;
        }
        self.depth += 1;
        self.dispatch(node);
        self.depth -= 1;
    }

    fn dispatch(&mut self, node: Node<'_>) {
        match node.kind() {
            "identifier" => self.reference(node),
            "package_declaration" | "import_declaration" | "module_declaration" | "modifiers"
            | "marker_annotation" | "annotation" | "line_comment" | "block_comment"
            | "type_arguments" | "type_parameters" | "scoped_identifier"
            | "break_statement" | "continue_statement" => {}
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => self.visit_type_declaration(node),
            "block" => {
                self.open_nested(ScopeKind::Block, span_of(node));
                self.visit_children(node);
                self.close_scope();
            }
            "local_variable_declaration" => {
                self.visit_variable_declaration(node, DeclarationKind::Local)
            }
            "for_statement" => self.visit_for(node),
            "enhanced_for_statement" => self.visit_enhanced_for(node),
            "catch_clause" => self.visit_catch(node),
            "try_with_resources_statement" => self.visit_try_with_resources(node),
            "switch_block" => {
                self.open_nested(ScopeKind::Block, span_of(node));
                self.visit_children(node);
                self.close_scope();
            }
            "lambda_expression" => self.visit_lambda(node),
            "instanceof_expression" => self.visit_instanceof(node),
            "type_pattern" | "record_pattern_component" => self.visit_pattern(node),
            "object_creation_expression" => self.visit_object_creation(node),
            "method_invocation" => self.visit_skipping_fields(node, &["name", "type_arguments"]),
            "field_access" => self.visit_skipping_fields(node, &["field"]),
            "cast_expression" | "array_creation_expression" => {
                self.visit_skipping_fields(node, &["type"])
            }
            "method_reference" => {
                // Only the receiver can be a reference; the rest names a method.
                if let Some(receiver) = named_children(node).into_iter().next() {
                    self.visit(receiver);
                }
            }
            "labeled_statement" => {
                for child in named_children(node).into_iter().skip(1) {
                    self.visit(child);
                }
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.visit(child);
        }
    }

    fn visit_skipping_fields(&mut self, node: Node<'_>, skipped: &[&str]) {
        for (field, child) in children_with_fields(node) {
            if !child.is_named() || field.is_some_and(|f| skipped.contains(&f)) {
                continue;
            }
            self.visit(child);
        }
    }

    /// Walk a body in the current scope: a block's statements are not wrapped
    /// in a nested block scope.
    fn visit_inline(&mut self, body: Node<'_>) {
        if body.kind() == "block" {
            self.visit_children(body);
        } else {
            self.visit(body);
        }
    }

    // ------------------------------------------------------------------
    // Types and members
    // ------------------------------------------------------------------

    fn visit_type_declaration(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let ordinal = self.next_index(format!("type:{}", name));
        let body = node.child_by_field_name("body");

        let mut members = Vec::new();
        if node.kind() == "record_declaration" {
            if let Some(components) = node.child_by_field_name("parameters") {
                for component in named_children(components) {
                    if let Some(component_name) = component.child_by_field_name("name") {
                        members.push(self.text(component_name).to_string());
                    }
                }
            }
        }
        if let Some(body) = body {
            members.extend(self.member_names(body));
        }

        let body_span = body.map(span_of).unwrap_or_else(|| span_of(node));
        self.open_type(PathSegment::Type { name, ordinal }, members, body_span);
        if let Some(body) = body {
            self.visit_type_body(body);
        }
        self.close_type();
    }

    /// Names of fields and enum constants declared directly in a type body.
    fn member_names(&self, body: Node<'_>) -> Vec<String> {
        let mut names = Vec::new();
        for child in named_children(body) {
            match child.kind() {
                "field_declaration" | "constant_declaration" => {
                    for declarator in children_by_field(child, "declarator") {
                        if let Some(name) = declarator.child_by_field_name("name") {
                            names.push(self.text(name).to_string());
                        }
                    }
                }
                "enum_constant" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        names.push(self.text(name).to_string());
                    }
                }
                "enum_body_declarations" => names.extend(self.member_names(child)),
                _ => {}
            }
        }
        names
    }

    fn visit_type_body(&mut self, body: Node<'_>) {
        for child in named_children(body) {
            match child.kind() {
                "method_declaration" => self.visit_method(child, ScopeKind::Method),
                "constructor_declaration" | "compact_constructor_declaration" => {
                    self.visit_method(child, ScopeKind::Constructor)
                }
                "static_initializer" => self.visit_initializer(child, "static{}"),
                "block" => self.visit_initializer(child, "{}"),
                "field_declaration" | "constant_declaration" => self.visit_field(child),
                "enum_constant" => self.visit_enum_constant(child),
                "enum_body_declarations" => self.visit_type_body(child),
                "class_declaration"
                | "interface_declaration"
                | "enum_declaration"
                | "record_declaration"
                | "annotation_type_declaration" => self.visit(child),
                _ => {}
            }
        }
    }

    fn visit_method(&mut self, node: Node<'_>, kind: ScopeKind) {
        let parameters = node.child_by_field_name("parameters");
        let types: Vec<String> = parameters
            .map(|params| {
                named_children(params)
                    .into_iter()
                    .filter_map(|param| self.parameter_type(param))
                    .collect()
            })
            .unwrap_or_default();
        let signature = match node.kind() {
            "compact_constructor_declaration" => "<init>(compact)".to_string(),
            "constructor_declaration" => format!("<init>({})", types.join(",")),
            _ => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or("");
                format!("{}({})", name, types.join(","))
            }
        };

        self.open_member(kind, signature, span_of(node));
        if let Some(params) = parameters {
            self.declare_parameters(params, DeclarationKind::Parameter);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body);
        }
        self.close_scope();
    }

    fn visit_initializer(&mut self, node: Node<'_>, signature: &str) {
        self.open_member(ScopeKind::Initializer, signature.to_string(), span_of(node));
        if node.kind() == "block" {
            self.visit_children(node);
        } else {
            for block in named_children(node) {
                if block.kind() == "block" {
                    self.visit_children(block);
                }
            }
        }
        self.close_scope();
    }

    fn visit_field(&mut self, node: Node<'_>) {
        let declarators = children_by_field(node, "declarator");
        if !declarators
            .iter()
            .any(|d| d.child_by_field_name("value").is_some())
        {
            return;
        }
        let names: Vec<&str> = declarators
            .iter()
            .filter_map(|d| d.child_by_field_name("name"))
            .map(|n| self.text(n))
            .collect();
        self.open_member(ScopeKind::Field, names.join(","), span_of(node));
        for declarator in declarators {
            if let Some(value) = declarator.child_by_field_name("value") {
                self.visit(value);
            }
        }
        self.close_scope();
    }

    fn visit_enum_constant(&mut self, node: Node<'_>) {
        if let Some(arguments) = node.child_by_field_name("arguments") {
            self.visit(arguments);
        }
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let ordinal = self.next_index(format!("type:{}", name));
        let members = self.member_names(body);
        self.open_type(PathSegment::Type { name, ordinal }, members, span_of(body));
        self.visit_type_body(body);
        self.close_type();
    }

    fn visit_object_creation(&mut self, node: Node<'_>) {
        for (field, child) in children_with_fields(node) {
            if !child.is_named() || matches!(field, Some("type") | Some("type_arguments")) {
                continue;
            }
            if child.kind() == "class_body" {
                let index = self.next_index("anonymous".to_string());
                let members = self.member_names(child);
                self.open_type(PathSegment::Anonymous(index), members, span_of(child));
                self.visit_type_body(child);
                self.close_type();
            } else {
                self.visit(child);
            }
        }
    }

    // ------------------------------------------------------------------
    // Parameters and declarations
    // ------------------------------------------------------------------

    /// Declared type of a `formal_parameter` or `spread_parameter`.
    fn parameter_type(&self, param: Node<'_>) -> Option<String> {
        match param.kind() {
            "formal_parameter" => {
                let ty = self.type_text(param.child_by_field_name("type")?);
                let dims = param
                    .child_by_field_name("dimensions")
                    .map(|d| self.type_text(d))
                    .unwrap_or_default();
                Some(format!("{}{}", ty, dims))
            }
            "spread_parameter" => {
                let ty = named_children(param).into_iter().find(|child| {
                    !matches!(
                        child.kind(),
                        "modifiers" | "variable_declarator" | "annotation" | "marker_annotation"
                    )
                })?;
                Some(format!("{}...", self.type_text(ty)))
            }
            _ => None,
        }
    }

    fn declare_parameters(&mut self, params: Node<'_>, kind: DeclarationKind) {
        for param in named_children(params) {
            let Some(declared_type) = self.parameter_type(param) else {
                continue;
            };
            let name = match param.kind() {
                "spread_parameter" => named_children(param)
                    .into_iter()
                    .find(|child| child.kind() == "variable_declarator")
                    .and_then(|declarator| declarator.child_by_field_name("name")),
                _ => param.child_by_field_name("name"),
            };
            if let Some(name) = name {
                self.declare(name, declared_type, kind);
            }
        }
    }

    fn visit_variable_declaration(&mut self, node: Node<'_>, kind: DeclarationKind) {
        let base_type = node
            .child_by_field_name("type")
            .map(|ty| self.type_text(ty))
            .unwrap_or_default();
        for declarator in children_by_field(node, "declarator") {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let dims = declarator
                .child_by_field_name("dimensions")
                .map(|d| self.type_text(d))
                .unwrap_or_default();
            self.declare(name, format!("{}{}", base_type, dims), kind);
            if let Some(value) = declarator.child_by_field_name("value") {
                self.visit(value);
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements opening scopes
    // ------------------------------------------------------------------

    fn visit_for(&mut self, node: Node<'_>) {
        self.open_nested(ScopeKind::Block, span_of(node));
        for (field, child) in children_with_fields(node) {
            if !child.is_named() {
                continue;
            }
            match field {
                Some("init") if child.kind() == "local_variable_declaration" => {
                    self.visit_variable_declaration(child, DeclarationKind::LoopVariable)
                }
                Some("body") => self.visit_inline(child),
                _ => self.visit(child),
            }
        }
        self.close_scope();
    }

    fn visit_enhanced_for(&mut self, node: Node<'_>) {
        self.open_nested(ScopeKind::Block, span_of(node));
        if let Some(value) = node.child_by_field_name("value") {
            self.visit(value);
        }
        if let (Some(ty), Some(name)) = (
            node.child_by_field_name("type"),
            node.child_by_field_name("name"),
        ) {
            let dims = node
                .child_by_field_name("dimensions")
                .map(|d| self.type_text(d))
                .unwrap_or_default();
            let declared_type = format!("{}{}", self.type_text(ty), dims);
            self.declare(name, declared_type, DeclarationKind::LoopVariable);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_inline(body);
        }
        self.close_scope();
    }

    fn visit_catch(&mut self, node: Node<'_>) {
        self.open_nested(ScopeKind::Block, span_of(node));
        for child in named_children(node) {
            if child.kind() != "catch_formal_parameter" {
                continue;
            }
            let declared_type = named_children(child)
                .into_iter()
                .find(|c| c.kind() == "catch_type")
                .map(|c| self.type_text(c))
                .unwrap_or_default();
            if let Some(name) = child.child_by_field_name("name") {
                self.declare(name, declared_type, DeclarationKind::CatchParameter);
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_inline(body);
        }
        self.close_scope();
    }

    fn visit_try_with_resources(&mut self, node: Node<'_>) {
        let body = node.child_by_field_name("body");
        let end = body.map_or(node.end_byte(), |b| b.end_byte());
        self.open_nested(ScopeKind::Block, Span::new(node.start_byte(), end));
        if let Some(resources) = node.child_by_field_name("resources") {
            for resource in named_children(resources) {
                self.visit_resource(resource);
            }
        }
        if let Some(body) = body {
            self.visit_inline(body);
        }
        self.close_scope();

        // Catch and finally clauses cannot see the resources.
        for child in named_children(node) {
            if matches!(child.kind(), "catch_clause" | "finally_clause") {
                self.visit(child);
            }
        }
    }

    fn visit_resource(&mut self, resource: Node<'_>) {
        match (
            resource.child_by_field_name("type"),
            resource.child_by_field_name("name"),
        ) {
            (Some(ty), Some(name)) => {
                let dims = resource
                    .child_by_field_name("dimensions")
                    .map(|d| self.type_text(d))
                    .unwrap_or_default();
                let declared_type = format!("{}{}", self.type_text(ty), dims);
                self.declare(name, declared_type, DeclarationKind::Resource);
                if let Some(value) = resource.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            _ => self.visit_children(resource),
        }
    }

    fn visit_lambda(&mut self, node: Node<'_>) {
        self.open_nested(ScopeKind::Lambda, span_of(node));
        if let Some(params) = node.child_by_field_name("parameters") {
            match params.kind() {
                "identifier" => {
                    self.declare(
                        params,
                        INFERRED_TYPE.to_string(),
                        DeclarationKind::LambdaParameter,
                    )
                }
                "inferred_parameters" => {
                    for param in named_children(params) {
                        self.declare(
                            param,
                            INFERRED_TYPE.to_string(),
                            DeclarationKind::LambdaParameter,
                        );
                    }
                }
                _ => self.declare_parameters(params, DeclarationKind::LambdaParameter),
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_inline(body);
        }
        self.close_scope();
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    fn visit_instanceof(&mut self, node: Node<'_>) {
        let right = node.child_by_field_name("right");
        for (field, child) in children_with_fields(node) {
            if !child.is_named() {
                continue;
            }
            match field {
                Some("left") | Some("pattern") => self.visit(child),
                Some("name") => {
                    let declared_type = right.map(|ty| self.type_text(ty)).unwrap_or_default();
                    self.declare(child, declared_type, DeclarationKind::Pattern);
                }
                Some("right") => {}
                _ if matches!(child.kind(), "type_pattern" | "record_pattern") => {
                    self.visit(child)
                }
                _ => {}
            }
        }
    }

    /// `Type name` inside a type pattern or record pattern component.
    fn visit_pattern(&mut self, node: Node<'_>) {
        let parts: Vec<Node<'_>> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() != "modifiers")
            .collect();
        match parts.as_slice() {
            [first, .., name] if name.kind() == "identifier" => {
                let type_text = self
                    .source
                    .get(first.start_byte()..node.end_byte().min(name.start_byte()))
                    .unwrap_or("");
                self.declare(*name, normalize_type(type_text), DeclarationKind::Pattern);
            }
            _ => {
                for part in parts {
                    self.visit(part);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
