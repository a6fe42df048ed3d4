//! Scope alignment between two revisions.
//!
//! Two scopes align if and only if their structural paths are identical.
//! Paths never contain local names, so renames leave alignment intact, while
//! added or removed blocks and changed signatures make the affected scopes
//! drop out of the result.

use crate::tree::{ScopeId, SourceTree, StructuralPath};

/// One old scope paired with the new scope at the same structural path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentPair {
    pub old: ScopeId,
    pub new: ScopeId,
}

/// The aligned scope pairs of two trees, in old-tree pre-order.
#[derive(Debug, Clone)]
pub struct Alignment<'t> {
    pub old_tree: &'t SourceTree,
    pub new_tree: &'t SourceTree,
    pairs: Vec<AlignmentPair>,
}

impl<'t> Alignment<'t> {
    pub fn pairs(&self) -> &[AlignmentPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Structural path shared by both scopes of a pair.
    pub fn path(&self, pair: &AlignmentPair) -> &'t StructuralPath {
        &self.old_tree.scope(pair.old).path
    }

    /// Old scopes with no counterpart in the new tree.
    pub fn unaligned_old(&self) -> usize {
        self.old_tree.scopes().len() - self.pairs.len()
    }

    /// New scopes with no counterpart in the old tree.
    pub fn unaligned_new(&self) -> usize {
        self.new_tree.scopes().len() - self.pairs.len()
    }
}

/// Pair every old scope with the new scope that has the same structural path.
pub fn align<'t>(old_tree: &'t SourceTree, new_tree: &'t SourceTree) -> Alignment<'t> {
    let pairs = old_tree
        .scopes()
        .iter()
        .filter_map(|old| {
            new_tree.scope_by_path(&old.path).map(|new| AlignmentPair {
                old: old.id,
                new: new.id,
            })
        })
        .collect();
    Alignment {
        old_tree,
        new_tree,
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{JavaParser, StructuralParser};

    fn parse(source: &str) -> SourceTree {
        JavaParser::new().parse(source).unwrap()
    }

    fn aligned_paths(alignment: &Alignment<'_>) -> Vec<String> {
        alignment
            .pairs()
            .iter()
            .map(|pair| alignment.path(pair).to_string())
            .collect()
    }

    #[test]
    fn identical_sources_align_fully() {
        let source = "class A { void run(int a) { if (a > 0) { int b = a; } } }";
        let old = parse(source);
        let new = parse(source);
        let alignment = align(&old, &new);
        assert_eq!(alignment.len(), 2);
        assert_eq!(alignment.unaligned_old(), 0);
        assert_eq!(alignment.unaligned_new(), 0);
    }

    #[test]
    fn renames_do_not_affect_alignment() {
        let old = parse("class A { void run(int a) { Runnable r = () -> System.out.println(a); } }");
        let new = parse("class A { void run(int x) { Runnable y = () -> System.out.println(x); } }");
        let alignment = align(&old, &new);
        assert_eq!(
            aligned_paths(&alignment),
            vec!["A/run(int)", "A/run(int)/lambda#0"]
        );
    }

    #[test]
    fn changed_signature_drops_scope() {
        let old = parse("class A { void run(int a) {} void stop() {} }");
        let new = parse("class A { void run(long a) {} void stop() {} }");
        let alignment = align(&old, &new);
        assert_eq!(aligned_paths(&alignment), vec!["A/stop()"]);
        assert_eq!(alignment.unaligned_old(), 1);
        assert_eq!(alignment.unaligned_new(), 1);
    }

    #[test]
    fn added_block_shifts_only_later_siblings() {
        let old = parse("class A { void run() { { int a; } { int b; } } }");
        let new = parse("class A { void run() { { int a; } { int c; } { int b; } } }");
        let alignment = align(&old, &new);
        // block#1 exists in both but holds different content; it still aligns.
        assert_eq!(
            aligned_paths(&alignment),
            vec!["A/run()", "A/run()/block#0", "A/run()/block#1"]
        );
        assert_eq!(alignment.unaligned_new(), 1);
    }
}
