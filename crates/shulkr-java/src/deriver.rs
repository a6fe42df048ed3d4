//! Rename derivation over aligned scope pairs.
//!
//! For every aligned pair the deriver matches old declarations to new ones
//! and records `old -> new` for each matched pair whose names differ:
//!
//! 1. Declaration counts and declared-type multisets must agree, otherwise the
//!    scope is a [`StructuralMismatch`](AnalysisErrorKind::StructuralMismatch).
//! 2. Declarations are partitioned by declared type. A partition of one is
//!    matched immediately.
//! 3. Larger partitions are matched by declaration order, and each
//!    order-matched pair must be corroborated by its occurrence fingerprint:
//!    it has to be the strictly best match in both its row and its column.
//!    Otherwise the scope is an
//!    [`AmbiguousMapping`](AnalysisErrorKind::AmbiguousMapping).
//!
//! A failing scope contributes no entries; other scopes are unaffected.
//!
//! After per-scope derivation a capture check simulates name resolution in
//! the new tree with the reverted names. Any scope whose reverted names would
//! rebind an occurrence (to another local, away from a field, or onto a free
//! reference) is withdrawn and reported as ambiguous. The check repeats until
//! no capture remains.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use shulkr_core::error::AnalysisErrorKind;
use shulkr_core::output::ScopeFailureInfo;
use tracing::debug;

use crate::aligner::{Alignment, AlignmentPair};
use crate::error::AnalysisError;
use crate::mapping::{RenameMapping, ScopeRenames};
use crate::tree::{DeclId, Declaration, PathSegment, SourceTree, StructuralPath};

// ============================================================================
// Results
// ============================================================================

/// A scope that contributed no mapping entries because matching was unsafe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFailure {
    pub kind: AnalysisErrorKind,
    pub path: StructuralPath,
    pub message: String,
}

impl ScopeFailure {
    fn new(kind: AnalysisErrorKind, path: &StructuralPath, message: impl Into<String>) -> Self {
        ScopeFailure {
            kind,
            path: path.clone(),
            message: message.into(),
        }
    }

    pub fn to_error(&self) -> AnalysisError {
        AnalysisError::new(self.kind, self.message.clone()).in_scope(&self.path)
    }

    pub fn to_info(&self) -> ScopeFailureInfo {
        ScopeFailureInfo {
            kind: self.kind,
            scope: Some(self.path.to_string()),
            message: self.message.clone(),
        }
    }
}

/// Output of [`derive`].
#[derive(Debug, Clone, Default)]
pub struct Derivation {
    pub mapping: RenameMapping,
    /// One entry per failed scope, in alignment order (capture withdrawals last).
    pub failures: Vec<ScopeFailure>,
    /// Aligned pairs holding at least one declaration on either side.
    pub considered_scopes: usize,
    /// Declarations matched across the two revisions, renamed or not.
    pub matched_declarations: usize,
}

impl Derivation {
    /// True when every considered scope failed.
    pub fn all_failed(&self) -> bool {
        self.considered_scopes > 0 && self.failures.len() >= self.considered_scopes
    }
}

// ============================================================================
// Fingerprints
// ============================================================================

/// How closely two occurrence fingerprints agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchLevel {
    None,
    /// Same number of occurrences in the same relative scopes.
    Shape,
    /// Identical fingerprints.
    Exact,
}

/// Occurrences of one declaration, declaration site first. Each entry is the
/// ordinal among all bound occurrences inside the owning scope, and the path
/// from the owning scope to the scope holding the occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint(Vec<(usize, Vec<PathSegment>)>);

impl Fingerprint {
    fn of(tree: &SourceTree, decl: &Declaration) -> Self {
        let owner = tree.scope(decl.scope);
        Fingerprint(
            decl.occurrences()
                .map(|occurrence| {
                    let ordinal = tree.occurrence_ordinal(owner.span, occurrence.span.start);
                    let relative = tree
                        .scope(occurrence.scope)
                        .path
                        .relative_to(&owner.path)
                        .map(<[PathSegment]>::to_vec)
                        .unwrap_or_default();
                    (ordinal, relative)
                })
                .collect(),
        )
    }

    fn compare(&self, other: &Fingerprint) -> MatchLevel {
        if self == other {
            MatchLevel::Exact
        } else if self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| a.1 == b.1)
        {
            MatchLevel::Shape
        } else {
            MatchLevel::None
        }
    }
}

// ============================================================================
// Per-scope matching
// ============================================================================

/// Match the declarations of one aligned pair, returning `(old, new)` ids.
fn match_scope(
    alignment: &Alignment<'_>,
    pair: &AlignmentPair,
) -> Result<Vec<(DeclId, DeclId)>, ScopeFailure> {
    let path = alignment.path(pair);
    let old_decls: Vec<&Declaration> = alignment.old_tree.declarations_in(pair.old).collect();
    let new_decls: Vec<&Declaration> = alignment.new_tree.declarations_in(pair.new).collect();

    if old_decls.len() != new_decls.len() {
        return Err(ScopeFailure::new(
            AnalysisErrorKind::StructuralMismatch,
            path,
            format!(
                "declaration count differs: {} in old revision, {} in new",
                old_decls.len(),
                new_decls.len()
            ),
        ));
    }

    let mut old_types: Vec<&str> = old_decls.iter().map(|d| d.declared_type.as_str()).collect();
    let mut new_types: Vec<&str> = new_decls.iter().map(|d| d.declared_type.as_str()).collect();
    old_types.sort_unstable();
    new_types.sort_unstable();
    if old_types != new_types {
        return Err(ScopeFailure::new(
            AnalysisErrorKind::StructuralMismatch,
            path,
            format!(
                "declared types differ: [{}] in old revision, [{}] in new",
                old_types.join(", "),
                new_types.join(", ")
            ),
        ));
    }

    let mut partitions: BTreeMap<&str, (Vec<&Declaration>, Vec<&Declaration>)> = BTreeMap::new();
    for decl in &old_decls {
        partitions
            .entry(decl.declared_type.as_str())
            .or_default()
            .0
            .push(*decl);
    }
    for decl in &new_decls {
        partitions
            .entry(decl.declared_type.as_str())
            .or_default()
            .1
            .push(*decl);
    }

    let mut matches = Vec::with_capacity(old_decls.len());
    for (declared_type, (olds, news)) in partitions {
        if olds.len() == 1 {
            matches.push((olds[0].id, news[0].id));
            continue;
        }
        let old_prints: Vec<Fingerprint> = olds
            .iter()
            .map(|d| Fingerprint::of(alignment.old_tree, d))
            .collect();
        let new_prints: Vec<Fingerprint> = news
            .iter()
            .map(|d| Fingerprint::of(alignment.new_tree, d))
            .collect();

        for i in 0..olds.len() {
            let diagonal = old_prints[i].compare(&new_prints[i]);
            let contested = (0..olds.len()).filter(|&j| j != i).any(|j| {
                old_prints[i].compare(&new_prints[j]) >= diagonal
                    || old_prints[j].compare(&new_prints[i]) >= diagonal
            });
            if diagonal == MatchLevel::None || contested {
                return Err(ScopeFailure::new(
                    AnalysisErrorKind::AmbiguousMapping,
                    path,
                    format!(
                        "cannot tell {} `{}` declarations apart: `{}` in old revision vs `{}` in new",
                        olds.len(),
                        declared_type,
                        olds[i].name,
                        news[i].name
                    ),
                ));
            }
            matches.push((olds[i].id, news[i].id));
        }
    }
    Ok(matches)
}

/// Turn matched declarations into the scope's renames.
fn renames_for(
    alignment: &Alignment<'_>,
    path: &StructuralPath,
    matches: &[(DeclId, DeclId)],
) -> Result<ScopeRenames, ScopeFailure> {
    let mut renames = ScopeRenames::new();
    let mut kept: BTreeSet<&str> = BTreeSet::new();
    for &(old_id, new_id) in matches {
        let old = alignment.old_tree.declaration(old_id);
        let new = alignment.new_tree.declaration(new_id);
        if old.name == new.name {
            kept.insert(new.name.as_str());
            continue;
        }
        if !renames.insert(&old.name, &new.name) {
            return Err(ScopeFailure::new(
                AnalysisErrorKind::AmbiguousMapping,
                path,
                format!(
                    "`{}` -> `{}` conflicts with another rename in the same scope",
                    old.name, new.name
                ),
            ));
        }
    }
    if let Some(name) = kept.iter().find(|name| renames.old_name_for(name).is_some()) {
        return Err(ScopeFailure::new(
            AnalysisErrorKind::AmbiguousMapping,
            path,
            format!("`{}` names both a renamed and an unchanged declaration", name),
        ));
    }
    Ok(renames)
}

// ============================================================================
// Derivation
// ============================================================================

/// Derive the rename mapping for all aligned scope pairs.
pub fn derive(alignment: &Alignment<'_>) -> Derivation {
    let mut derivation = Derivation::default();

    for pair in alignment.pairs() {
        let path = alignment.path(pair);
        let has_declarations = !alignment.old_tree.scope(pair.old).declarations.is_empty()
            || !alignment.new_tree.scope(pair.new).declarations.is_empty();
        if !has_declarations {
            continue;
        }
        derivation.considered_scopes += 1;

        let result = match_scope(alignment, pair).and_then(|matches| {
            derivation.matched_declarations += matches.len();
            renames_for(alignment, path, &matches)
        });
        match result {
            Ok(renames) => {
                if !renames.is_empty() {
                    debug!(scope = %path, renames = renames.len(), "derived renames");
                }
                derivation.mapping.insert_scope(path.clone(), renames);
            }
            Err(failure) => {
                debug!(scope = %path, kind = %failure.kind, "{}", failure.message);
                derivation.failures.push(failure);
            }
        }
    }

    withdraw_captures(alignment.new_tree, &mut derivation);
    derivation
}

// ============================================================================
// Capture check
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Local(DeclId),
    Member,
    Unbound,
}

/// Resolve `name` at `offset` by lexical visibility, naming declarations with `name_of`.
fn simulate<'a>(
    tree: &SourceTree,
    candidates: &[DeclId],
    name: &str,
    offset: usize,
    name_of: &impl Fn(DeclId) -> &'a str,
) -> Resolution {
    let mut best: Option<(usize, Resolution)> = None;
    let mut consider = |start: usize, resolution: Resolution| {
        match best {
            Some((best_start, _)) if best_start >= start => {}
            _ => best = Some((start, resolution)),
        }
    };
    for &id in candidates {
        if name_of(id) == name && tree.visibility(id).contains_offset(offset) {
            consider(tree.declaration(id).name_span.start, Resolution::Local(id));
        }
    }
    for shadow in tree.member_shadows() {
        if shadow.name == name && shadow.span.contains_offset(offset) {
            consider(shadow.span.start, Resolution::Member);
        }
    }
    best.map_or(Resolution::Unbound, |(_, resolution)| resolution)
}

fn withdraw_captures(tree: &SourceTree, derivation: &mut Derivation) {
    loop {
        let final_names: Vec<&str> = tree
            .declarations()
            .iter()
            .map(|decl| {
                derivation
                    .mapping
                    .old_name_for(&tree.scope(decl.scope).path, &decl.name)
                    .unwrap_or(decl.name.as_str())
            })
            .collect();
        let current_name = |id: DeclId| tree.declaration(id).name.as_str();
        let final_name = |id: DeclId| final_names[id.0 as usize];

        let mut by_name: HashMap<&str, Vec<DeclId>> = HashMap::new();
        for decl in tree.declarations() {
            by_name.entry(decl.name.as_str()).or_default().push(decl.id);
            let reverted = final_names[decl.id.0 as usize];
            if reverted != decl.name {
                by_name.entry(reverted).or_default().push(decl.id);
            }
        }

        let targets: BTreeSet<&str> = tree
            .declarations()
            .iter()
            .filter(|decl| final_names[decl.id.0 as usize] != decl.name)
            .map(|decl| final_names[decl.id.0 as usize])
            .collect();

        let mut culprits: BTreeSet<DeclId> = BTreeSet::new();
        let mut offending: Option<(String, usize)> = None;
        for &target in &targets {
            let candidates = by_name.get(target).map(Vec::as_slice).unwrap_or_default();

            // Occurrences that read `target` once the mapping is applied.
            let mut checks: Vec<(usize, Option<DeclId>, &str)> = Vec::new();
            for &id in candidates {
                if final_name(id) != target {
                    continue;
                }
                let decl = tree.declaration(id);
                for occurrence in decl.occurrences() {
                    checks.push((occurrence.span.start, Some(id), decl.name.as_str()));
                }
            }
            for free in tree.free_references() {
                if free.name == target {
                    checks.push((free.span.start, None, free.name.as_str()));
                }
            }

            for (offset, owner, written) in checks {
                let before = match owner {
                    Some(_) => {
                        let same_written = by_name
                            .get(written)
                            .map(Vec::as_slice)
                            .unwrap_or_default();
                        simulate(tree, same_written, written, offset, &current_name)
                    }
                    None => simulate(tree, candidates, target, offset, &current_name),
                };
                let after = simulate(tree, candidates, target, offset, &final_name);
                if before == after {
                    continue;
                }
                for resolution in [before, after] {
                    if let Resolution::Local(id) = resolution {
                        culprits.insert(id);
                    }
                }
                if let Some(id) = owner {
                    culprits.insert(id);
                }
                offending.get_or_insert((target.to_string(), offset));
            }
        }

        let withdrawn: BTreeSet<StructuralPath> = culprits
            .iter()
            .filter(|&&id| final_name(id) != current_name(id))
            .map(|&id| tree.scope(tree.declaration(id).scope).path.clone())
            .collect();
        if withdrawn.is_empty() {
            return;
        }
        let (name, offset) = offending.unwrap_or_default();
        for path in withdrawn {
            if derivation.mapping.remove_scope(&path).is_some() {
                debug!(
                    scope = %path,
                    name = %name,
                    "withdrawing renames that would capture a reference"
                );
                derivation.failures.push(ScopeFailure::new(
                    AnalysisErrorKind::AmbiguousMapping,
                    &path,
                    format!(
                        "reverting to `{}` would rebind the reference at byte {}",
                        name, offset
                    ),
                ));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
