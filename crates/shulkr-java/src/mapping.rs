//! Per-scope rename mappings.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use shulkr_core::output::MappingInfo;

use crate::tree::StructuralPath;

/// Injective `old name -> new name` renames of one aligned scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeRenames {
    by_old: BTreeMap<String, String>,
    by_new: BTreeMap<String, String>,
}

impl ScopeRenames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `old -> new`.
    ///
    /// Returns `false` and leaves the map unchanged if the entry would break
    /// injectivity or map one old name two ways. Re-inserting an existing
    /// entry is accepted.
    pub fn insert(&mut self, old: &str, new: &str) -> bool {
        match (self.by_old.get(old), self.by_new.get(new)) {
            (Some(existing_new), Some(existing_old)) => existing_new == new && existing_old == old,
            (None, None) => {
                self.by_old.insert(old.to_string(), new.to_string());
                self.by_new.insert(new.to_string(), old.to_string());
                true
            }
            _ => false,
        }
    }

    /// Old name for an identifier currently named `new`.
    pub fn old_name_for(&self, new: &str) -> Option<&str> {
        self.by_new.get(new).map(String::as_str)
    }

    /// Entries as `(old, new)`, ordered by old name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.by_old.iter().map(|(o, n)| (o.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_old.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_old.is_empty()
    }
}

impl Serialize for ScopeRenames {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.by_old.serialize(serializer)
    }
}

/// Renames for a whole file, keyed by the structural path of each scope.
///
/// Only scopes with at least one rename appear. Built by the deriver and
/// never mutated once handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMapping {
    scopes: BTreeMap<StructuralPath, ScopeRenames>,
}

impl RenameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_scope(&mut self, path: StructuralPath, renames: ScopeRenames) {
        if !renames.is_empty() {
            self.scopes.insert(path, renames);
        }
    }

    pub(crate) fn remove_scope(&mut self, path: &StructuralPath) -> Option<ScopeRenames> {
        self.scopes.remove(path)
    }

    pub fn scope(&self, path: &StructuralPath) -> Option<&ScopeRenames> {
        self.scopes.get(path)
    }

    pub fn old_name_for(&self, path: &StructuralPath, new: &str) -> Option<&str> {
        self.scopes.get(path).and_then(|renames| renames.old_name_for(new))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StructuralPath, &ScopeRenames)> + '_ {
        self.scopes.iter()
    }

    /// True when no scope holds a rename.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Number of scopes with renames.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Total rename entries across all scopes.
    pub fn rename_count(&self) -> usize {
        self.scopes.values().map(ScopeRenames::len).sum()
    }

    /// Convert to the JSON output shape.
    pub fn to_info(&self) -> MappingInfo {
        self.scopes
            .iter()
            .map(|(path, renames)| (path.to_string(), renames.by_old.clone()))
            .collect()
    }
}

impl Serialize for RenameMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.scopes.len()))?;
        for (path, renames) in &self.scopes {
            map.serialize_entry(&path.to_string(), renames)?;
        }
        map.end()
    }
}
