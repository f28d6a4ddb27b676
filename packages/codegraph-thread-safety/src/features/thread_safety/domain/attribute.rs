//! Ownership / functional attributes attached to access paths

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::access_path::AccessPath;

/// Runtime condition a boolean value coincides with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// Result of `tryLock()`
    LockHeld,
    /// Result of `isMainThread()`
    OnMainThread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Freshly allocated, not yet shared
    UnconditionallyOwned,
    /// Owned iff the actual for this formal is owned at the call site
    OwnedIf(usize),
    /// Reading the value has no observable effect
    Functional,
    Choice(Choice),
}

pub type AttributeSet = BTreeSet<Attribute>;

/// Attribute sets per access path
///
/// Joined by per-path union. Ownership is prefix-closed: `x.f` is owned
/// whenever `x` is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap {
    map: BTreeMap<AccessPath, AttributeSet>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &AccessPath) -> Option<&AttributeSet> {
        self.map.get(path)
    }

    /// Attributes of `path` (empty when untracked)
    pub fn attributes(&self, path: &AccessPath) -> AttributeSet {
        self.map.get(path).cloned().unwrap_or_default()
    }

    pub fn add_attribute(&mut self, path: AccessPath, attribute: Attribute) {
        self.map.entry(path).or_default().insert(attribute);
    }

    /// Union `attributes` into the set of `path`
    pub fn add_attributes(&mut self, path: AccessPath, attributes: AttributeSet) {
        if attributes.is_empty() {
            return;
        }
        self.map.entry(path).or_default().extend(attributes);
    }

    pub fn has_attribute(&self, path: &AccessPath, attribute: Attribute) -> bool {
        self.map.get(path).is_some_and(|set| set.contains(&attribute))
    }

    pub fn is_owned(&self, path: &AccessPath) -> bool {
        path.prefixes()
            .any(|prefix| self.has_attribute(&prefix, Attribute::UnconditionallyOwned))
    }

    pub fn is_functional(&self, path: &AccessPath) -> bool {
        self.has_attribute(path, Attribute::Functional)
    }

    /// Formal whose ownership would make `path` owned, searching from the
    /// longest prefix down to the root
    pub fn conditional_owner(&self, path: &AccessPath) -> Option<usize> {
        let prefixes: Vec<AccessPath> = path.prefixes().collect();
        prefixes.iter().rev().find_map(|prefix| {
            self.map.get(prefix)?.iter().find_map(|attribute| match attribute {
                Attribute::OwnedIf(formal) => Some(*formal),
                _ => None,
            })
        })
    }

    pub fn choices(&self, path: &AccessPath) -> Vec<Choice> {
        self.map
            .get(path)
            .map(|set| {
                set.iter()
                    .filter_map(|attribute| match attribute {
                        Attribute::Choice(choice) => Some(*choice),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn join(&self, other: &Self) -> Self {
        let mut joined = self.clone();
        for (path, attributes) in &other.map {
            joined
                .map
                .entry(path.clone())
                .or_default()
                .extend(attributes.iter().copied());
        }
        joined
    }

    pub fn leq(&self, other: &Self) -> bool {
        self.map.iter().all(|(path, attributes)| {
            other
                .map
                .get(path)
                .is_some_and(|theirs| attributes.is_subset(theirs))
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccessPath, &AttributeSet)> {
        self.map.iter()
    }
}
