//! Abstract state of the thread-safety domain
//!
//! # Lattice
//! - `locks_held`, `thread_confined`: booleans joined by OR
//! - `accesses`: precondition → trace elements, joined by union
//! - `attribute_map`: access path → attributes, joined by union
//! - `alias_map`: temporary → access path, joined by intersection of
//!   agreeing entries (disagreement means unknown)
//!
//! All components are finite for a given procedure, so plain iteration
//! reaches a fixpoint without widening.

use std::collections::BTreeMap;

use super::access::AccessMap;
use super::access_path::AccessPath;
use super::attribute::AttributeMap;
use crate::shared::models::Ident;

/// Temporaries resolved to the access path they were loaded from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    map: BTreeMap<Ident, AccessPath>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Ident) -> Option<&AccessPath> {
        self.map.get(&id)
    }

    pub fn insert(&mut self, id: Ident, path: AccessPath) {
        self.map.insert(id, path);
    }

    pub fn remove(&mut self, id: Ident) {
        self.map.remove(&id);
    }

    pub fn join(&self, other: &Self) -> Self {
        let map = self
            .map
            .iter()
            .filter(|(id, path)| other.map.get(id) == Some(path))
            .map(|(id, path)| (*id, path.clone()))
            .collect();
        Self { map }
    }

    /// `self ≤ other` iff every entry of `other` is also in `self`
    pub fn leq(&self, other: &Self) -> bool {
        other
            .map
            .iter()
            .all(|(id, path)| self.map.get(id) == Some(path))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbstractState {
    pub locks_held: bool,
    pub thread_confined: bool,
    pub accesses: AccessMap,
    pub attribute_map: AttributeMap,
    pub alias_map: AliasMap,
}

impl AbstractState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, other: &Self) -> Self {
        Self {
            locks_held: self.locks_held || other.locks_held,
            thread_confined: self.thread_confined || other.thread_confined,
            accesses: self.accesses.join(&other.accesses),
            attribute_map: self.attribute_map.join(&other.attribute_map),
            alias_map: self.alias_map.join(&other.alias_map),
        }
    }

    pub fn leq(&self, other: &Self) -> bool {
        (!self.locks_held || other.locks_held)
            && (!self.thread_confined || other.thread_confined)
            && self.accesses.leq(&other.accesses)
            && self.attribute_map.leq(&other.attribute_map)
            && self.alias_map.leq(&other.alias_map)
    }

    /// Alias-map lookup usable as an access-path resolver
    pub fn resolve(&self, id: Ident) -> Option<AccessPath> {
        self.alias_map.get(id).cloned()
    }
}
