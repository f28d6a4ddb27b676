//! Recorded accesses, their provenance and the precondition-keyed access map

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::access_path::AccessPath;
use crate::shared::models::{Location, ProcName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Read,
    Write,
}

/// One read or write of a storage location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Access {
    pub path: AccessPath,
    pub kind: AccessKind,
    /// Container method, for writes synthesized from container mutators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_method: Option<String>,
}

impl Access {
    pub fn read(path: AccessPath) -> Self {
        Self {
            path,
            kind: AccessKind::Read,
            container_method: None,
        }
    }

    pub fn write(path: AccessPath) -> Self {
        Self {
            path,
            kind: AccessKind::Write,
            container_method: None,
        }
    }

    pub fn container_write(path: AccessPath, method: impl Into<String>) -> Self {
        Self {
            path,
            kind: AccessKind::Write,
            container_method: Some(method.into()),
        }
    }

    pub fn is_write(&self) -> bool {
        self.kind == AccessKind::Write
    }
}

/// Call of `proc_name` at `loc`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallSite {
    pub proc_name: ProcName,
    pub loc: Location,
}

impl CallSite {
    pub fn new(proc_name: ProcName, loc: Location) -> Self {
        Self { proc_name, loc }
    }
}

/// An access plus the call chain that reaches it
///
/// `call_chain` is ordered outermost first: the first element is the call
/// made by the procedure owning the summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceElem {
    pub access: Access,
    /// Where the access textually occurs
    pub loc: Location,
    #[serde(default)]
    pub call_chain: Vec<CallSite>,
}

impl TraceElem {
    pub fn new(access: Access, loc: Location) -> Self {
        Self {
            access,
            loc,
            call_chain: Vec::new(),
        }
    }

    /// Same access seen from a caller through `site`
    pub fn with_callsite(&self, site: CallSite) -> Self {
        let mut call_chain = Vec::with_capacity(self.call_chain.len() + 1);
        call_chain.push(site);
        call_chain.extend(self.call_chain.iter().cloned());
        Self {
            access: self.access.clone(),
            loc: self.loc.clone(),
            call_chain,
        }
    }

    /// Location in the reporting procedure: the outermost call site, or the
    /// access itself when it is direct
    pub fn outermost_loc(&self) -> &Location {
        self.call_chain
            .first()
            .map(|site| &site.loc)
            .unwrap_or(&self.loc)
    }

    pub fn is_write(&self) -> bool {
        self.access.is_write()
    }
}

/// Synchronization condition under which an access is safe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPrecondition {
    /// Lock held or synchronized method
    Protected,
    /// Safe only if the given formal is owned by the caller; `None` means
    /// never safe without synchronization
    Unprotected(Option<usize>),
}

impl AccessPrecondition {
    pub fn is_unprotected(&self) -> bool {
        matches!(self, AccessPrecondition::Unprotected(_))
    }
}

impl fmt::Display for AccessPrecondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPrecondition::Protected => f.write_str("Protected"),
            AccessPrecondition::Unprotected(Some(formal)) => write!(f, "Unprotected({})", formal),
            AccessPrecondition::Unprotected(None) => f.write_str("Unprotected"),
        }
    }
}

/// Trace elements grouped by precondition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMap {
    #[serde(with = "precondition_entries")]
    map: BTreeMap<AccessPrecondition, BTreeSet<TraceElem>>,
}

impl AccessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pre: AccessPrecondition, elem: TraceElem) {
        self.map.entry(pre).or_default().insert(elem);
    }

    pub fn get(&self, pre: &AccessPrecondition) -> Option<&BTreeSet<TraceElem>> {
        self.map.get(pre)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccessPrecondition, &BTreeSet<TraceElem>)> {
        self.map.iter()
    }

    /// Every trace element with an unprotected precondition
    pub fn unprotected(&self) -> impl Iterator<Item = &TraceElem> {
        self.map
            .iter()
            .filter(|(pre, _)| pre.is_unprotected())
            .flat_map(|(_, elems)| elems.iter())
    }

    pub fn join(&self, other: &Self) -> Self {
        let mut joined = self.clone();
        for (pre, elems) in &other.map {
            joined
                .map
                .entry(*pre)
                .or_default()
                .extend(elems.iter().cloned());
        }
        joined
    }

    pub fn leq(&self, other: &Self) -> bool {
        self.map.iter().all(|(pre, elems)| {
            other
                .map
                .get(pre)
                .is_some_and(|theirs| elems.is_subset(theirs))
        })
    }

    /// Number of trace elements
    pub fn len(&self) -> usize {
        self.map.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.values().all(BTreeSet::is_empty)
    }
}

/// JSON object keys must be strings, so the map is stored as a list of
/// `(precondition, elems)` pairs.
mod precondition_entries {
    use super::{AccessPrecondition, TraceElem};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::{BTreeMap, BTreeSet};

    pub fn serialize<S>(
        map: &BTreeMap<AccessPrecondition, BTreeSet<TraceElem>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<_> = map.iter().collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<AccessPrecondition, BTreeSet<TraceElem>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(AccessPrecondition, BTreeSet<TraceElem>)> =
            Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// Collapse near-duplicate sinks
///
/// Two passes: one element per access list, then one per outermost
/// location among those. Each pass keeps the smallest element of a class,
/// so a procedure writing `this.x` on two lines yields one report.
pub fn de_dup<'a, I>(elems: I) -> Vec<TraceElem>
where
    I: IntoIterator<Item = &'a TraceElem>,
{
    let by_accesses = keep_smallest(elems, |elem| elem.access.path.accesses.clone());
    keep_smallest(by_accesses, |elem| elem.outermost_loc().clone())
        .into_iter()
        .cloned()
        .collect()
}

fn keep_smallest<'a, I, K, F>(elems: I, key: F) -> Vec<&'a TraceElem>
where
    I: IntoIterator<Item = &'a TraceElem>,
    K: Ord,
    F: Fn(&TraceElem) -> K,
{
    let mut classes: BTreeMap<K, &TraceElem> = BTreeMap::new();
    for elem in elems {
        classes
            .entry(key(elem))
            .and_modify(|kept| {
                if elem < *kept {
                    *kept = elem;
                }
            })
            .or_insert(elem);
    }
    classes.into_values().collect()
}
