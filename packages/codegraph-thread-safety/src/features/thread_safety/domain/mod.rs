//! Domain model of the thread-safety checker
//!
//! - `access_path`: symbolic storage locations
//! - `attribute`: ownership / functional / choice facts per path
//! - `access`: recorded accesses with call-chain provenance
//! - `abstract_state`: the lattice the transfer function runs over
//! - `summary`: per-procedure result
//! - `diagnostic`: reports

pub mod abstract_state;
pub mod access;
pub mod access_path;
pub mod attribute;
pub mod diagnostic;
pub mod summary;

pub use abstract_state::{AbstractState, AliasMap};
pub use access::{de_dup, Access, AccessKind, AccessMap, AccessPrecondition, CallSite, TraceElem};
pub use access_path::{AccessPath, FieldAccess, CONTAINER_CONTENTS_FIELD};
pub use attribute::{Attribute, AttributeMap, AttributeSet, Choice};
pub use diagnostic::{Diagnostic, IssueKind, TraceHop};
pub use summary::Summary;
