//! Per-procedure summary

use serde::{Deserialize, Serialize};

use super::abstract_state::AbstractState;
use super::access::AccessMap;
use super::attribute::AttributeSet;

/// Externally visible result of analyzing one procedure
///
/// Immutable once computed; callers splice it in at call sites and the
/// reporter reads it from the results table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Runs on a known thread (UI thread, thread assertion)
    pub threaded: bool,
    /// Returns with a lock held
    pub locks_held: bool,
    pub accesses: AccessMap,
    pub return_attributes: AttributeSet,
}

impl Summary {
    /// Summary of a skipped or unanalyzable procedure
    pub fn empty() -> Self {
        Self::default()
    }

    /// Package a post-state; the alias map is dropped
    pub fn from_post(post: AbstractState, return_attributes: AttributeSet) -> Self {
        Self {
            threaded: post.thread_confined,
            locks_held: post.locks_held,
            accesses: post.accesses,
            return_attributes,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.threaded
            && !self.locks_held
            && self.accesses.is_empty()
            && self.return_attributes.is_empty()
    }
}
