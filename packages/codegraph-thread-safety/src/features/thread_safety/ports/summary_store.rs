/// Summary store port
///
/// Memo table keyed by procedure identity. Implementations must compute
/// each key at most once and must not call `compute` for a key that is
/// already being computed further up the stack (recursion).
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::features::thread_safety::domain::Summary;
use crate::features::thread_safety::infrastructure::Result;
use crate::shared::models::ProcName;

pub trait SummaryStore: Send + Sync {
    fn get(&self, name: &ProcName) -> Option<Arc<Summary>>;

    /// Cached summary, or the result of `compute` stored under `name`
    ///
    /// Returns `Ok(None)` while `name` is in progress (a call cycle).
    fn get_or_compute(
        &self,
        name: &ProcName,
        compute: &mut dyn FnMut() -> Result<Summary>,
    ) -> Result<Option<Arc<Summary>>>;

    /// All stored summaries, ordered by name
    fn snapshot(&self) -> BTreeMap<ProcName, Arc<Summary>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
