/// Access to procedure bodies
use crate::shared::models::{ProcDesc, ProcName};

pub trait ProcedureProvider: Send + Sync {
    /// Body of `name`; `None` for library code without a body
    fn proc_desc(&self, name: &ProcName) -> Option<&ProcDesc>;
}
