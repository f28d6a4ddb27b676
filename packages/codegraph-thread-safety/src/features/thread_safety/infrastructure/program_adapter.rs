//! Port implementations over the in-memory program model
//!
//! `TypeEnvironment` answers annotation and hierarchy queries; `Program`
//! provides procedure bodies.

use crate::features::thread_safety::ports::{AnnotationOracle, AnnotationTarget, ProcedureProvider};
use crate::shared::models::{AnnotationKind, ProcDesc, ProcName, Program, TypeEnvironment};

impl AnnotationOracle for TypeEnvironment {
    fn has_annotation(&self, target: AnnotationTarget<'_>, kind: AnnotationKind) -> bool {
        match target {
            AnnotationTarget::Class(class_name) => self
                .class(class_name)
                .is_some_and(|class| class.annotations.contains(&kind)),
            AnnotationTarget::Method(proc_name) => self
                .class(&proc_name.class_name)
                .and_then(|class| class.method(proc_name))
                .is_some_and(|method| method.annotations.contains(&kind)),
            AnnotationTarget::Field(field) => self
                .field(field)
                .is_some_and(|decl| decl.annotations.contains(&kind)),
        }
    }

    fn supertypes(&self, class_name: &str) -> Vec<String> {
        self.class(class_name)
            .map(|class| class.supers.clone())
            .unwrap_or_default()
    }
}

impl ProcedureProvider for Program {
    fn proc_desc(&self, name: &ProcName) -> Option<&ProcDesc> {
        self.procedure(name)
    }
}
