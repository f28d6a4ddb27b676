/// Annotation oracle port
///
/// Yes/no questions about source annotations and the class hierarchy.
use std::collections::{BTreeSet, VecDeque};

use crate::shared::models::{AnnotationKind, FieldName, ProcName};

/// What an annotation query is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationTarget<'a> {
    Class(&'a str),
    Method(&'a ProcName),
    Field(&'a FieldName),
}

pub trait AnnotationOracle: Send + Sync {
    /// Annotation directly on the target (no inheritance)
    fn has_annotation(&self, target: AnnotationTarget<'_>, kind: AnnotationKind) -> bool;

    /// Direct superclass and interfaces of `class_name`
    fn supertypes(&self, class_name: &str) -> Vec<String>;

    /// `class_name` and all of its ancestors, nearest first
    fn ancestors(&self, class_name: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([class_name.to_string()]);
        while let Some(class) = queue.pop_front() {
            if !seen.insert(class.clone()) {
                continue;
            }
            queue.extend(self.supertypes(&class));
            order.push(class);
        }
        order
    }

    /// Classes among `class_name` and its ancestors satisfying `predicate`
    fn find_annotated_superclasses(
        &self,
        class_name: &str,
        predicate: &dyn Fn(&str) -> bool,
    ) -> Vec<String> {
        self.ancestors(class_name)
            .into_iter()
            .filter(|class| predicate(class))
            .collect()
    }

    fn supertype_exists(&self, class_name: &str, predicate: &dyn Fn(&str) -> bool) -> bool {
        self.ancestors(class_name).iter().any(|class| predicate(class))
    }

    /// `kind` on the class or any ancestor
    fn class_or_ancestor_has(&self, class_name: &str, kind: AnnotationKind) -> bool {
        self.supertype_exists(class_name, &|class| {
            self.has_annotation(AnnotationTarget::Class(class), kind)
        })
    }

    /// `kind` on the method or on a method it overrides
    fn overrides_annotated_method(&self, proc_name: &ProcName, kind: AnnotationKind) -> bool {
        self.ancestors(&proc_name.class_name).iter().any(|class| {
            let candidate = ProcName {
                class_name: class.clone(),
                method_name: proc_name.method_name.clone(),
                parameters: proc_name.parameters.clone(),
            };
            self.has_annotation(AnnotationTarget::Method(&candidate), kind)
        })
    }
}
