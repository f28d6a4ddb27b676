//! Type environment: classes, supertypes, fields and annotations

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{FieldName, ProcName, Typ};

/// Source-level annotations the checker understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// `@ThreadSafe`
    ThreadSafe,
    /// `@NotThreadSafe`
    NotThreadSafe,
    /// `@ThreadConfined`
    ThreadConfined,
    /// `@UiThread` / `@MainThread`
    UiThread,
    /// `@Functional`
    Functional,
    /// `@ReturnsOwnership`
    ReturnsOwnership,
    /// `@Inject`
    Inject,
    /// `volatile` modifier
    Volatile,
    /// `@VisibleForTesting`
    VisibleForTesting,
    /// `@AssumeThreadSafe`
    AssumeThreadSafe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub typ: Typ,
    #[serde(default)]
    pub annotations: BTreeSet<AnnotationKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: ProcName,
    #[serde(default)]
    pub annotations: BTreeSet<AnnotationKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    /// Direct superclass and interfaces
    #[serde(default)]
    pub supers: Vec<String>,
    #[serde(default)]
    pub annotations: BTreeSet<AnnotationKind>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supers: Vec::new(),
            annotations: BTreeSet::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.supers.push(super_name.into());
        self
    }

    pub fn with_annotation(mut self, kind: AnnotationKind) -> Self {
        self.annotations.insert(kind);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, typ: Typ) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            typ,
            annotations: BTreeSet::new(),
        });
        self
    }

    pub fn with_annotated_field(
        mut self,
        name: impl Into<String>,
        typ: Typ,
        kind: AnnotationKind,
    ) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            typ,
            annotations: BTreeSet::from([kind]),
        });
        self
    }

    pub fn with_method(mut self, name: ProcName, annotations: &[AnnotationKind]) -> Self {
        self.methods.push(MethodDecl {
            name,
            annotations: annotations.iter().copied().collect(),
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &ProcName) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name.same_signature(name))
    }
}

/// All classes known to the analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeEnvironment {
    classes: BTreeMap<String, ClassDecl>,
}

impl TypeEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: ClassDecl) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn with_class(mut self, class: ClassDecl) -> Self {
        self.add_class(class);
        self
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    pub fn field(&self, field: &FieldName) -> Option<&FieldDecl> {
        self.class(&field.class_name)?.field(&field.field_name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values()
    }

    /// Record method annotations (merging with any already declared)
    pub fn register_method(&mut self, name: &ProcName, annotations: &BTreeSet<AnnotationKind>) {
        let class = self
            .classes
            .entry(name.class_name.clone())
            .or_insert_with(|| ClassDecl::new(name.class_name.clone()));
        match class.methods.iter_mut().find(|m| m.name.same_signature(name)) {
            Some(decl) => decl.annotations.extend(annotations.iter().copied()),
            None => class.methods.push(MethodDecl {
                name: name.clone(),
                annotations: annotations.clone(),
            }),
        }
    }
}
