//! Access paths: symbolic storage locations
//!
//! An access path is a root variable followed by field (or array element)
//! steps, e.g. `this.cache.entries`. Accesses and ownership facts are keyed
//! by access paths rather than by heap objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::models::{Exp, FieldName, Ident, Pvar, Var};

/// Pseudo-field standing for the contents of a container
pub const CONTAINER_CONTENTS_FIELD: &str = "__contents";

/// One step of an access path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldAccess {
    Field(FieldName),
    ArrayElement,
}

impl FieldAccess {
    pub fn is_container_contents(&self) -> bool {
        matches!(self, FieldAccess::Field(f) if f.field_name == CONTAINER_CONTENTS_FIELD)
    }
}

/// Root variable plus field steps
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessPath {
    pub root: Var,
    pub accesses: Vec<FieldAccess>,
}

impl AccessPath {
    pub fn of_var(root: Var) -> Self {
        Self {
            root,
            accesses: Vec::new(),
        }
    }

    pub fn of_pvar(pvar: Pvar) -> Self {
        Self::of_var(Var::Program(pvar))
    }

    pub fn of_ident(id: Ident) -> Self {
        Self::of_var(Var::Ident(id))
    }

    pub fn with_access(mut self, access: FieldAccess) -> Self {
        self.accesses.push(access);
        self
    }

    pub fn with_field(self, field: FieldName) -> Self {
        self.with_access(FieldAccess::Field(field))
    }

    /// Access path of an l-value expression
    ///
    /// Temporaries are resolved through `resolve` (the alias map); an
    /// unresolved temporary stands for itself. Constants and computed
    /// values have no stable storage and yield `None`.
    pub fn of_exp<F>(exp: &Exp, resolve: &F) -> Option<Self>
    where
        F: Fn(Ident) -> Option<AccessPath>,
    {
        match exp {
            Exp::Var(id) => Some(resolve(*id).unwrap_or_else(|| Self::of_ident(*id))),
            Exp::Lvar(pvar) => Some(Self::of_pvar(pvar.clone())),
            Exp::Lfield(base, field) => {
                Self::of_exp(base, resolve).map(|path| path.with_field(field.clone()))
            }
            Exp::Lindex(base, _) => {
                Self::of_exp(base, resolve).map(|path| path.with_access(FieldAccess::ArrayElement))
            }
            Exp::Const(_) | Exp::UnOp(..) | Exp::BinOp(..) => None,
        }
    }

    /// First access path mentioned anywhere in `exp` (left to right)
    pub fn first_in_exp<F>(exp: &Exp, resolve: &F) -> Option<Self>
    where
        F: Fn(Ident) -> Option<AccessPath>,
    {
        match exp {
            Exp::UnOp(_, inner) => Self::first_in_exp(inner, resolve),
            Exp::BinOp(_, lhs, rhs) => {
                Self::first_in_exp(lhs, resolve).or_else(|| Self::first_in_exp(rhs, resolve))
            }
            Exp::Const(_) => None,
            _ => Self::of_exp(exp, resolve),
        }
    }

    /// Drop the last step (`this.a.b` → `this.a`); a bare root is unchanged
    pub fn truncate(&self) -> Self {
        let mut truncated = self.clone();
        truncated.accesses.pop();
        truncated
    }

    /// `this`, `this.a`, `this.a.b` for `this.a.b`
    pub fn prefixes(&self) -> impl Iterator<Item = AccessPath> + '_ {
        (0..=self.accesses.len()).map(move |len| AccessPath {
            root: self.root.clone(),
            accesses: self.accesses[..len].to_vec(),
        })
    }

    pub fn is_base(&self) -> bool {
        self.accesses.is_empty()
    }

    /// Last field step, if the path ends in a field
    pub fn last_field(&self) -> Option<&FieldName> {
        match self.accesses.last() {
            Some(FieldAccess::Field(field)) => Some(field),
            _ => None,
        }
    }

    pub fn is_container_contents(&self) -> bool {
        self.accesses
            .last()
            .is_some_and(FieldAccess::is_container_contents)
    }

    /// Equality of the field steps only, ignoring the root
    pub fn equal_access_list(&self, other: &AccessPath) -> bool {
        self.accesses == other.accesses
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for access in &self.accesses {
            match access {
                FieldAccess::Field(field) => write!(f, ".{}", field)?,
                FieldAccess::ArrayElement => f.write_str("[_]")?,
            }
        }
        Ok(())
    }
}
