//! Transfer function of the thread-safety analysis
//!
//! # Instructions
//! - `Load`: record a `Read` of the loaded path, alias the temporary to it
//! - `Store`: record a `Write` unless the target is owned, confined,
//!   volatile or functional; propagate attributes from the right-hand side
//! - `Call`: allocation and cast builtins, lock/thread models, container
//!   mutators, then callee summaries spliced in at the call site
//! - `Prune`: narrow `locks_held`/`thread_confined` on branches guarded by
//!   a `tryLock()`/`isMainThread()` result
//! - `ExitScope`: forget aliases of dead temporaries
//!
//! Anything else leaves the state unchanged.

use std::sync::Arc;

use super::api_catalog::{ApiCatalog, LockEffect, ThreadEffect};
use super::error::{Result, ThreadSafetyError};
use crate::features::thread_safety::domain::{
    AbstractState, Access, AccessKind, AccessPath, AccessPrecondition, Attribute, AttributeSet,
    CallSite, Choice, Summary, TraceElem, CONTAINER_CONTENTS_FIELD,
};
use crate::features::thread_safety::ports::{AnnotationOracle, AnnotationTarget};
use crate::shared::models::{
    AnnotationKind, BinOp, Builtin, Callee, Exp, FieldName, FormalMap, Ident, Instr, Location,
    ProcDesc, ProcName, Typ, UnOp, Var,
};

/// On-demand callee summaries
pub trait SummaryReader {
    /// Summary of `callee`, computing it if needed; `None` when unavailable
    fn read_summary(&self, caller: &ProcName, callee: &ProcName) -> Result<Option<Arc<Summary>>>;
}

/// Per-procedure transfer function
pub struct ThreadSafetyTransfer<'a> {
    pdesc: &'a ProcDesc,
    formals: FormalMap,
    oracle: &'a dyn AnnotationOracle,
    catalog: &'a ApiCatalog,
    summaries: &'a dyn SummaryReader,
}

impl<'a> ThreadSafetyTransfer<'a> {
    pub fn new(
        pdesc: &'a ProcDesc,
        oracle: &'a dyn AnnotationOracle,
        catalog: &'a ApiCatalog,
        summaries: &'a dyn SummaryReader,
    ) -> Self {
        Self {
            pdesc,
            formals: FormalMap::new(&pdesc.attributes),
            oracle,
            catalog,
            summaries,
        }
    }

    pub fn exec_instr(&self, mut state: AbstractState, instr: &Instr) -> Result<AbstractState> {
        match instr {
            Instr::Load { id, exp, loc, .. } => {
                match Self::path_of(&state, exp) {
                    Some(path) => {
                        self.add_access(&mut state, &path, AccessKind::Read, loc);
                        state.alias_map.insert(*id, path);
                    }
                    None => state.alias_map.remove(*id),
                }
            }
            Instr::Store {
                lhs, typ, rhs, loc, ..
            } => self.exec_store(&mut state, lhs, typ, rhs, loc),
            Instr::Call {
                ret,
                callee,
                args,
                loc,
            } => {
                if let Some((id, _)) = ret {
                    state.alias_map.remove(*id);
                }
                match callee {
                    Callee::Builtin(builtin) => Self::exec_builtin(&mut state, builtin, ret, args),
                    Callee::Method(callee) => {
                        self.exec_call(&mut state, callee, ret, args, loc)?;
                    }
                }
            }
            Instr::Prune { cond, .. } => Self::exec_prune(&mut state, cond),
            Instr::ExitScope { vars, .. } => {
                for var in vars {
                    if let Var::Ident(id) = var {
                        state.alias_map.remove(*id);
                    }
                }
            }
            Instr::Nop { .. } => {}
        }
        Ok(state)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accesses
    // ═══════════════════════════════════════════════════════════════════════

    fn path_of(state: &AbstractState, exp: &Exp) -> Option<AccessPath> {
        AccessPath::of_exp(exp, &|id| state.resolve(id))
    }

    fn is_protected(&self, state: &AbstractState) -> bool {
        state.locks_held || self.pdesc.attributes.is_synchronized
    }

    /// Formal of the current procedure whose ownership would make `path`
    /// owned
    fn owner_formal(&self, state: &AbstractState, path: &AccessPath) -> Option<usize> {
        state
            .attribute_map
            .conditional_owner(path)
            .or_else(|| self.formals.get_formal_index(&path.root))
    }

    fn precondition(&self, state: &AbstractState, path: &AccessPath) -> AccessPrecondition {
        if self.is_protected(state) {
            AccessPrecondition::Protected
        } else {
            AccessPrecondition::Unprotected(self.owner_formal(state, &path.truncate()))
        }
    }

    /// Record an access to a field (or array element) path
    fn add_access(&self, state: &mut AbstractState, path: &AccessPath, kind: AccessKind, loc: &Location) {
        if path.is_base() || state.attribute_map.is_owned(path) {
            return;
        }
        let pre = self.precondition(state, path);
        let access = Access {
            path: path.clone(),
            kind,
            container_method: None,
        };
        state.accesses.add(pre, TraceElem::new(access, loc.clone()));
    }

    fn is_confined_field(&self, path: &AccessPath) -> bool {
        path.last_field().is_some_and(|field| {
            self.oracle
                .has_annotation(AnnotationTarget::Field(field), AnnotationKind::ThreadConfined)
                || self
                    .oracle
                    .has_annotation(AnnotationTarget::Field(field), AnnotationKind::Volatile)
        })
    }

    fn exec_store(&self, state: &mut AbstractState, lhs: &Exp, typ: &Typ, rhs: &Exp, loc: &Location) {
        let Some(lhs_path) = Self::path_of(state, lhs) else {
            return;
        };
        let rhs_path = Self::path_of(state, rhs);

        let rhs_functional = !typ.is_wide()
            && rhs_path
                .as_ref()
                .is_some_and(|path| state.attribute_map.is_functional(path));
        let suppressed = rhs_functional
            || state.attribute_map.is_functional(&lhs_path)
            || self.is_confined_field(&lhs_path);
        if !suppressed {
            self.add_access(state, &lhs_path, AccessKind::Write, loc);
        }

        let rhs_attributes = if rhs.is_const() {
            AttributeSet::from([Attribute::UnconditionallyOwned, Attribute::Functional])
        } else {
            rhs_path
                .map(|path| state.attribute_map.attributes(&path))
                .unwrap_or_default()
        };
        state.attribute_map.add_attributes(lhs_path, rhs_attributes);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════

    fn exec_builtin(
        state: &mut AbstractState,
        builtin: &Builtin,
        ret: &Option<(Ident, Typ)>,
        args: &[(Exp, Typ)],
    ) {
        let Some((id, _)) = ret else {
            return;
        };
        let ret_path = AccessPath::of_ident(*id);
        match builtin {
            Builtin::New | Builtin::NewArray => {
                state
                    .attribute_map
                    .add_attribute(ret_path, Attribute::UnconditionallyOwned);
            }
            Builtin::Cast => {
                let operand = args.first().and_then(|(exp, _)| Self::path_of(state, exp));
                if let Some(operand) = operand {
                    let attributes = state.attribute_map.attributes(&operand);
                    state.attribute_map.add_attributes(ret_path, attributes);
                }
            }
            Builtin::InstanceOf | Builtin::Other(_) => {}
        }
    }

    fn exec_call(
        &self,
        state: &mut AbstractState,
        callee: &ProcName,
        ret: &Option<(Ident, Typ)>,
        args: &[(Exp, Typ)],
        loc: &Location,
    ) -> Result<()> {
        let model = self.catalog.model_of(callee, self.oracle);

        if let Some(effect) = model.lock {
            match effect {
                LockEffect::Lock => state.locks_held = true,
                LockEffect::Unlock => state.locks_held = false,
                LockEffect::LockedIfTrue => {
                    let Some((id, _)) = ret else {
                        return Err(ThreadSafetyError::invariant(
                            loc,
                            format!("result of `{}` is not bound", callee.to_simplified_string()),
                        ));
                    };
                    state.attribute_map.add_attribute(
                        AccessPath::of_ident(*id),
                        Attribute::Choice(Choice::LockHeld),
                    );
                }
            }
            return Ok(());
        }

        if let Some(effect) = model.thread {
            match effect {
                ThreadEffect::AssertMainThread => state.thread_confined = true,
                ThreadEffect::MainThreadIfTrue => {
                    if let Some((id, _)) = ret {
                        state.attribute_map.add_attribute(
                            AccessPath::of_ident(*id),
                            Attribute::Choice(Choice::OnMainThread),
                        );
                    }
                }
            }
            return Ok(());
        }

        if model.container_write && !self.is_thread_safe_receiver(callee, args) {
            self.add_container_write(state, callee, args, loc)?;
        } else if !model.container_write {
            if let Some(summary) = self.summaries.read_summary(self.pdesc.name(), callee)? {
                self.splice_summary(state, callee, &summary, ret, args, loc);
            }
        }

        if let Some((id, ret_typ)) = ret {
            let ret_path = AccessPath::of_ident(*id);
            let functional = model.functional
                || self
                    .oracle
                    .overrides_annotated_method(callee, AnnotationKind::Functional);
            if functional && !ret_typ.is_wide() {
                state
                    .attribute_map
                    .add_attribute(ret_path.clone(), Attribute::Functional);
            }
            let owned = model.owned_result
                || self
                    .oracle
                    .overrides_annotated_method(callee, AnnotationKind::ReturnsOwnership);
            if owned {
                state
                    .attribute_map
                    .add_attribute(ret_path, Attribute::UnconditionallyOwned);
            }
        }
        Ok(())
    }

    fn is_thread_safe_receiver(&self, callee: &ProcName, args: &[(Exp, Typ)]) -> bool {
        self.catalog
            .is_thread_safe_container(&callee.class_name, self.oracle)
            || args
                .first()
                .and_then(|(_, typ)| typ.class_name())
                .is_some_and(|class| self.catalog.is_thread_safe_container(class, self.oracle))
    }

    /// Container mutation: a write to the receiver's contents
    fn add_container_write(
        &self,
        state: &mut AbstractState,
        callee: &ProcName,
        args: &[(Exp, Typ)],
        loc: &Location,
    ) -> Result<()> {
        let Some((receiver, _)) = args.first() else {
            return Err(ThreadSafetyError::invariant(
                loc,
                format!(
                    "container write `{}` without receiver",
                    callee.to_simplified_string()
                ),
            ));
        };
        let Some(receiver_path) = Self::path_of(state, receiver) else {
            return Ok(());
        };
        if state.attribute_map.is_owned(&receiver_path) {
            return Ok(());
        }
        let pre = if self.is_protected(state) {
            AccessPrecondition::Protected
        } else {
            AccessPrecondition::Unprotected(self.owner_formal(state, &receiver_path))
        };
        let contents = receiver_path.with_field(FieldName::new(
            callee.class_name.clone(),
            CONTAINER_CONTENTS_FIELD,
        ));
        let access = Access::container_write(contents, callee.method_name.clone());
        state.accesses.add(pre, TraceElem::new(access, loc.clone()));
        Ok(())
    }

    /// What an actual argument means for an ownership obligation on it
    fn actual_ownership(&self, state: &AbstractState, actual: Option<&Exp>) -> ActualOwnership {
        let Some(exp) = actual else {
            return ActualOwnership::Unowned;
        };
        if exp.is_const() {
            return ActualOwnership::Constant;
        }
        match Self::path_of(state, exp) {
            Some(path) if state.attribute_map.is_owned(&path) => ActualOwnership::Owned,
            Some(path) => self
                .owner_formal(state, &path)
                .map(ActualOwnership::Formal)
                .unwrap_or(ActualOwnership::Unowned),
            None => ActualOwnership::Unowned,
        }
    }

    fn splice_summary(
        &self,
        state: &mut AbstractState,
        callee: &ProcName,
        summary: &Summary,
        ret: &Option<(Ident, Typ)>,
        args: &[(Exp, Typ)],
        loc: &Location,
    ) {
        state.locks_held |= summary.locks_held;
        state.thread_confined |= summary.threaded;
        let protected = self.is_protected(state);
        let site = CallSite::new(callee.clone(), loc.clone());

        for (pre, elems) in summary.accesses.iter() {
            let caller_pre = match pre {
                AccessPrecondition::Protected => Some(AccessPrecondition::Protected),
                AccessPrecondition::Unprotected(None) if protected => {
                    Some(AccessPrecondition::Protected)
                }
                AccessPrecondition::Unprotected(None) => Some(AccessPrecondition::Unprotected(None)),
                // Ownership obligations follow the actual even under a lock

                AccessPrecondition::Unprotected(Some(formal)) => {
                    let actual = args.get(*formal).map(|(exp, _)| exp);
                    match self.actual_ownership(state, actual) {
                        ActualOwnership::Constant | ActualOwnership::Owned => None,
                        ActualOwnership::Formal(index) => {
                            Some(AccessPrecondition::Unprotected(Some(index)))
                        }
                        ActualOwnership::Unowned => Some(AccessPrecondition::Unprotected(None)),
                    }
                }
            };
            if let Some(caller_pre) = caller_pre {
                for elem in elems {
                    state.accesses.add(caller_pre, elem.with_callsite(site.clone()));
                }
            }
        }

        let Some((id, _)) = ret else {
            return;
        };
        let mut return_attributes = AttributeSet::new();
        for attribute in &summary.return_attributes {
            match attribute {
                Attribute::OwnedIf(formal) => {
                    let actual = args.get(*formal).map(|(exp, _)| exp);
                    match self.actual_ownership(state, actual) {
                        ActualOwnership::Owned => {
                            return_attributes.insert(Attribute::UnconditionallyOwned);
                        }
                        ActualOwnership::Formal(index) => {
                            return_attributes.insert(Attribute::OwnedIf(index));
                        }
                        ActualOwnership::Constant | ActualOwnership::Unowned => {}
                    }
                }
                other => {
                    return_attributes.insert(*other);
                }
            }
        }
        state
            .attribute_map
            .add_attributes(AccessPath::of_ident(*id), return_attributes);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Branches
    // ═══════════════════════════════════════════════════════════════════════

    fn exec_prune(state: &mut AbstractState, cond: &Exp) {
        let resolve = |id: Ident| state.resolve(id);
        let Some(path) = AccessPath::first_in_exp(cond, &resolve) else {
            return;
        };
        let choices = state.attribute_map.choices(&path);
        if choices.is_empty() {
            return;
        }
        let Some(value) = eval_bexp(&path, cond, &resolve) else {
            return;
        };
        for choice in choices {
            match choice {
                Choice::LockHeld => state.locks_held = value,
                Choice::OnMainThread => state.thread_confined = value,
            }
        }
    }
}

enum ActualOwnership {
    Constant,
    Owned,
    Formal(usize),
    Unowned,
}

/// Value of `exp` assuming `var` is true; `None` when it cannot be folded
fn eval_bexp<F>(var: &AccessPath, exp: &Exp, resolve: &F) -> Option<bool>
where
    F: Fn(Ident) -> Option<AccessPath>,
{
    match exp {
        Exp::Const(c) => Some(!c.is_zero()),
        Exp::UnOp(UnOp::LNot, inner) => eval_bexp(var, inner, resolve).map(|b| !b),
        Exp::BinOp(op, lhs, rhs) => {
            let lhs = eval_bexp(var, lhs, resolve);
            let rhs = eval_bexp(var, rhs, resolve);
            let (lhs, rhs) = (lhs?, rhs?);
            match op {
                BinOp::LAnd => Some(lhs && rhs),
                BinOp::LOr => Some(lhs || rhs),
                BinOp::Eq => Some(lhs == rhs),
                BinOp::Ne => Some(lhs != rhs),
                _ => None,
            }
        }
        Exp::UnOp(..) => None,
        _ => AccessPath::of_exp(exp, resolve)
            .filter(|path| path == var)
            .map(|_| true),
    }
}
