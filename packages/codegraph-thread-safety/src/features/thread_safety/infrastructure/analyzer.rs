//! Per-procedure driver
//!
//! Decides whether a procedure is analyzed at all, seeds its entry state,
//! runs the worklist solver with the transfer function and packages the
//! post-state as a `Summary`. Summaries are memoized in the injected
//! `SummaryStore`; callee summaries are computed on demand.
//!
//! # Degradation
//! Divergence, malformed CFGs and unreachable exits yield `Summary::empty()`
//! for that procedure. Only invariant violations propagate.

use std::sync::Arc;
use tracing::{debug, warn};

use super::api_catalog::ApiCatalog;
use super::error::Result;
use super::fixpoint::WorklistSolver;
use super::transfer::{SummaryReader, ThreadSafetyTransfer};
use crate::config::ThreadSafetyConfig;
use crate::features::thread_safety::domain::{AbstractState, AccessPath, Attribute, Summary};
use crate::features::thread_safety::ports::{
    AnnotationOracle, AnnotationTarget, ProcedureProvider, SummaryStore,
};
use crate::shared::models::{AnnotationKind, ProcDesc, ProcName, Pvar};

/// Why a procedure is not analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ClassInitializer,
    LoggingClass,
    BuilderClass,
    ImmutableCollection,
    UiThread,
    ThreadConfined,
    AssumeThreadSafe,
}

pub struct ThreadSafetyAnalyzer<'a> {
    procedures: &'a dyn ProcedureProvider,
    oracle: &'a dyn AnnotationOracle,
    store: &'a dyn SummaryStore,
    config: &'a ThreadSafetyConfig,
    catalog: ApiCatalog,
}

impl<'a> ThreadSafetyAnalyzer<'a> {
    pub fn new(
        procedures: &'a dyn ProcedureProvider,
        oracle: &'a dyn AnnotationOracle,
        store: &'a dyn SummaryStore,
        config: &'a ThreadSafetyConfig,
    ) -> Self {
        let catalog = ApiCatalog::new(
            config.extra_api_models.clone(),
            config.extra_thread_safe_containers.clone(),
            config.builder_class_suffix.clone(),
        );
        Self {
            procedures,
            oracle,
            store,
            config,
            catalog,
        }
    }

    pub fn oracle(&self) -> &'a dyn AnnotationOracle {
        self.oracle
    }

    pub fn catalog(&self) -> &ApiCatalog {
        &self.catalog
    }

    pub fn skip_reason(&self, pdesc: &ProcDesc) -> Option<SkipReason> {
        let name = pdesc.name();
        let class = name.class_name.as_str();
        let on_method_or_class = |kind: AnnotationKind| {
            pdesc.has_annotation(kind)
                || self.oracle.overrides_annotated_method(name, kind)
                || self.oracle.class_or_ancestor_has(class, kind)
        };

        if name.is_class_initializer() {
            Some(SkipReason::ClassInitializer)
        } else if self.catalog.is_logging_class(class, self.oracle) {
            Some(SkipReason::LoggingClass)
        } else if self.catalog.is_builder_class(class) {
            Some(SkipReason::BuilderClass)
        } else if self.catalog.is_immutable_collection(class, self.oracle) {
            Some(SkipReason::ImmutableCollection)
        } else if on_method_or_class(AnnotationKind::UiThread) {
            Some(SkipReason::UiThread)
        } else if on_method_or_class(AnnotationKind::ThreadConfined) {
            Some(SkipReason::ThreadConfined)
        } else if pdesc.has_annotation(AnnotationKind::AssumeThreadSafe)
            || self
                .oracle
                .has_annotation(AnnotationTarget::Method(name), AnnotationKind::AssumeThreadSafe)
        {
            Some(SkipReason::AssumeThreadSafe)
        } else {
            None
        }
    }

    fn is_initializer(&self, name: &ProcName) -> bool {
        name.is_constructor()
            || self.config.custom_initializers.iter().any(|init| {
                init.method_name == name.method_name
                    && self
                        .oracle
                        .ancestors(&name.class_name)
                        .iter()
                        .any(|class| *class == init.class_name)
            })
    }

    /// Entry state: every formal `i` is `OwnedIf(i)`; initializers own their
    /// receiver, or every formal when injected
    pub fn initial_state(&self, pdesc: &ProcDesc) -> AbstractState {
        let mut state = AbstractState::new();
        let formals = &pdesc.attributes.formals;
        for (index, (pvar, _)) in formals.iter().enumerate() {
            state
                .attribute_map
                .add_attribute(AccessPath::of_pvar(pvar.clone()), Attribute::OwnedIf(index));
        }

        if !pdesc.attributes.is_static && self.is_initializer(pdesc.name()) {
            let owned = if pdesc.has_annotation(AnnotationKind::Inject) {
                formals.len()
            } else {
                1
            };
            for (pvar, _) in formals.iter().take(owned) {
                state.attribute_map.add_attribute(
                    AccessPath::of_pvar(pvar.clone()),
                    Attribute::UnconditionallyOwned,
                );
            }
        }
        state
    }

    /// Run the analysis on one procedure without consulting the store for it
    pub fn analyze_procedure(&self, pdesc: &ProcDesc) -> Result<Summary> {
        if let Some(reason) = self.skip_reason(pdesc) {
            debug!(proc = %pdesc.name(), ?reason, "skipping procedure");
            return Ok(Summary::empty());
        }

        let transfer = ThreadSafetyTransfer::new(pdesc, self.oracle, &self.catalog, self);
        let solver =
            WorklistSolver::new(pdesc).with_max_iterations(self.config.max_fixpoint_iterations);

        match solver.solve(self.initial_state(pdesc), |state, instr| {
            transfer.exec_instr(state, instr)
        }) {
            Ok(Some(post)) => {
                let return_attributes = post
                    .attribute_map
                    .attributes(&AccessPath::of_pvar(Pvar::return_var()));
                let summary = Summary::from_post(post, return_attributes);
                debug!(
                    proc = %pdesc.name(),
                    accesses = summary.accesses.len(),
                    threaded = summary.threaded,
                    "summary computed"
                );
                Ok(summary)
            }
            Ok(None) => {
                debug!(proc = %pdesc.name(), "exit node unreachable, empty summary");
                Ok(Summary::empty())
            }
            Err(err) if err.is_recoverable() => {
                warn!(proc = %pdesc.name(), error = %err, "analysis failed, empty summary");
                Ok(Summary::empty())
            }
            Err(err) => Err(err),
        }
    }

    /// Compute (once) and persist the summary of `pdesc`
    ///
    /// `None` when the procedure is already being computed further up the
    /// call stack.
    pub fn compute_and_store_post(&self, pdesc: &ProcDesc) -> Result<Option<Arc<Summary>>> {
        self.store
            .get_or_compute(pdesc.name(), &mut || self.analyze_procedure(pdesc))
    }

    /// Cached or freshly computed summary of `name`; `None` for procedures
    /// without a body
    pub fn summary_of(&self, name: &ProcName) -> Result<Option<Arc<Summary>>> {
        if let Some(summary) = self.store.get(name) {
            return Ok(Some(summary));
        }
        match self.procedures.proc_desc(name) {
            Some(pdesc) => self.compute_and_store_post(pdesc),
            None => Ok(None),
        }
    }
}

impl SummaryReader for ThreadSafetyAnalyzer<'_> {
    fn read_summary(&self, caller: &ProcName, callee: &ProcName) -> Result<Option<Arc<Summary>>> {
        let summary = self.summary_of(callee)?;
        if summary.is_none() {
            tracing::trace!(caller = %caller, callee = %callee, "no callee summary");
        }
        Ok(summary)
    }
}
