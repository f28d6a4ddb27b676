//! Thread-Safety Check Use Case
//!
//! ## Algorithm
//! 1. Group the program's procedures by source file
//! 2. Per file, fold the procedures into a `ResultsTable`, computing callee
//!    summaries on demand through the shared summary store
//! 3. Run the reporter over the read-only table
//! 4. Hand the per-file diagnostics to a `DiagnosticSink` in file order
//!
//! Summaries are memoized across files: a callee analyzed for one file is
//! not re-analyzed for the next.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ThreadSafetyConfig;
use crate::features::thread_safety::domain::{Diagnostic, IssueKind, Summary};
use crate::features::thread_safety::infrastructure::{
    InMemorySummaryStore, Result, ResultsTable, ThreadSafetyAnalyzer, ThreadSafetyReporter,
};
use crate::features::thread_safety::ports::{DiagnosticSink, SummaryStore, ThreadSafetyCheckerPort};
use crate::shared::models::{ProcDesc, ProcName, Program};

/// Counters of one check run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckStats {
    pub files: usize,
    pub procedures: usize,
    pub summaries_computed: usize,
    pub skipped: usize,
    pub unprotected_writes: usize,
    pub read_write_races: usize,
}

/// Diagnostics plus statistics of one check run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
    pub stats: CheckStats,
}

impl CheckReport {
    pub fn has_violations(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Check whole programs (or single files) for data races
///
/// The checker owns the summary store; `run` starts from an empty store so
/// summaries of a previous program never leak into the next one.
pub struct ThreadSafetyChecker {
    config: ThreadSafetyConfig,
    store: InMemorySummaryStore,
}

impl ThreadSafetyChecker {
    pub fn new(config: ThreadSafetyConfig) -> Self {
        Self {
            config,
            store: InMemorySummaryStore::new(),
        }
    }

    pub fn config(&self) -> &ThreadSafetyConfig {
        &self.config
    }

    /// Summaries computed so far, ordered by procedure name
    pub fn summaries(&self) -> BTreeMap<ProcName, Arc<Summary>> {
        self.store.snapshot()
    }

    /// Analyze and report every source file of `program`
    pub fn run(&self, program: &Program) -> Result<CheckReport> {
        let mut diagnostics = Vec::new();
        let stats = self.run_with_sink(program, &mut diagnostics)?;
        Ok(CheckReport { diagnostics, stats })
    }

    /// Like `run`, but streams diagnostics into `sink` as each file finishes
    pub fn run_with_sink(&self, program: &Program, sink: &mut dyn DiagnosticSink) -> Result<CheckStats> {
        self.store.clear();
        let computed_before = self.store.computations();
        let analyzer = ThreadSafetyAnalyzer::new(program, &program.tenv, &self.store, &self.config);

        let mut stats = CheckStats::default();
        for (file, procedures) in program.source_files() {
            stats.files += 1;
            stats.procedures += procedures.len();
            stats.skipped += procedures
                .iter()
                .filter(|pdesc| analyzer.skip_reason(pdesc).is_some())
                .count();
            let mut counting = CountingSink {
                inner: &mut *sink,
                stats: &mut stats,
            };
            self.check_procedures(&analyzer, file, &procedures, &mut counting)?;
        }
        stats.summaries_computed = self.store.computations() - computed_before;

        info!(
            files = stats.files,
            procedures = stats.procedures,
            summaries = stats.summaries_computed,
            violations = stats.unprotected_writes + stats.read_write_races,
            "thread-safety check complete"
        );
        Ok(stats)
    }

    fn check_procedures(
        &self,
        analyzer: &ThreadSafetyAnalyzer<'_>,
        file: &str,
        procedures: &[&ProcDesc],
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()> {
        debug!(file, procedures = procedures.len(), "checking file");
        let table = ResultsTable::build(procedures, analyzer)?;
        let reporter = ThreadSafetyReporter::new(analyzer.oracle(), &self.config);
        reporter.report_to(&table, sink);
        Ok(())
    }
}

/// Forwards diagnostics while counting them by kind
struct CountingSink<'s> {
    inner: &'s mut dyn DiagnosticSink,
    stats: &'s mut CheckStats,
}

impl DiagnosticSink for CountingSink<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            IssueKind::UnprotectedWrite => self.stats.unprotected_writes += 1,
            IssueKind::ReadWriteRace => self.stats.read_write_races += 1,
        }
        self.inner.report(diagnostic);
    }
}

impl Default for ThreadSafetyChecker {
    fn default() -> Self {
        Self::new(ThreadSafetyConfig::default())
    }
}

impl ThreadSafetyCheckerPort for ThreadSafetyChecker {
    fn check_file(&self, program: &Program, file: &str) -> Result<Vec<Diagnostic>> {
        let analyzer = ThreadSafetyAnalyzer::new(program, &program.tenv, &self.store, &self.config);
        let files = program.source_files();
        let mut diagnostics = Vec::new();
        if let Some(procedures) = files.get(file) {
            self.check_procedures(&analyzer, file, procedures, &mut diagnostics)?;
        }
        Ok(diagnostics)
    }

    fn check_program(&self, program: &Program) -> Result<Vec<Diagnostic>> {
        Ok(self.run(program)?.diagnostics)
    }
}
