//! Cross-procedure conflict detection and reporting
//!
//! # Algorithm
//! For each reportable procedure of a file:
//! 1. Unprotected accesses of its summary, split into writes and reads
//! 2. `de_dup` both sets
//! 3. Drop reads located where a write of the same procedure is
//! 4. Unless the procedure is threaded, every write is an unprotected write
//! 5. Every read conflicting with an unprotected write of another procedure
//!    is a read/write race, unless both sides are threaded
//!
//! Only equal access lists conflict: `add` on a container does not conflict
//! with `get` on the same container.
//!
//! The results table is built once per file and is read-only afterwards, so
//! the per-procedure pass can run on the rayon pool.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::analyzer::ThreadSafetyAnalyzer;
use super::error::{Result, ThreadSafetyError};
use crate::config::ThreadSafetyConfig;
use crate::features::thread_safety::domain::{
    de_dup, AccessKind, AccessPath, Diagnostic, IssueKind, Summary, TraceElem, TraceHop,
};
use crate::features::thread_safety::ports::{AnnotationOracle, AnnotationTarget, DiagnosticSink};
use crate::shared::models::{AnnotationKind, ProcAccess, ProcDesc, ProcName};

/// Procedure plus its summary
#[derive(Debug, Clone)]
pub struct ProcResult<'a> {
    pub proc_desc: &'a ProcDesc,
    pub summary: Arc<Summary>,
}

/// Summaries of every procedure of one file
#[derive(Debug, Clone, Default)]
pub struct ResultsTable<'a> {
    entries: BTreeMap<ProcName, ProcResult<'a>>,
}

impl<'a> ResultsTable<'a> {
    /// One entry per procedure; summaries are computed on demand
    pub fn build(procedures: &[&'a ProcDesc], analyzer: &ThreadSafetyAnalyzer<'_>) -> Result<Self> {
        let entries = procedures
            .iter()
            .try_fold(BTreeMap::new(), |mut entries, &pdesc| {
                let summary = analyzer
                    .compute_and_store_post(pdesc)?
                    .unwrap_or_else(|| Arc::new(Summary::empty()));
                entries.insert(
                    pdesc.name().clone(),
                    ProcResult {
                        proc_desc: pdesc,
                        summary,
                    },
                );
                Ok::<_, ThreadSafetyError>(entries)
            })?;
        Ok(Self { entries })
    }

    pub fn get(&self, name: &ProcName) -> Option<&ProcResult<'a>> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProcName, &ProcResult<'a>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct ThreadSafetyReporter<'a> {
    oracle: &'a dyn AnnotationOracle,
    config: &'a ThreadSafetyConfig,
}

impl<'a> ThreadSafetyReporter<'a> {
    pub fn new(oracle: &'a dyn AnnotationOracle, config: &'a ThreadSafetyConfig) -> Self {
        Self { oracle, config }
    }

    fn is_thread_safe_class(&self, class: &str) -> bool {
        self.oracle
            .has_annotation(AnnotationTarget::Class(class), AnnotationKind::ThreadSafe)
    }

    /// Some class of the file (or an ancestor) is @ThreadSafe and none is
    /// @NotThreadSafe
    pub fn file_is_eligible(&self, table: &ResultsTable<'_>) -> bool {
        let classes: BTreeSet<&str> = table
            .iter()
            .map(|(name, _)| name.class_name.as_str())
            .collect();
        let thread_safe = classes
            .iter()
            .any(|class| self.oracle.class_or_ancestor_has(class, AnnotationKind::ThreadSafe));
        let not_thread_safe = classes
            .iter()
            .any(|class| self.oracle.class_or_ancestor_has(class, AnnotationKind::NotThreadSafe));
        thread_safe && !not_thread_safe
    }

    pub fn should_report(&self, pdesc: &ProcDesc, file_eligible: bool) -> bool {
        let name = pdesc.name();
        pdesc.attributes.access != ProcAccess::Private
            && !name.is_autogenerated()
            && !name.is_constructor()
            && !name.is_class_initializer()
            && !pdesc.has_annotation(AnnotationKind::VisibleForTesting)
            && (file_eligible
                || self
                    .oracle
                    .overrides_annotated_method(name, AnnotationKind::ThreadSafe))
    }

    /// Diagnostics for one file, sorted by location, kind and procedure
    pub fn report(&self, table: &ResultsTable<'_>) -> Vec<Diagnostic> {
        let file_eligible = self.file_is_eligible(table);
        debug!(procedures = table.len(), file_eligible, "reporting file");

        let reportable: Vec<&ProcResult<'_>> = table
            .iter()
            .map(|(_, result)| result)
            .filter(|result| !result.summary.is_empty())
            .filter(|result| self.should_report(result.proc_desc, file_eligible))
            .collect();

        let mut diagnostics: Vec<Diagnostic> = if self.config.parallel_reporting && cfg!(feature = "parallel") {
            reportable
                .par_iter()
                .flat_map_iter(|result| self.report_procedure(result, table))
                .collect()
        } else {
            reportable
                .iter()
                .flat_map(|result| self.report_procedure(result, table))
                .collect()
        };
        diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        if !diagnostics.is_empty() {
            info!(violations = diagnostics.len(), "thread-safety violations found");
        }
        diagnostics
    }

    pub fn report_to(&self, table: &ResultsTable<'_>, sink: &mut dyn DiagnosticSink) {
        for diagnostic in self.report(table) {
            sink.report(diagnostic);
        }
    }

    fn report_procedure(&self, result: &ProcResult<'_>, table: &ResultsTable<'_>) -> Vec<Diagnostic> {
        let pdesc = result.proc_desc;
        let summary = &result.summary;
        let mut diagnostics = Vec::new();

        let writes = de_dup(summary.accesses.unprotected().filter(|elem| elem.is_write()));
        let write_locs: BTreeSet<_> = writes.iter().map(|elem| elem.outermost_loc().clone()).collect();
        let reads: Vec<TraceElem> =
            de_dup(summary.accesses.unprotected().filter(|elem| !elem.is_write()))
                .into_iter()
                .filter(|elem| !write_locs.contains(elem.outermost_loc()))
                .collect();

        if !summary.threaded && self.config.report_unprotected_writes {
            for write in &writes {
                diagnostics.push(self.make_diagnostic(
                    IssueKind::UnprotectedWrite,
                    pdesc,
                    write,
                    Vec::new(),
                ));
            }
        }

        if self.config.report_read_write_races {
            for read in &reads {
                let conflicts = Self::conflicting_writers(pdesc.name(), summary, read, table);
                if !conflicts.is_empty() {
                    diagnostics.push(self.make_diagnostic(
                        IssueKind::ReadWriteRace,
                        pdesc,
                        read,
                        conflicts,
                    ));
                }
            }
        }
        diagnostics
    }

    /// Other procedures with an unprotected write to the same access list
    fn conflicting_writers(
        reader: &ProcName,
        reader_summary: &Summary,
        read: &TraceElem,
        table: &ResultsTable<'_>,
    ) -> Vec<ProcName> {
        table
            .iter()
            .filter(|(name, _)| *name != reader)
            .filter(|(_, other)| !(reader_summary.threaded && other.summary.threaded))
            .filter(|(_, other)| {
                other
                    .summary
                    .accesses
                    .unprotected()
                    .any(|elem| elem.is_write() && elem.access.path.equal_access_list(&read.access.path))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn make_diagnostic(
        &self,
        kind: IssueKind,
        pdesc: &ProcDesc,
        elem: &TraceElem,
        conflicts: Vec<ProcName>,
    ) -> Diagnostic {
        let proc_name = pdesc.name();
        let access = &elem.access;
        let description = match (kind, &access.container_method) {
            (IssueKind::UnprotectedWrite, Some(method)) => format!(
                "Unprotected write. Non-private method `{}` mutates container `{}` via call to `{}` outside of synchronization.",
                proc_name.to_simplified_string(),
                container_of(&access.path),
                method
            ),
            (IssueKind::UnprotectedWrite, None) => format!(
                "Unprotected write. Non-private method `{}` writes to field `{}` outside of synchronization.",
                proc_name.to_simplified_string(),
                access.path
            ),
            (IssueKind::ReadWriteRace, _) => format!(
                "Read/Write race. Non-private method `{}` reads from field `{}`. Potentially races with writes in method(s) {}.",
                proc_name.to_simplified_string(),
                access.path,
                conflicts
                    .iter()
                    .map(|name| format!("`{}`", name.to_simplified_string()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let message = match self.reporting_explanation(proc_name) {
            Some(explanation) => format!("{} {}", description, explanation),
            None => description,
        };

        Diagnostic {
            kind,
            proc_name: proc_name.clone(),
            location: elem.outermost_loc().clone(),
            message,
            access: match &access.container_method {
                Some(_) => container_of(&access.path).to_string(),
                None => access.path.to_string(),
            },
            conflicts,
            trace: build_trace(elem),
        }
    }

    /// Why the procedure is reported when its own class is not @ThreadSafe
    fn reporting_explanation(&self, proc_name: &ProcName) -> Option<String> {
        let class = proc_name.class_name.as_str();
        if self.is_thread_safe_class(class) {
            return None;
        }
        let annotated = self
            .oracle
            .find_annotated_superclasses(class, &|c| self.is_thread_safe_class(c));
        if let Some(superclass) = annotated.first() {
            return Some(format!(
                "Reporting because a superclass `{}` is annotated @ThreadSafe",
                superclass
            ));
        }
        if self
            .oracle
            .overrides_annotated_method(proc_name, AnnotationKind::ThreadSafe)
        {
            return Some("Reporting because the method overrides a method annotated @ThreadSafe".to_string());
        }
        None
    }
}

/// Container path of a `__contents` access
fn container_of(path: &AccessPath) -> AccessPath {
    if path.is_container_contents() {
        path.truncate()
    } else {
        path.clone()
    }
}

/// Call-site hops from the reporting procedure, then the access itself
fn build_trace(elem: &TraceElem) -> Vec<TraceHop> {
    let mut trace: Vec<TraceHop> = elem
        .call_chain
        .iter()
        .map(|site| {
            TraceHop::new(
                site.loc.clone(),
                format!("call to `{}`", site.proc_name.to_simplified_string()),
            )
        })
        .collect();
    let access = &elem.access;
    let description = match (access.kind, &access.container_method) {
        (AccessKind::Write, Some(method)) => format!(
            "mutates container `{}` via call to `{}`",
            container_of(&access.path),
            method
        ),
        (AccessKind::Write, None) => format!("writes to field `{}`", access.path),
        (AccessKind::Read, _) => format!("reads from field `{}`", access.path),
    };
    trace.push(TraceHop::new(elem.loc.clone(), description));
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::thread_safety::domain::{Access, AccessPrecondition, CallSite};
    use crate::shared::models::{
        ClassDecl, FieldName, Location, ProcDescBuilder, Pvar, TypeEnvironment,
    };

    const FILE: &str = "Foo.java";

    fn path(field: &str) -> AccessPath {
        AccessPath::of_pvar(Pvar::this()).with_field(FieldName::new("a.Foo", field))
    }

    fn summary(threaded: bool, elems: Vec<(AccessPrecondition, TraceElem)>) -> Arc<Summary> {
        let mut summary = Summary::empty();
        summary.threaded = threaded;
        for (pre, elem) in elems {
            summary.accesses.add(pre, elem);
        }
        Arc::new(summary)
    }

    fn write(field: &str, line: u32) -> TraceElem {
        TraceElem::new(Access::write(path(field)), Location::line(FILE, line))
    }

    fn read(field: &str, line: u32) -> TraceElem {
        TraceElem::new(Access::read(path(field)), Location::line(FILE, line))
    }

    fn unprotected() -> AccessPrecondition {
        AccessPrecondition::Unprotected(Some(0))
    }

    fn table<'a>(pdescs: &'a [ProcDesc], summaries: Vec<Arc<Summary>>) -> ResultsTable<'a> {
        let entries = pdescs
            .iter()
            .zip(summaries)
            .map(|(pdesc, summary)| {
                (
                    pdesc.name().clone(),
                    ProcResult {
                        proc_desc: pdesc,
                        summary,
                    },
                )
            })
            .collect();
        ResultsTable { entries }
    }

    fn thread_safe_tenv() -> TypeEnvironment {
        TypeEnvironment::new().with_class(ClassDecl::new("a.Foo").with_annotation(AnnotationKind::ThreadSafe))
    }

    fn method(name: &str) -> ProcDesc {
        ProcDescBuilder::instance_method(ProcName::new("a.Foo", name), FILE).build()
    }

    #[test]
    fn test_unprotected_write_message() {
        let tenv = thread_safe_tenv();
        let config = ThreadSafetyConfig::default();
        let pdescs = vec![method("foo")];
        let table = table(&pdescs, vec![summary(false, vec![(unprotected(), write("x", 4))])]);

        let diagnostics = ThreadSafetyReporter::new(&tenv, &config).report(&table);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, IssueKind::UnprotectedWrite);
        assert_eq!(
            diagnostics[0].message,
            "Unprotected write. Non-private method `Foo.foo()` writes to field `this.x` outside of synchronization."
        );
        assert_eq!(diagnostics[0].access, "this.x");
    }

    #[test]
    fn test_file_gate() {
        let config = ThreadSafetyConfig::default();
        let pdescs = vec![method("foo")];
        let table = table(&pdescs, vec![summary(false, vec![(unprotected(), write("x", 4))])]);

        let plain = TypeEnvironment::new();
        assert!(ThreadSafetyReporter::new(&plain, &config).report(&table).is_empty());

        let not_safe = TypeEnvironment::new().with_class(
            ClassDecl::new("a.Foo")
                .with_annotation(AnnotationKind::ThreadSafe)
                .with_annotation(AnnotationKind::NotThreadSafe),
        );
        assert!(ThreadSafetyReporter::new(&not_safe, &config).report(&table).is_empty());
    }

    #[test]
    fn test_private_and_autogenerated_not_reported() {
        let tenv = thread_safe_tenv();
        let config = ThreadSafetyConfig::default();
        let reporter = ThreadSafetyReporter::new(&tenv, &config);

        let private = ProcDescBuilder::instance_method(ProcName::new("a.Foo", "p"), FILE)
            .access(ProcAccess::Private)
            .build();
        let autogen = method("access$000");
        let testing = ProcDescBuilder::instance_method(ProcName::new("a.Foo", "t"), FILE)
            .annotate(AnnotationKind::VisibleForTesting)
            .build();

        assert!(!reporter.should_report(&private, true));
        assert!(!reporter.should_report(&autogen, true));
        assert!(!reporter.should_report(&testing, true));
        assert!(reporter.should_report(&method("foo"), true));
        assert!(!reporter.should_report(&method("foo"), false));
    }

    #[test]
    fn test_read_write_race_names_writers() {
        let tenv = thread_safe_tenv();
        let config = ThreadSafetyConfig::default().report_unprotected_writes(false);
        let pdescs = vec![method("read"), method("write")];
        let table = table(
            &pdescs,
            vec![
                summary(false, vec![(unprotected(), read("x", 3))]),
                summary(false, vec![(unprotected(), write("x", 8))]),
            ],
        );

        let diagnostics = ThreadSafetyReporter::new(&tenv, &config).report(&table);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, IssueKind::ReadWriteRace);
        assert_eq!(diagnostics[0].conflicts, vec![ProcName::new("a.Foo", "write")]);
        assert!(diagnostics[0].message.contains("`Foo.write()`"));
    }

    #[test]
    fn test_protected_writer_does_not_conflict() {
        let tenv = thread_safe_tenv();
        let config = ThreadSafetyConfig::default();
        let pdescs = vec![method("read"), method("write")];
        let table = table(
            &pdescs,
            vec![
                summary(false, vec![(unprotected(), read("x", 3))]),
                summary(false, vec![(AccessPrecondition::Protected, write("x", 8))]),
            ],
        );

        assert!(ThreadSafetyReporter::new(&tenv, &config).report(&table).is_empty());
    }

    #[test]
    fn test_read_at_write_location_is_stripped() {
        let tenv = thread_safe_tenv();
        let config = ThreadSafetyConfig::default();
        let pdescs = vec![method("incr"), method("other")];
        let table = table(
            &pdescs,
            vec![
                summary(
                    false,
                    vec![(unprotected(), read("n", 3)), (unprotected(), write("n", 3))],
                ),
                summary(false, vec![(unprotected(), write("n", 9))]),
            ],
        );

        let diagnostics = ThreadSafetyReporter::new(&tenv, &config).report(&table);
        let kinds: Vec<IssueKind> = diagnostics
            .iter()
            .filter(|d| d.proc_name.method_name == "incr")
            .map(|d| d.kind)
            .collect();
        assert_eq!(kinds, vec![IssueKind::UnprotectedWrite]);
    }

    #[test]
    fn test_superclass_explanation_and_trace() {
        let tenv = TypeEnvironment::new()
            .with_class(ClassDecl::new("a.Base").with_annotation(AnnotationKind::ThreadSafe))
            .with_class(ClassDecl::new("a.Foo").with_super("a.Base"));
        let config = ThreadSafetyConfig::default();
        let pdescs = vec![method("foo")];
        let nested = write("x", 20).with_callsite(CallSite::new(
            ProcName::new("a.Foo", "helper"),
            Location::line(FILE, 6),
        ));
        let table = table(&pdescs, vec![summary(false, vec![(unprotected(), nested)])]);

        let diagnostics = ThreadSafetyReporter::new(&tenv, &config).report(&table);
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics[0];
        assert!(diagnostic
            .message
            .ends_with("Reporting because a superclass `a.Base` is annotated @ThreadSafe"));
        assert_eq!(diagnostic.location.line, 6);
        assert_eq!(diagnostic.trace.len(), 2);
        assert_eq!(diagnostic.trace[0].description, "call to `Foo.helper()`");
        assert_eq!(diagnostic.trace[1].description, "writes to field `this.x`");
    }

    #[test]
    fn test_container_write_message() {
        let tenv = thread_safe_tenv();
        let config = ThreadSafetyConfig::default();
        let pdescs = vec![method("add")];
        let contents = path("items").with_field(FieldName::new("java.util.List", "__contents"));
        let elem = TraceElem::new(Access::container_write(contents, "add"), Location::line(FILE, 4));
        let table = table(&pdescs, vec![summary(false, vec![(unprotected(), elem)])]);

        let diagnostics = ThreadSafetyReporter::new(&tenv, &config).report(&table);
        assert_eq!(diagnostics[0].access, "this.items");
        assert!(diagnostics[0]
            .message
            .contains("mutates container `this.items` via call to `add`"));
    }

    #[test]
    fn test_threaded_pairs_are_exempt() {
        let tenv = thread_safe_tenv();
        let config = ThreadSafetyConfig::default();
        let pdescs = vec![method("a"), method("b")];
        let table = table(
            &pdescs,
            vec![
                summary(true, vec![(unprotected(), read("x", 3)), (unprotected(), write("y", 4))]),
                summary(true, vec![(unprotected(), write("x", 8)), (unprotected(), read("y", 9))]),
            ],
        );

        assert!(ThreadSafetyReporter::new(&tenv, &config).report(&table).is_empty());
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let tenv = thread_safe_tenv();
        let pdescs = vec![method("a"), method("b"), method("c")];
        let table = table(
            &pdescs,
            vec![
                summary(false, vec![(unprotected(), read("x", 3))]),
                summary(false, vec![(unprotected(), write("x", 8))]),
                summary(false, vec![(unprotected(), write("y", 12)), (unprotected(), read("x", 13))]),
            ],
        );

        let parallel = ThreadSafetyConfig::default();
        let sequential = ThreadSafetyConfig::default().parallel_reporting(false);
        assert_eq!(
            ThreadSafetyReporter::new(&tenv, &parallel).report(&table),
            ThreadSafetyReporter::new(&tenv, &sequential).report(&table)
        );
    }
}
