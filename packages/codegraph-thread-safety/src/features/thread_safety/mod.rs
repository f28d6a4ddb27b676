pub mod application;
/// Thread-Safety Analysis Feature
///
/// Summary-based data race detection for Java-like programs.
///
/// ## Features
/// - **Ownership tracking**: fresh objects and owned formals never race
/// - **Lock scoping**: accesses under a held lock (or `synchronized`) are protected
/// - **Thread confinement**: main-thread-only code is exempt from write reports
/// - **Compositional**: callee summaries are spliced at call sites, memoized
///
/// ## Architecture
/// - **Domain**: AccessPath, AttributeMap, AccessMap, AbstractState, Summary, Diagnostic
/// - **Infrastructure**: transfer function, worklist solver, analyzer, reporter
/// - **Application**: `ThreadSafetyChecker` use case
/// - **Ports**: AnnotationOracle, ProcedureProvider, SummaryStore, DiagnosticSink
///
/// ## Reports
/// - `UNPROTECTED_WRITE`: unsynchronized write in a non-private method
/// - `READ_WRITE_RACE`: unsynchronized read racing with a write elsewhere
///
/// ## Academic References
/// - RacerD: Blackshear et al. (OOPSLA 2018)
pub mod domain;
pub mod infrastructure;
pub mod ports;

// Re-export application layer (primary interface)
pub use application::*;

// Re-export domain types
pub use domain::*;

// Re-export infrastructure (internal use - prefer application layer)
#[doc(hidden)]
pub use infrastructure::*;

pub use ports::*;
