/*
 * Codegraph Thread-Safety - Summary-Based Data Race Checker
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Program IR model (ProcDesc, Instr, Exp, TypeEnvironment)
 * - features/    : Vertical slices (thread_safety: domain → ports → infrastructure → application)
 * - config/      : Typed configuration with YAML IO
 *
 * Analysis:
 * - Per-procedure abstract interpretation (worklist fixpoint)
 * - Memoized callee summaries spliced at call sites
 * - Cross-procedure conflict detection per source file (Rayon)
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Transfer helpers thread state explicitly
#![allow(clippy::type_complexity)] // Nested lattice maps
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::upper_case_acronyms)] // IR naming

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models (program IR)
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::ThreadSafetyConfig;
pub use errors::{Result, ThreadSafetyCheckError};
pub use features::thread_safety::{
    CheckReport, CheckStats, Diagnostic, IssueKind, Summary, ThreadSafetyChecker,
};
pub use shared::models::Program;

/// Check every file of `program` with `config`
///
/// Convenience entry point; use [`ThreadSafetyChecker`] directly to inspect
/// summaries after the run.
pub fn check_program(program: &Program, config: &ThreadSafetyConfig) -> Result<CheckReport> {
    config.validate()?;
    let checker = ThreadSafetyChecker::new(config.clone());
    Ok(checker.run(program)?)
}
