/// Thread-safety checker port trait
use crate::features::thread_safety::domain::Diagnostic;
use crate::features::thread_safety::infrastructure::Result;
use crate::shared::models::Program;

/// Port trait for thread-safety checkers
pub trait ThreadSafetyCheckerPort {
    /// Check one source file of `program`
    fn check_file(&self, program: &Program, file: &str) -> Result<Vec<Diagnostic>>;

    /// Check every source file of `program`
    fn check_program(&self, program: &Program) -> Result<Vec<Diagnostic>>;
}
