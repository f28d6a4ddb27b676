/// Thread-safety application layer (use cases)
pub mod check_thread_safety;

pub use check_thread_safety::*;
