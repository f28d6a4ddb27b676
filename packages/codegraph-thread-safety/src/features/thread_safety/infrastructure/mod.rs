/// Thread-Safety Infrastructure
pub mod analyzer;
pub mod api_catalog; // Library models (locks, containers, threads)
pub mod error;
pub mod fixpoint; // Kildall worklist solver
pub mod program_adapter;
pub mod reporter;
pub mod summary_store;
pub mod transfer;

pub use analyzer::*;
pub use api_catalog::*;
pub use error::*;
pub use fixpoint::*;
pub use reporter::*;
pub use summary_store::*;
pub use transfer::*;
