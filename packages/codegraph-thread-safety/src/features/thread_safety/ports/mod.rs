/// Thread-safety ports
pub mod annotation_oracle;
pub mod diagnostic_sink;
pub mod procedure_provider;
pub mod summary_store;
pub mod thread_safety_checker_port;

pub use annotation_oracle::*;
pub use diagnostic_sink::*;
pub use procedure_provider::*;
pub use summary_store::*;
pub use thread_safety_checker_port::*;
