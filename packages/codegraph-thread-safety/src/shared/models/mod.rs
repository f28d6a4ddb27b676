//! Shared models
//!
//! The program representation consumed by the checker: instructions,
//! procedures with their CFGs, and the type environment.

mod builder;
mod ir;
mod location;
mod procedure;
mod program;
mod tenv;

pub use builder::ProcDescBuilder;
pub use ir::{
    BinOp, Builtin, Callee, Const, Exp, FieldName, Ident, Instr, Pvar, Typ, UnOp, Var, RETURN_VAR,
    THIS_VAR,
};
pub use location::Location;
pub use procedure::{
    CfgNode, FormalMap, NodeId, ProcAccess, ProcAttributes, ProcDesc, ProcName,
};
pub use program::Program;
pub use tenv::{AnnotationKind, ClassDecl, FieldDecl, MethodDecl, TypeEnvironment};
