//! Instruction-level IR consumed by the thread-safety checker
//!
//! A small, Java-flavoured three-address IR in the style of Infer's SIL:
//! - Temporaries (`Ident`) are produced by loads and calls
//! - Program variables (`Pvar`) are formals, locals and the return slot
//! - `Lvar`/`Lfield`/`Lindex` expressions denote *addresses*; `Load` and
//!   `Store` dereference them
//! - Branch conditions are `Prune` instructions at the head of each branch

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Location, ProcName};

/// Name of the return slot of every procedure
pub const RETURN_VAR: &str = "return";

/// Name of the receiver formal of instance methods
pub const THIS_VAR: &str = "this";

/// Temporary identifier (`n$3`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ident(pub u32);

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n${}", self.0)
    }
}

/// Program variable (formal, local or the return slot)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pvar(pub String);

impl Pvar {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn this() -> Self {
        Self::new(THIS_VAR)
    }

    pub fn return_var() -> Self {
        Self::new(RETURN_VAR)
    }

    pub fn is_return(&self) -> bool {
        self.0 == RETURN_VAR
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Root of an access path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Var {
    Ident(Ident),
    Program(Pvar),
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Ident(id) => id.fmt(f),
            Var::Program(pvar) => pvar.fmt(f),
        }
    }
}

/// Field of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldName {
    pub class_name: String,
    pub field_name: String,
}

impl FieldName {
    pub fn new(class_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            field_name: field_name.into(),
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field_name)
    }
}

/// Java-like value types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Typ {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    Object(String),
    Array(Box<Typ>),
}

impl Typ {
    pub fn object(class_name: impl Into<String>) -> Self {
        Typ::Object(class_name.into())
    }

    /// 64-bit primitives: reads and writes are not guaranteed atomic
    pub fn is_wide(&self) -> bool {
        matches!(self, Typ::Long | Typ::Double)
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Typ::Object(name) => Some(name),
            _ => None,
        }
    }
}

/// Literal constants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Const {
    Int(i64),
    Null,
    Str(String),
    Class(String),
}

impl Const {
    pub fn is_zero(&self) -> bool {
        matches!(self, Const::Int(0) | Const::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnOp {
    /// Logical not
    LNot,
    Neg,
    BNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LAnd,
    LOr,
    Plus,
    Minus,
    Mult,
}

/// Expressions
///
/// `Lvar`, `Lfield` and `Lindex` are l-values (addresses).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exp {
    Var(Ident),
    Const(Const),
    UnOp(UnOp, Box<Exp>),
    BinOp(BinOp, Box<Exp>, Box<Exp>),
    Lvar(Pvar),
    Lfield(Box<Exp>, FieldName),
    Lindex(Box<Exp>, Box<Exp>),
}

impl Exp {
    pub fn var(id: u32) -> Self {
        Exp::Var(Ident(id))
    }

    pub fn lvar(name: impl Into<String>) -> Self {
        Exp::Lvar(Pvar::new(name))
    }

    pub fn int(value: i64) -> Self {
        Exp::Const(Const::Int(value))
    }

    pub fn null() -> Self {
        Exp::Const(Const::Null)
    }

    pub fn field(base: Exp, field: FieldName) -> Self {
        Exp::Lfield(Box::new(base), field)
    }

    pub fn index(base: Exp, index: Exp) -> Self {
        Exp::Lindex(Box::new(base), Box::new(index))
    }

    pub fn not(exp: Exp) -> Self {
        Exp::UnOp(UnOp::LNot, Box::new(exp))
    }

    pub fn binop(op: BinOp, lhs: Exp, rhs: Exp) -> Self {
        Exp::BinOp(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Exp::Const(_))
    }
}

/// Analyzer builtins
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    /// `new C()` allocation (constructor call follows separately)
    New,
    NewArray,
    /// Checked cast; first argument is the operand
    Cast,
    InstanceOf,
    /// Anything else the front-end emits
    Other(String),
}

/// Call target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callee {
    Builtin(Builtin),
    Method(ProcName),
}

/// Instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instr {
    /// `id = *exp`
    Load {
        id: Ident,
        exp: Exp,
        typ: Typ,
        loc: Location,
    },
    /// `*lhs = rhs`
    Store {
        lhs: Exp,
        typ: Typ,
        rhs: Exp,
        loc: Location,
    },
    /// Assume `cond` holds on this branch
    Prune {
        cond: Exp,
        true_branch: bool,
        loc: Location,
    },
    /// `ret = callee(args)`
    Call {
        ret: Option<(Ident, Typ)>,
        callee: Callee,
        args: Vec<(Exp, Typ)>,
        loc: Location,
    },
    /// Temporaries go out of scope
    ExitScope { vars: Vec<Var>, loc: Location },
    /// Front-end metadata without dataflow effect
    Nop { loc: Location },
}

impl Instr {
    pub fn loc(&self) -> &Location {
        match self {
            Instr::Load { loc, .. }
            | Instr::Store { loc, .. }
            | Instr::Prune { loc, .. }
            | Instr::Call { loc, .. }
            | Instr::ExitScope { loc, .. }
            | Instr::Nop { loc } => loc,
        }
    }
}
