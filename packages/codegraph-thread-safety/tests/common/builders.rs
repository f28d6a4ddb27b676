//! Test data builders
//!
//! Small constructors for the IR instructions the scenarios need, plus a
//! builder that assembles a `Program` from classes and procedures.

use codegraph_thread_safety::shared::models::{
    AnnotationKind, Callee, ClassDecl, Exp, FieldName, Ident, Instr, Location, ProcDesc,
    ProcDescBuilder, ProcName, Program, Typ, TypeEnvironment,
};

pub const FILE: &str = "Foo.java";
pub const CLASS: &str = "com.example.Foo";

pub const LOCK: &str = "java.util.concurrent.locks.ReentrantLock";
pub const THREAD_UTILS: &str = "com.example.ThreadUtils";

pub fn loc(line: u32) -> Location {
    Location::line(FILE, line)
}

pub fn field(name: &str) -> FieldName {
    FieldName::new(CLASS, name)
}

/// `n$id = this`
pub fn load_this(id: u32, line: u32) -> Instr {
    Instr::Load {
        id: Ident(id),
        exp: Exp::lvar("this"),
        typ: Typ::object(CLASS),
        loc: loc(line),
    }
}

/// `n$id = <var>`
pub fn load_var(id: u32, var: &str, typ: Typ, line: u32) -> Instr {
    Instr::Load {
        id: Ident(id),
        exp: Exp::lvar(var),
        typ,
        loc: loc(line),
    }
}

/// `n$id = n$base.name`
pub fn load_field(id: u32, base: u32, name: &str, typ: Typ, line: u32) -> Instr {
    Instr::Load {
        id: Ident(id),
        exp: Exp::field(Exp::var(base), field(name)),
        typ,
        loc: loc(line),
    }
}

/// `n$base.name = rhs`
pub fn store_field(base: u32, name: &str, rhs: Exp, line: u32) -> Instr {
    store_typed_field(base, name, Typ::Int, rhs, line)
}

pub fn store_typed_field(base: u32, name: &str, typ: Typ, rhs: Exp, line: u32) -> Instr {
    Instr::Store {
        lhs: Exp::field(Exp::var(base), field(name)),
        typ,
        rhs,
        loc: loc(line),
    }
}

/// `return = rhs`
pub fn store_return(rhs: Exp, line: u32) -> Instr {
    Instr::Store {
        lhs: Exp::lvar("return"),
        typ: Typ::Int,
        rhs,
        loc: loc(line),
    }
}

pub fn call(ret: Option<(u32, Typ)>, callee: ProcName, args: Vec<(Exp, Typ)>, line: u32) -> Instr {
    Instr::Call {
        ret: ret.map(|(id, typ)| (Ident(id), typ)),
        callee: Callee::Method(callee),
        args,
        loc: loc(line),
    }
}

pub fn prune(cond: Exp, true_branch: bool, line: u32) -> Instr {
    Instr::Prune {
        cond,
        true_branch,
        loc: loc(line),
    }
}

pub fn method(name: &str) -> ProcDescBuilder {
    ProcDescBuilder::instance_method(ProcName::new(CLASS, name), FILE)
}

/// Class annotated `@ThreadSafe`
pub fn thread_safe_class(name: &str) -> ClassDecl {
    ClassDecl::new(name).with_annotation(AnnotationKind::ThreadSafe)
}

/// Builder for Program
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    tenv: TypeEnvironment,
    procedures: Vec<ProcDesc>,
}

impl ProgramBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Program whose only class is `@ThreadSafe` `com.example.Foo`
    pub fn thread_safe() -> Self {
        Self::new().with_class(thread_safe_class(CLASS))
    }

    pub fn with_class(mut self, class: ClassDecl) -> Self {
        self.tenv.add_class(class);
        self
    }

    pub fn with_procedure(mut self, pdesc: ProcDesc) -> Self {
        self.procedures.push(pdesc);
        self
    }

    pub fn build(self) -> Program {
        Program::new(self.tenv, self.procedures)
    }
}
