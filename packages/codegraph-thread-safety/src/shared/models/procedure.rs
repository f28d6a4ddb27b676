//! Procedure names, attributes and control-flow graphs

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{AnnotationKind, Instr, Location, Pvar, Typ, Var};

const CONSTRUCTOR_NAME: &str = "<init>";
const CLASS_INITIALIZER_NAME: &str = "<clinit>";

/// Fully qualified Java method name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcName {
    pub class_name: String,
    pub method_name: String,
    /// Parameter type names (receiver excluded)
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl ProcName {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn constructor(class_name: impl Into<String>) -> Self {
        Self::new(class_name, CONSTRUCTOR_NAME)
    }

    pub fn is_constructor(&self) -> bool {
        self.method_name == CONSTRUCTOR_NAME
    }

    pub fn is_class_initializer(&self) -> bool {
        self.method_name == CLASS_INITIALIZER_NAME
    }

    /// Compiler-generated methods (`access$000`, `lambda$run$0`, ...)
    pub fn is_autogenerated(&self) -> bool {
        self.method_name.contains('$')
    }

    /// Same method name and parameters (override candidate)
    pub fn same_signature(&self, other: &ProcName) -> bool {
        self.method_name == other.method_name && self.parameters == other.parameters
    }

    /// Class name without package (`com.foo.Bar$Inner` → `Bar$Inner`)
    pub fn simple_class_name(&self) -> &str {
        self.class_name
            .rsplit_once('.')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.class_name)
    }

    /// `Bar.method(...)`, as used in messages
    pub fn to_simplified_string(&self) -> String {
        let method = if self.is_constructor() {
            self.simple_class_name()
        } else {
            self.method_name.as_str()
        };
        let params = if self.parameters.is_empty() { "" } else { "..." };
        format!("{}.{}({})", self.simple_class_name(), method, params)
    }
}

impl fmt::Display for ProcName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.class_name,
            self.method_name,
            self.parameters.join(",")
        )
    }
}

/// Declared visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcAccess {
    #[default]
    Public,
    Protected,
    Default,
    Private,
}

/// Procedure attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcAttributes {
    pub name: ProcName,
    /// Formals in order; instance methods start with `this`
    pub formals: Vec<(Pvar, Typ)>,
    pub ret_type: Typ,
    #[serde(default)]
    pub access: ProcAccess,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_synchronized: bool,
    #[serde(default)]
    pub annotations: BTreeSet<AnnotationKind>,
    pub loc: Location,
}

/// Index of a CFG node within its procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Basic block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgNode {
    pub id: NodeId,
    pub instrs: Vec<Instr>,
    pub succs: Vec<NodeId>,
}

/// Procedure description: attributes plus CFG
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcDesc {
    pub attributes: ProcAttributes,
    /// Nodes indexed by `NodeId`
    pub nodes: Vec<CfgNode>,
    pub start: NodeId,
    pub exit: NodeId,
}

impl ProcDesc {
    pub fn name(&self) -> &ProcName {
        &self.attributes.name
    }

    pub fn node(&self, id: NodeId) -> Option<&CfgNode> {
        self.nodes.get(id.0)
    }

    pub fn source_file(&self) -> &str {
        &self.attributes.loc.file
    }

    pub fn has_annotation(&self, kind: AnnotationKind) -> bool {
        self.attributes.annotations.contains(&kind)
    }

    /// Predecessor lists, indexed like `nodes`
    pub fn predecessors(&self) -> Vec<Vec<NodeId>> {
        let mut preds = vec![Vec::new(); self.nodes.len()];
        for node in &self.nodes {
            for succ in &node.succs {
                if let Some(list) = preds.get_mut(succ.0) {
                    list.push(node.id);
                }
            }
        }
        preds
    }
}

/// Formal-parameter index map
#[derive(Debug, Clone, Default)]
pub struct FormalMap {
    indices: FxHashMap<Pvar, usize>,
}

impl FormalMap {
    pub fn new(attributes: &ProcAttributes) -> Self {
        let indices = attributes
            .formals
            .iter()
            .enumerate()
            .map(|(idx, (pvar, _))| (pvar.clone(), idx))
            .collect();
        Self { indices }
    }

    pub fn get_formal_index(&self, root: &Var) -> Option<usize> {
        match root {
            Var::Program(pvar) => self.indices.get(pvar).copied(),
            Var::Ident(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
