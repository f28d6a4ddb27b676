//! Builder for procedure descriptions
//!
//! Used by tests and by front-ends that assemble CFGs programmatically.

use std::collections::BTreeSet;

use super::{
    AnnotationKind, CfgNode, Instr, Location, NodeId, ProcAccess, ProcAttributes, ProcDesc,
    ProcName, Pvar, Typ,
};

/// Builder for `ProcDesc`
///
/// Nodes get ids in insertion order; the first node is the start node and
/// the last node is the exit node.
#[derive(Debug, Clone)]
pub struct ProcDescBuilder {
    attributes: ProcAttributes,
    nodes: Vec<CfgNode>,
}

impl ProcDescBuilder {
    /// Instance method: formal 0 is `this`
    pub fn instance_method(name: ProcName, file: &str) -> Self {
        let this_typ = Typ::object(name.class_name.clone());
        Self {
            attributes: ProcAttributes {
                name,
                formals: vec![(Pvar::this(), this_typ)],
                ret_type: Typ::Void,
                access: ProcAccess::Public,
                is_static: false,
                is_synchronized: false,
                annotations: BTreeSet::new(),
                loc: Location::line(file, 1),
            },
            nodes: Vec::new(),
        }
    }

    pub fn static_method(name: ProcName, file: &str) -> Self {
        let mut builder = Self::instance_method(name, file);
        builder.attributes.formals.clear();
        builder.attributes.is_static = true;
        builder
    }

    pub fn formal(mut self, name: &str, typ: Typ) -> Self {
        self.attributes.formals.push((Pvar::new(name), typ));
        self
    }

    pub fn returns(mut self, typ: Typ) -> Self {
        self.attributes.ret_type = typ;
        self
    }

    pub fn access(mut self, access: ProcAccess) -> Self {
        self.attributes.access = access;
        self
    }

    pub fn synchronized(mut self) -> Self {
        self.attributes.is_synchronized = true;
        self
    }

    pub fn annotate(mut self, kind: AnnotationKind) -> Self {
        self.attributes.annotations.insert(kind);
        self
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.attributes.loc.line = line;
        self
    }

    /// Straight-line body: one node with `instrs` followed by the exit node
    pub fn body(mut self, instrs: Vec<Instr>) -> Self {
        self.nodes = vec![
            CfgNode {
                id: NodeId(0),
                instrs,
                succs: vec![NodeId(1)],
            },
            CfgNode {
                id: NodeId(1),
                instrs: Vec::new(),
                succs: Vec::new(),
            },
        ];
        self
    }

    /// Append a node with explicit successors (by insertion index)
    pub fn node(mut self, instrs: Vec<Instr>, succs: &[usize]) -> Self {
        let id = NodeId(self.nodes.len());
        self.nodes.push(CfgNode {
            id,
            instrs,
            succs: succs.iter().copied().map(NodeId).collect(),
        });
        self
    }

    pub fn build(mut self) -> ProcDesc {
        if self.nodes.is_empty() {
            self.nodes.push(CfgNode {
                id: NodeId(0),
                instrs: Vec::new(),
                succs: Vec::new(),
            });
        }
        let exit = NodeId(self.nodes.len() - 1);
        ProcDesc {
            attributes: self.attributes,
            nodes: self.nodes,
            start: NodeId(0),
            exit,
        }
    }
}
