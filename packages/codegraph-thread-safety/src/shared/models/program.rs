//! Whole-program bundle: procedures plus type environment

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ProcDesc, ProcName, TypeEnvironment};

/// Serialized shape of a program (JSON input of the CLI)
#[derive(Debug, Clone, Default, Deserialize)]
struct RawProgram {
    #[serde(default)]
    tenv: TypeEnvironment,
    #[serde(default)]
    procedures: Vec<ProcDesc>,
}

/// Procedures with bodies, indexed by name, plus the type environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawProgram")]
pub struct Program {
    pub tenv: TypeEnvironment,
    procedures: Vec<ProcDesc>,
    #[serde(skip)]
    index: FxHashMap<ProcName, usize>,
}

impl From<RawProgram> for Program {
    fn from(raw: RawProgram) -> Self {
        Program::new(raw.tenv, raw.procedures)
    }
}

impl Program {
    /// Build a program; method annotations of every procedure are
    /// registered in the type environment so override queries see them.
    pub fn new(mut tenv: TypeEnvironment, procedures: Vec<ProcDesc>) -> Self {
        let mut index = FxHashMap::default();
        for (idx, pdesc) in procedures.iter().enumerate() {
            tenv.register_method(pdesc.name(), &pdesc.attributes.annotations);
            index.insert(pdesc.name().clone(), idx);
        }
        Self {
            tenv,
            procedures,
            index,
        }
    }

    pub fn procedure(&self, name: &ProcName) -> Option<&ProcDesc> {
        self.index.get(name).and_then(|&idx| self.procedures.get(idx))
    }

    pub fn procedures(&self) -> &[ProcDesc] {
        &self.procedures
    }

    /// Procedures grouped by source file, in file order
    pub fn source_files(&self) -> BTreeMap<&str, Vec<&ProcDesc>> {
        let mut files: BTreeMap<&str, Vec<&ProcDesc>> = BTreeMap::new();
        for pdesc in &self.procedures {
            files.entry(pdesc.source_file()).or_default().push(pdesc);
        }
        files
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
