/*
 * Worklist Fixpoint Solver for Procedure CFGs
 *
 * Kildall-style forward dataflow over a `ProcDesc`:
 * 1. out[n] = ⊥ for every node (represented as `None`)
 * 2. worklist = [start]
 * 3. while worklist ≠ ∅:
 *      n = worklist.pop()
 *      in = ⊔ out[p] for computed predecessors p (plus the initial state at start)
 *      new_out = fold(exec_instr, in, instrs(n))
 *      if new_out ⋢ out[n]:
 *        out[n] = out[n] ⊔ new_out
 *        worklist.extend(succs(n))
 * 4. post = out[exit]
 *
 * Node visits are bounded by `max_iterations`; exceeding the bound is
 * reported as `FixpointDiverged`.
 */

use std::collections::VecDeque;

use super::error::{Result, ThreadSafetyError};
use crate::features::thread_safety::domain::AbstractState;
use crate::shared::models::{Instr, ProcDesc};

/// Join semilattice the solver iterates over
pub trait JoinLattice: Clone {
    fn join(&self, other: &Self) -> Self;
    fn leq(&self, other: &Self) -> bool;
}

impl JoinLattice for AbstractState {
    fn join(&self, other: &Self) -> Self {
        AbstractState::join(self, other)
    }

    fn leq(&self, other: &Self) -> bool {
        AbstractState::leq(self, other)
    }
}

/// Forward worklist solver over one procedure
pub struct WorklistSolver<'a> {
    pdesc: &'a ProcDesc,
    max_iterations: usize,
}

impl<'a> WorklistSolver<'a> {
    pub fn new(pdesc: &'a ProcDesc) -> Self {
        Self {
            pdesc,
            max_iterations: 10_000,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Node ids must index `nodes`, and `start`/`exit`/successors must exist
    fn validate(&self) -> Result<()> {
        let node_count = self.pdesc.nodes.len();
        let malformed = |reason: String| ThreadSafetyError::MalformedCfg {
            proc_name: self.pdesc.name().clone(),
            reason,
        };

        if node_count == 0 {
            return Err(malformed("no nodes".to_string()));
        }
        for (idx, node) in self.pdesc.nodes.iter().enumerate() {
            if node.id.0 != idx {
                return Err(malformed(format!("node {} stored at index {}", node.id.0, idx)));
            }
            if let Some(succ) = node.succs.iter().find(|s| s.0 >= node_count) {
                return Err(malformed(format!(
                    "node {} has unknown successor {}",
                    idx, succ.0
                )));
            }
        }
        for (label, id) in [("start", self.pdesc.start), ("exit", self.pdesc.exit)] {
            if id.0 >= node_count {
                return Err(malformed(format!("{} node {} out of range", label, id.0)));
            }
        }
        Ok(())
    }

    /// Run to a fixpoint and return the state at the exit node
    ///
    /// `Ok(None)` when the exit node is unreachable.
    pub fn solve<S, F>(&self, initial: S, mut exec_instr: F) -> Result<Option<S>>
    where
        S: JoinLattice,
        F: FnMut(S, &Instr) -> Result<S>,
    {
        self.validate()?;

        let predecessors = self.pdesc.predecessors();
        let mut out_states: Vec<Option<S>> = vec![None; self.pdesc.nodes.len()];
        let mut in_worklist = vec![false; self.pdesc.nodes.len()];
        let mut worklist = VecDeque::from([self.pdesc.start]);
        in_worklist[self.pdesc.start.0] = true;
        let mut iterations = 0usize;

        while let Some(node_id) = worklist.pop_front() {
            in_worklist[node_id.0] = false;
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(ThreadSafetyError::FixpointDiverged {
                    proc_name: self.pdesc.name().clone(),
                    iterations: self.max_iterations,
                });
            }

            // Meet: join of computed predecessor states
            let entry = (node_id == self.pdesc.start).then(|| initial.clone());
            let in_state = predecessors[node_id.0]
                .iter()
                .filter_map(|pred| out_states[pred.0].as_ref())
                .fold(entry, |acc, out| match acc {
                    Some(acc) => Some(acc.join(out)),
                    None => Some(out.clone()),
                });
            let Some(in_state) = in_state else {
                continue;
            };

            let node = &self.pdesc.nodes[node_id.0];
            let mut new_out = in_state;
            for instr in &node.instrs {
                new_out = exec_instr(new_out, instr)?;
            }

            let changed = match &out_states[node_id.0] {
                Some(old_out) => !new_out.leq(old_out),
                None => true,
            };
            if changed {
                let merged = match out_states[node_id.0].take() {
                    Some(old_out) => old_out.join(&new_out),
                    None => new_out,
                };
                out_states[node_id.0] = Some(merged);
                for succ in &node.succs {
                    if !in_worklist[succ.0] {
                        in_worklist[succ.0] = true;
                        worklist.push_back(*succ);
                    }
                }
            }
        }

        tracing::trace!(
            proc = %self.pdesc.name(),
            iterations,
            "fixpoint reached"
        );

        Ok(out_states[self.pdesc.exit.0].take())
    }
}
