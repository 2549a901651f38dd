//! Control flow graph, defined as predecessor and successor sets.
//!
//! The `ControlFlowGraph` maintains a mapping from basic blocks to their
//! predecessors and successors, recomputed from a [`Function`]'s recorded
//! block edges rather than maintained incrementally through every
//! rewrite -- the same posture the teacher crate takes in
//! `cranelift-codegen/src/flowgraph.rs`, just rebuilt on top of this
//! crate's node graph instead of Cranelift's instruction layout.

use crate::ir::{Block, Function};
use std::collections::HashMap;

#[derive(Clone, Default)]
struct BlockEdges {
    predecessors: Vec<Block>,
    successors: Vec<Block>,
}

/// A basic block control flow graph computed from a function.
///
/// Maintains predecessor and successor lists for each basic block, so
/// that the loop analyzer and dominator tree don't each have to
/// rediscover control edges by walking control nodes themselves.
#[derive(Clone, Default)]
pub struct ControlFlowGraph {
    data: HashMap<Block, BlockEdges>,
}

impl ControlFlowGraph {
    /// Allocate a new, empty control flow graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and compute a control flow graph for `func`.
    pub fn with_function(func: &Function) -> Self {
        let mut cfg = Self::new();
        cfg.compute(func);
        cfg
    }

    /// Recompute this control flow graph from scratch, discarding any
    /// previous contents. Called once up front by
    /// [`crate::opt::loop_unrolling::driver`], matching the teacher's
    /// "recompute before each pass invocation" convention for analyses
    /// that are cheap relative to the transformation they feed.
    pub fn compute(&mut self, func: &Function) {
        self.clear();

        for block in func.dfg.blocks.iter() {
            self.data.entry(block).or_default();
        }

        for block in func.dfg.blocks.iter() {
            let preds: Vec<Block> = func.dfg.blocks.data(block).preds.iter().copied().collect();
            for pred in preds {
                self.add_edge(pred, block);
            }
        }
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    fn add_edge(&mut self, from: Block, to: Block) {
        self.data.entry(from).or_default().successors.push(to);
        self.data.entry(to).or_default().predecessors.push(from);
    }

    /// Get the predecessors of `block`.
    pub fn pred_iter(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.data
            .get(&block)
            .map(|d| d.predecessors.iter().copied())
            .into_iter()
            .flatten()
    }

    /// Get the successors of `block`.
    pub fn succ_iter(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.data
            .get(&block)
            .map(|d| d.successors.iter().copied())
            .into_iter()
            .flatten()
    }

    /// Number of predecessors of `block`.
    pub fn pred_count(&self, block: Block) -> usize {
        self.data.get(&block).map_or(0, |d| d.predecessors.len())
    }

    /// Number of successors of `block`.
    pub fn succ_count(&self, block: Block) -> usize {
        self.data.get(&block).map_or(0, |d| d.successors.len())
    }

    /// All blocks this control flow graph knows about, in an unspecified
    /// order. Used by the dominator tree to seed its reverse-postorder
    /// walk.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.data.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Function;

    #[test]
    fn empty_function_has_one_block_no_edges() {
        let func = Function::new();
        let cfg = ControlFlowGraph::with_function(&func);
        let entry = func.dfg.block(func.end).unwrap();
        assert_eq!(cfg.pred_count(entry), 0);
        assert_eq!(cfg.succ_count(entry), 0);
    }

    #[test]
    fn predecessors_mirror_recorded_block_edges() {
        let mut func = Function::new();
        let b2 = func.dfg.blocks.make_block();
        let entry = func.dfg.block(func.end).unwrap();
        func.dfg.blocks.add_pred(b2, entry);
        let cfg = ControlFlowGraph::with_function(&func);
        assert_eq!(cfg.pred_count(b2), 1);
        assert_eq!(cfg.succ_count(entry), 1);
        assert_eq!(cfg.pred_iter(b2).next(), Some(entry));
    }
}
