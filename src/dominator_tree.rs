//! Dominator tree computation via the Cooper-Harvey-Kennedy algorithm.
//!
//! Grounded on the `DominatorTree` implementation in
//! `other_examples/.../darmie-rayzor/.../loop_analysis.rs`: compute a
//! reverse postorder of the control flow graph, then iterate the standard
//! "intersect" dataflow fixpoint until immediate dominators stop changing.
//! `loop_analysis::LoopForest` builds directly on this to find back edges
//! (`b` dominates one of its own predecessors) and headers.

use crate::flowgraph::ControlFlowGraph;
use crate::ir::Block;
use std::collections::HashMap;

/// The dominator tree of a function's control flow graph, rooted at the
/// entry block.
pub struct DominatorTree {
    idom: HashMap<Block, Block>,
    rpo_index: HashMap<Block, usize>,
}

impl DominatorTree {
    /// Compute the dominator tree of `cfg`, rooted at `entry`.
    pub fn compute(cfg: &ControlFlowGraph, entry: Block) -> Self {
        let rpo = reverse_postorder(cfg, entry);
        let mut rpo_index = HashMap::new();
        for (i, &block) in rpo.iter().enumerate() {
            rpo_index.insert(block, i);
        }

        let mut idom: HashMap<Block, Block> = HashMap::new();
        idom.insert(entry, entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter().skip(1) {
                let mut new_idom: Option<Block> = None;
                for pred in cfg.pred_iter(block) {
                    if !idom.contains_key(&pred) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&idom, &rpo_index, current, pred),
                    });
                }
                if let Some(new_idom) = new_idom {
                    if idom.get(&block) != Some(&new_idom) {
                        idom.insert(block, new_idom);
                        changed = true;
                    }
                }
            }
        }

        Self { idom, rpo_index }
    }

    /// `idom`: the immediate dominator of `block`, or `None` for the
    /// entry block (which dominates itself but has no strict dominator).
    pub fn idom(&self, block: Block) -> Option<Block> {
        match self.idom.get(&block) {
            Some(&d) if d == block => None,
            other => other.copied(),
        }
    }

    /// `dominates`: does `a` dominate `b` (reflexively -- every block
    /// dominates itself)?
    pub fn dominates(&self, a: Block, b: Block) -> bool {
        if a == b {
            return true;
        }
        let mut cur = b;
        loop {
            match self.idom.get(&cur) {
                Some(&next) if next == cur => return false,
                Some(&next) => {
                    if next == a {
                        return true;
                    }
                    cur = next;
                }
                None => return false,
            }
        }
    }

    /// `depth`: distance from the entry block in the dominator tree.
    pub fn depth(&self, block: Block) -> u32 {
        let mut depth = 0;
        let mut cur = block;
        loop {
            match self.idom.get(&cur) {
                Some(&next) if next == cur => return depth,
                Some(&next) => {
                    depth += 1;
                    cur = next;
                }
                None => return depth,
            }
        }
    }
}

fn intersect(
    idom: &HashMap<Block, Block>,
    rpo_index: &HashMap<Block, usize>,
    a: Block,
    b: Block,
) -> Block {
    let mut finger1 = a;
    let mut finger2 = b;
    while finger1 != finger2 {
        while rpo_index[&finger1] > rpo_index[&finger2] {
            finger1 = idom[&finger1];
        }
        while rpo_index[&finger2] > rpo_index[&finger1] {
            finger2 = idom[&finger2];
        }
    }
    finger1
}

fn reverse_postorder(cfg: &ControlFlowGraph, entry: Block) -> Vec<Block> {
    let mut visited = std::collections::HashSet::new();
    let mut postorder = Vec::new();
    let mut stack = vec![(entry, false)];
    while let Some((block, processed)) = stack.pop() {
        if processed {
            postorder.push(block);
            continue;
        }
        if !visited.insert(block) {
            continue;
        }
        stack.push((block, true));
        for succ in cfg.succ_iter(block) {
            if !visited.contains(&succ) {
                stack.push((succ, false));
            }
        }
    }
    postorder.reverse();
    postorder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Function;

    #[test]
    fn linear_chain_dominates_in_order() {
        let mut func = Function::new();
        let entry = func.dfg.block(func.end).unwrap();
        let b2 = func.dfg.blocks.make_block();
        let b3 = func.dfg.blocks.make_block();
        func.dfg.blocks.add_pred(b2, entry);
        func.dfg.blocks.add_pred(b3, b2);
        let cfg = ControlFlowGraph::with_function(&func);
        let domtree = DominatorTree::compute(&cfg, entry);
        assert!(domtree.dominates(entry, b3));
        assert_eq!(domtree.idom(b3), Some(b2));
        assert_eq!(domtree.depth(b3), 2);
    }

    #[test]
    fn diamond_join_is_dominated_only_by_entry() {
        let mut func = Function::new();
        let entry = func.dfg.block(func.end).unwrap();
        let left = func.dfg.blocks.make_block();
        let right = func.dfg.blocks.make_block();
        let join = func.dfg.blocks.make_block();
        func.dfg.blocks.add_pred(left, entry);
        func.dfg.blocks.add_pred(right, entry);
        func.dfg.blocks.add_pred(join, left);
        func.dfg.blocks.add_pred(join, right);
        let cfg = ControlFlowGraph::with_function(&func);
        let domtree = DominatorTree::compute(&cfg, entry);
        assert_eq!(domtree.idom(join), Some(entry));
        assert!(!domtree.dominates(left, join));
    }
}
