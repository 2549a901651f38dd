//! Natural loop detection and the loop forest.
//!
//! Grounded on `NaturalLoop`/`LoopNestInfo` in
//! `other_examples/.../darmie-rayzor/.../loop_analysis.rs`: find back
//! edges (an edge `n -> h` where `h` dominates `n`), grow each header's
//! loop body backward from its back-edge sources, then nest loops that
//! share a header or whose bodies contain one another.

use crate::dominator_tree::DominatorTree;
use crate::flowgraph::ControlFlowGraph;
use crate::ir::{Block, Loop};
use std::collections::{HashMap, HashSet};

/// One element of a loop's body: either a plain block, or a nested
/// sub-loop's header block standing in for the whole sub-loop.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoopElement {
    /// A block directly in this loop (not inside any nested loop).
    Block(Block),
    /// A nested loop.
    SubLoop(Loop),
}

struct LoopData {
    header: Block,
    blocks: HashSet<Block>,
    elements: Vec<LoopElement>,
    depth: u32,
    outer: Option<Loop>,
}

/// The set of natural loops in a function, nested by containment.
pub struct LoopForest {
    loops: Vec<LoopData>,
    block_to_loop: HashMap<Block, Loop>,
}

impl LoopForest {
    /// Detect all natural loops in `cfg`, using `domtree` to find back
    /// edges and to order loops by nesting depth.
    pub fn compute(cfg: &ControlFlowGraph, domtree: &DominatorTree) -> Self {
        let mut loops: Vec<LoopData> = Vec::new();
        let mut header_to_loop: HashMap<Block, usize> = HashMap::new();

        for block in cfg.blocks() {
            for pred in cfg.pred_iter(block) {
                if domtree.dominates(block, pred) {
                    // `pred -> block` is a back edge; `block` is a loop
                    // header.
                    let idx = *header_to_loop.entry(block).or_insert_with(|| {
                        loops.push(LoopData {
                            header: block,
                            blocks: HashSet::new(),
                            elements: Vec::new(),
                            depth: 0,
                            outer: None,
                        });
                        loops.len() - 1
                    });
                    loops[idx].blocks.insert(block);
                    grow_body(cfg, pred, &mut loops[idx].blocks);
                }
            }
        }

        // Nest loops: a loop A is nested inside loop B if A's header is a
        // (non-header) member of B's block set.
        let headers: Vec<Block> = loops.iter().map(|l| l.header).collect();
        let mut outer_idx: Vec<Option<usize>> = vec![None; loops.len()];
        for i in 0..loops.len() {
            let mut best: Option<usize> = None;
            for j in 0..loops.len() {
                if i == j {
                    continue;
                }
                if loops[j].blocks.contains(&headers[i]) {
                    let better = match best {
                        None => true,
                        Some(b) => loops[j].blocks.len() < loops[b].blocks.len(),
                    };
                    if better {
                        best = Some(j);
                    }
                }
            }
            outer_idx[i] = best;
        }

        // Compute depths bottom-up by walking the outer chain.
        let mut depths = vec![0u32; loops.len()];
        for i in 0..loops.len() {
            let mut d = 0;
            let mut cur = outer_idx[i];
            while let Some(o) = cur {
                d += 1;
                cur = outer_idx[o];
            }
            depths[i] = d;
        }

        // Build per-loop element lists: direct blocks (not owned by any
        // nested loop) plus nested sub-loops.
        let mut block_to_loop: HashMap<Block, Loop> = HashMap::new();
        for (i, data) in loops.iter().enumerate() {
            data.blocks.iter().for_each(|&b| {
                // A block belongs to the innermost loop containing it; a
                // later, deeper loop overwrites an earlier, shallower one.
                let replace = match block_to_loop.get(&b) {
                    None => true,
                    Some(existing) => depths[i] > depths[existing.index_raw()],
                };
                if replace {
                    block_to_loop.insert(b, Loop::from_index_raw(i));
                }
            });
        }

        let mut elements: Vec<Vec<LoopElement>> = vec![Vec::new(); loops.len()];
        for (i, data) in loops.iter().enumerate() {
            for &b in &data.blocks {
                match block_to_loop.get(&b) {
                    Some(owner) if owner.index_raw() == i => {
                        elements[i].push(LoopElement::Block(b));
                    }
                    _ => {}
                }
            }
            if let Some(outer) = outer_idx[i] {
                elements[outer].push(LoopElement::SubLoop(Loop::from_index_raw(i)));
            }
        }
        // Deduplicate sub-loop entries an outer loop might have grown
        // more than once (a sub-loop can be reachable from several of
        // the outer loop's back-edge sources during `grow_body`).
        for elems in elements.iter_mut() {
            let mut seen = HashSet::new();
            elems.retain(|e| match e {
                LoopElement::SubLoop(l) => seen.insert(*l),
                LoopElement::Block(_) => true,
            });
        }

        for (i, data) in loops.iter_mut().enumerate() {
            data.elements = std::mem::take(&mut elements[i]);
            data.depth = depths[i] + 1;
            data.outer = outer_idx[i].map(Loop::from_index_raw);
        }

        Self {
            loops,
            block_to_loop,
        }
    }

    /// `loop_of` external interface: which loop (if any) `block` belongs
    /// to.
    pub fn loop_of(&self, block: Block) -> Option<Loop> {
        self.block_to_loop.get(&block).copied()
    }

    /// `outer` external interface: the loop immediately containing `lp`,
    /// if any.
    pub fn outer(&self, lp: Loop) -> Option<Loop> {
        self.loops[lp.index_raw()].outer
    }

    /// `elements` external interface: the direct members of `lp` (blocks
    /// not owned by a nested loop, plus nested loops).
    pub fn elements(&self, lp: Loop) -> &[LoopElement] {
        &self.loops[lp.index_raw()].elements
    }

    /// `depth` external interface: `lp`'s nesting depth (innermost loop
    /// still containing `block` has the greatest depth), 1 for an
    /// outermost loop.
    pub fn depth(&self, lp: Loop) -> u32 {
        self.loops[lp.index_raw()].depth
    }

    /// The header block of `lp`.
    pub fn header(&self, lp: Loop) -> Block {
        self.loops[lp.index_raw()].header
    }

    /// `block_in_loop` external interface: is `block` contained in `lp`
    /// (directly, or via a nested sub-loop)?
    pub fn block_in_loop(&self, block: Block, lp: Loop) -> bool {
        self.loops[lp.index_raw()].blocks.contains(&block)
    }

    /// Every loop in the forest, innermost-first -- the order the
    /// transformation driver must process loops in (spec.md §4.10).
    pub fn loops_innermost_first(&self) -> Vec<Loop> {
        let mut order: Vec<usize> = (0..self.loops.len()).collect();
        order.sort_by(|&a, &b| self.loops[b].depth.cmp(&self.loops[a].depth));
        order.into_iter().map(Loop::from_index_raw).collect()
    }
}

fn grow_body(cfg: &ControlFlowGraph, from: Block, body: &mut HashSet<Block>) {
    let mut worklist = vec![from];
    body.insert(from);
    while let Some(block) = worklist.pop() {
        for pred in cfg.pred_iter(block) {
            if body.insert(pred) {
                worklist.push(pred);
            }
        }
    }
}

/// Helper trait to get a raw `usize` index out of and back into a `Loop`
/// entity without exposing `crate::entity::EntityRef` construction to
/// every call site in this module.
trait LoopIndexRaw {
    fn index_raw(self) -> usize;
    fn from_index_raw(i: usize) -> Self;
}

impl LoopIndexRaw for Loop {
    fn index_raw(self) -> usize {
        use crate::entity::EntityRef;
        self.index()
    }

    fn from_index_raw(i: usize) -> Self {
        use crate::entity::EntityRef;
        Loop::new(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Function;

    #[test]
    fn detects_simple_loop_and_header() {
        let mut func = Function::new();
        let entry = func.dfg.block(func.end).unwrap();
        let header = func.dfg.blocks.make_block();
        let body = func.dfg.blocks.make_block();
        let exit = func.dfg.blocks.make_block();
        func.dfg.blocks.add_pred(header, entry);
        func.dfg.blocks.add_pred(header, body);
        func.dfg.blocks.add_pred(body, header);
        func.dfg.blocks.add_pred(exit, header);
        let cfg = ControlFlowGraph::with_function(&func);
        let domtree = DominatorTree::compute(&cfg, entry);
        let forest = LoopForest::compute(&cfg, &domtree);

        let lp = forest.loop_of(body).expect("body should be in a loop");
        assert_eq!(forest.header(lp), header);
        assert!(forest.block_in_loop(header, lp));
        assert!(forest.block_in_loop(body, lp));
        assert!(!forest.block_in_loop(exit, lp));
        assert_eq!(forest.outer(lp), None);
    }

    #[test]
    fn nested_loop_has_greater_depth() {
        let mut func = Function::new();
        let entry = func.dfg.block(func.end).unwrap();
        let outer_header = func.dfg.blocks.make_block();
        let inner_header = func.dfg.blocks.make_block();
        let inner_body = func.dfg.blocks.make_block();
        func.dfg.blocks.add_pred(outer_header, entry);
        func.dfg.blocks.add_pred(inner_header, outer_header);
        func.dfg.blocks.add_pred(inner_header, inner_body);
        func.dfg.blocks.add_pred(inner_body, inner_header);
        func.dfg.blocks.add_pred(outer_header, inner_header);
        let cfg = ControlFlowGraph::with_function(&func);
        let domtree = DominatorTree::compute(&cfg, entry);
        let forest = LoopForest::compute(&cfg, &domtree);

        let inner = forest.loop_of(inner_body).unwrap();
        let outer = forest.loop_of(outer_header).unwrap();
        assert!(forest.depth(inner) > forest.depth(outer));
        assert_eq!(forest.outer(inner), Some(outer));
    }
}
