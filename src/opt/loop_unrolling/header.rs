//! Header & exit discovery (spec.md §4.1).
//!
//! Grounded on `get_loop_header` and `get_false_and_true_targets` in
//! `original_source/ir/opt/loop_unrolling.c`: a candidate loop must have
//! exactly one header block (the loop-analysis-reported header) controlled
//! by a single `If` whose two successors are the loop-continuation block
//! (back inside the loop) and the exit block (outside it). Anything else
//! -- multiple back edges into different blocks, a header with more than
//! one branch, or more than one block with an edge leaving the loop -- is
//! rejected with [`RejectReason::ShapeRejected`], matching
//! `has_multiple_loop_exits`'s rejection of multi-exit loops (an explicit
//! Non-goal, spec.md §1).

use crate::flowgraph::ControlFlowGraph;
use crate::ir::{Block, Function, Loop, Node, Opcode};
use crate::loop_analysis::LoopForest;
use crate::result::RejectReason;

/// Everything the rest of the pass needs to know about a loop's header
/// and its single exit.
#[derive(Clone, Copy, Debug)]
pub struct HeaderInfo {
    /// The loop's header block.
    pub header: Block,
    /// The `If` node controlling the header's branch.
    pub branch: Node,
    /// The successor block that stays inside the loop.
    pub continue_block: Block,
    /// The successor block that leaves the loop.
    pub exit_block: Block,
}

/// Discover the header and unique exit of `lp`, rejecting it if its
/// control shape doesn't match a single-header, single-exit natural loop.
pub fn discover(
    func: &Function,
    cfg: &ControlFlowGraph,
    forest: &LoopForest,
    lp: Loop,
) -> Result<HeaderInfo, RejectReason> {
    let header = forest.header(lp);

    let branch = single_if_in_block(func, header).ok_or_else(|| {
        log::debug!("loop header {:?} is not controlled by a single If", header);
        RejectReason::ShapeRejected
    })?;

    let successors: Vec<Block> = cfg.succ_iter(header).collect();
    if successors.len() != 2 {
        log::debug!(
            "loop header {:?} has {} successors, expected 2",
            header,
            successors.len()
        );
        return Err(RejectReason::ShapeRejected);
    }

    let inside: Vec<Block> = successors
        .iter()
        .copied()
        .filter(|&b| forest.block_in_loop(b, lp))
        .collect();
    let outside: Vec<Block> = successors
        .iter()
        .copied()
        .filter(|&b| !forest.block_in_loop(b, lp))
        .collect();

    if inside.len() != 1 || outside.len() != 1 {
        log::debug!(
            "loop header {:?} does not have exactly one in-loop and one \
             out-of-loop successor (multi-exit loops are rejected)",
            header
        );
        return Err(RejectReason::ShapeRejected);
    }

    // Any other loop block with a successor outside the loop means the
    // loop has more than one exit; the original source's
    // `has_multiple_loop_exits` rejects this the same way.
    for element in forest.elements(lp) {
        if let crate::loop_analysis::LoopElement::Block(b) = element {
            if *b == header {
                continue;
            }
            for succ in cfg.succ_iter(*b) {
                if !forest.block_in_loop(succ, lp) {
                    log::debug!(
                        "loop has an additional exit out of block {:?}, rejecting",
                        b
                    );
                    return Err(RejectReason::ShapeRejected);
                }
            }
        }
    }

    Ok(HeaderInfo {
        header,
        branch,
        continue_block: inside[0],
        exit_block: outside[0],
    })
}

fn single_if_in_block(func: &Function, block: Block) -> Option<Node> {
    let mut found = None;
    for node in func.dfg.nodes_in_block(block) {
        if func.dfg.opcode(node) == Opcode::If {
            if found.is_some() {
                return None;
            }
            found = Some(node);
        }
    }
    found
}
