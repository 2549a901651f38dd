//! Post-pass invariant checks.
//!
//! Grounded on the existence-and-shape checks
//! `cranelift-codegen/src/verifier.rs` runs after each pass, narrowed to
//! the "Universal invariants" spec.md §8 calls out for this pass
//! specifically: every unrolled loop keeps exactly one header, every
//! phi's arity matches its block's predecessor count, no `Bad` nodes
//! remain, and the keep-alive set's size moved by exactly the accounted
//! delta (DESIGN.md, Open Question 2).

use crate::ir::{Block, Function, Opcode};
use crate::loop_analysis::LoopForest;
use crate::result::{CodegenError, CodegenResult};
use std::collections::HashSet;

/// Check that exactly one block among `header` and `blocks` (the header
/// plus every block the body duplicator touched) is controlled by an
/// `If` (spec.md §8: "single-header invariant"). The body duplicator
/// never clones the header itself, only the blocks inside the body, so a
/// second `If`-controlled block among the duplicated set would mean a
/// clone picked up a branch it shouldn't have.
pub fn verify_single_header(func: &Function, header: Block, blocks: &[Block]) -> CodegenResult<()> {
    let mut candidates: HashSet<Block> = blocks.iter().copied().collect();
    candidates.insert(header);

    let header_count = candidates
        .iter()
        .filter(|&&b| {
            func.dfg
                .nodes_in_block(b)
                .iter()
                .any(|&n| func.dfg.opcode(n) == Opcode::If)
        })
        .count();

    if header_count != 1 {
        return Err(CodegenError::InvariantViolation(format!(
            "loop has {} If-controlled header blocks, expected exactly 1",
            header_count
        )));
    }
    Ok(())
}

/// Check that every phi's arity matches its block's predecessor count
/// (spec.md §3's arity-alignment invariant).
pub fn verify_phi_arity(func: &Function) -> CodegenResult<()> {
    for node in func.dfg.nodes() {
        if func.dfg.is_phi(node) {
            if let Some(block) = func.dfg.block(node) {
                let preds = func.dfg.blocks.data(block).preds.len();
                let arity = func.dfg.arity(node);
                if preds != arity {
                    return Err(CodegenError::InvariantViolation(format!(
                        "phi {:?} has arity {} but block has {} predecessors",
                        node, arity, preds
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Check that no `Bad` nodes remain in the graph (spec.md §8: "no stray
/// Bads").
pub fn verify_no_bad_nodes(func: &Function) -> CodegenResult<()> {
    for node in func.dfg.nodes() {
        if func.dfg.is_bad(node) {
            return Err(CodegenError::InvariantViolation(format!(
                "stray Bad node {:?}",
                node
            )));
        }
    }
    Ok(())
}

/// Check that the keep-alive set grew by exactly `expected_delta`
/// relative to `before` (DESIGN.md, Open Question 2).
pub fn verify_keep_alive_delta(
    func: &Function,
    before: usize,
    expected_delta: isize,
) -> CodegenResult<()> {
    let after = func.dfg.keep_alive_set().len() as isize;
    let expected = before as isize + expected_delta;
    if after != expected {
        return Err(CodegenError::InvariantViolation(format!(
            "keep-alive set size {} does not match expected {} (before {}, delta {})",
            after, expected, before, expected_delta
        )));
    }
    Ok(())
}

/// Run the invariant checks that hold over the whole function regardless
/// of which loop was just unrolled (single-header is checked separately,
/// per loop, since it needs that loop's touched blocks).
pub fn verify_unroll_invariants(func: &Function, _forest: &LoopForest) -> CodegenResult<()> {
    verify_no_bad_nodes(func)?;
    verify_phi_arity(func)?;
    Ok(())
}
