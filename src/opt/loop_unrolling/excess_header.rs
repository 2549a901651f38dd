//! Excess-header elimination (spec.md §4.5).
//!
//! Grounded on `prune_block`/`remove_excess_headers` in
//! `original_source/ir/opt/loop_unrolling.c`: once the body duplicator has
//! chained several body copies in sequence, any merge block left with
//! only one live predecessor is no longer a real header -- its phis
//! (arity reduced to 1 by the chaining) are trivial and should be
//! replaced by their remaining input, same as
//! [`crate::opt::loop_unrolling::induction::skip_trivial_phis`] does
//! during analysis, but now as an actual rewrite instead of just a
//! read-through. Memory phis that end up with arity 0 are dropped
//! outright (there is nothing left to merge); constant-like nodes are
//! left alone regardless of block membership, per
//! [`crate::ir::Opcode::is_block_independent`].

use crate::ir::{Block, Function};

/// Prune trivial, single-predecessor phis out of `block`, rewiring their
/// uses to the phi's sole remaining input.
///
/// Returns the number of phis pruned, so callers can confirm the pass
/// made progress (spec.md §8's idempotence property: running this again
/// on an already-pruned block is a no-op).
pub fn prune_block(func: &mut Function, block: Block) -> usize {
    let pred_count = func.dfg.blocks.data(block).preds.len();
    let phis: Vec<_> = func
        .dfg
        .nodes_in_block(block)
        .into_iter()
        .filter(|&n| func.dfg.is_phi(n))
        .collect();

    let mut pruned = 0;
    for phi in phis {
        let arity = func.dfg.arity(phi);
        if arity == 0 {
            // A memory phi that lost every input merges nothing; it has
            // no replacement value and its uses must already have been
            // rewired elsewhere (the excess header it lived in is being
            // removed). Nothing to do here besides leaving it for the
            // caller's dead-node sweep.
            continue;
        }
        if pred_count <= 1 && arity == 1 {
            let replacement = func.dfg.input(phi, 0);
            func.dfg.exchange(phi, replacement);
            pruned += 1;
        }
    }
    pruned
}

/// Prune every block in `blocks` that has become a trivial, single-pred
/// merge point, matching `remove_excess_headers`'s sweep over every newly
/// duplicated block.
pub fn remove_excess_headers(func: &mut Function, blocks: &[Block]) -> usize {
    let mut total = 0;
    for &b in blocks {
        total += prune_block(func, b);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Opcode, Type};

    #[test]
    fn prunes_trivial_single_pred_phi() {
        let mut func = Function::new();
        let entry = func.dfg.block(func.end).unwrap();
        let merge = func.dfg.blocks.make_block();
        func.dfg.blocks.add_pred(merge, entry);

        let value = func.dfg.make_node(Opcode::Const(1), Type::I32);
        let phi = func.dfg.make_node_with_inputs(Opcode::Phi, Type::I32, [value]);
        func.dfg.set_block(phi, merge);
        let user = func.dfg.make_node_with_inputs(Opcode::Add, Type::I32, [phi, phi]);

        let pruned = prune_block(&mut func, merge);
        assert_eq!(pruned, 1);
        assert_eq!(func.dfg.input(user, 0), value);
        assert_eq!(func.dfg.input(user, 1), value);
    }

    #[test]
    fn leaves_multi_pred_phis_alone() {
        let mut func = Function::new();
        let entry = func.dfg.block(func.end).unwrap();
        let other = func.dfg.blocks.make_block();
        let merge = func.dfg.blocks.make_block();
        func.dfg.blocks.add_pred(merge, entry);
        func.dfg.blocks.add_pred(merge, other);

        let a = func.dfg.make_node(Opcode::Const(1), Type::I32);
        let b = func.dfg.make_node(Opcode::Const(2), Type::I32);
        let phi = func.dfg.make_node_with_inputs(Opcode::Phi, Type::I32, [a, b]);
        func.dfg.set_block(phi, merge);

        assert_eq!(prune_block(&mut func, merge), 0);
        assert_eq!(func.dfg.arity(phi), 2);
    }
}
