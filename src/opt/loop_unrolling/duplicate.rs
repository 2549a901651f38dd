//! Body duplication (spec.md §4.4).
//!
//! Grounded on `duplicate_node`/`duplicate_block`/`recursive_copy_in_loop`
//! in `original_source/ir/opt/loop_unrolling.c`: clone every block and
//! node inside the loop body (everything but the header) `factor - 1`
//! times, recording each original->clone mapping in the per-node link
//! slot, then rewire each clone's inputs to point at the previous
//! generation's clones (or at the original, loop-invariant node, when
//! there is no clone). The generations are chained in sequence so the
//! unrolled body executes copy 1, then copy 2, ..., then copy `factor`
//! per outer iteration, with the phi's back edge moved to originate from
//! the last generation.

use crate::ir::{Block, Function, Node};
use crate::loop_analysis::{LoopElement, LoopForest};
use crate::opt::loop_unrolling::header::HeaderInfo;
use crate::opt::loop_unrolling::induction::LinearInductionVariable;

/// One additional copy of the loop body.
pub struct Generation {
    /// Maps each original body block to this generation's clone.
    pub blocks: std::collections::HashMap<Block, Block>,
    /// The clone of the induction step node in this generation, i.e. the
    /// value the induction variable holds after this copy runs.
    pub step_clone: Node,
}

/// The result of duplicating a loop body `factor - 1` extra times.
pub struct DuplicationResult {
    /// One entry per extra copy, in execution order.
    pub generations: Vec<Generation>,
    /// How many nodes were newly added to the keep-alive set while
    /// splicing clones of already-kept-alive nodes (spec.md §4.4 step 4).
    /// The verifier uses this as the expected keep-alive-set delta.
    pub keepalive_additions: usize,
}

/// Duplicate the body of the loop described by `info`/`iv` so that it
/// runs `factor` times per outer-loop iteration.
pub fn duplicate_body(
    func: &mut Function,
    forest: &LoopForest,
    lp: crate::ir::Loop,
    info: &HeaderInfo,
    iv: &LinearInductionVariable,
    factor: u32,
) -> DuplicationResult {
    let body_blocks: Vec<Block> = forest
        .elements(lp)
        .iter()
        .filter_map(|e| match e {
            LoopElement::Block(b) if *b != info.header => Some(*b),
            _ => None,
        })
        .collect();

    func.dfg.reserve_links();

    let mut generations = Vec::new();
    let mut prev_step = iv.step_node;
    // The block whose control falls into the next generation's copy of
    // the loop's continue block; starts out as the original body itself,
    // then becomes each generation's own clone of it.
    let mut prev_exit = info.continue_block;
    let mut keepalive_additions = 0usize;

    for _ in 1..factor {
        func.dfg.clear_links();

        // Clone every block in the body.
        let mut block_map = std::collections::HashMap::new();
        for &b in &body_blocks {
            block_map.insert(b, func.dfg.blocks.make_block());
        }

        // Preserve internal control flow between cloned blocks (beyond
        // the single entry edge handled below): any predecessor that is
        // itself a body block gets remapped to its own clone.
        for &b in &body_blocks {
            let original_preds: Vec<Block> = func.dfg.blocks.data(b).preds.to_vec();
            for pred in original_preds {
                if let Some(&pred_clone) = block_map.get(&pred) {
                    func.dfg.blocks.add_pred(block_map[&b], pred_clone);
                }
            }
        }

        // Clone every node assigned to a body block.
        let mut nodes_to_clone = Vec::new();
        for &b in &body_blocks {
            nodes_to_clone.extend(func.dfg.nodes_in_block(b));
        }
        for &n in &nodes_to_clone {
            let clone = func.dfg.duplicate(n);
            let new_block = block_map[&func.dfg.block(n).unwrap()];
            func.dfg.set_block(clone, new_block);
            func.dfg.set_link(n, clone);
        }

        // Rewire clone inputs: prefer a same-generation clone; fall back
        // to the previous generation's step clone for the induction
        // variable's own use (the chain between copies); otherwise reuse
        // the original (loop-invariant) node.
        for &n in &nodes_to_clone {
            let clone = func.dfg.link(n).unwrap();
            let arity = func.dfg.arity(clone);
            for i in 0..arity {
                let original_input = func.dfg.input(n, i);
                let rewired = if original_input == iv.phi {
                    prev_step
                } else {
                    func.dfg.link(original_input).unwrap_or(original_input)
                };
                func.dfg.set_input(clone, i, rewired);
            }
        }

        // Splice out-of-loop successors of duplicated nodes (spec.md §4.4
        // step 4): a clone whose original was kept alive by `End` is kept
        // alive too, and a clone whose original fed a phi outside the loop
        // is spliced into that phi as an extra input.
        for &n in &nodes_to_clone {
            let clone = func.dfg.link(n).unwrap();
            if func.dfg.keep_alive_set().contains(&n) {
                func.dfg.add_keepalive(clone);
                keepalive_additions += 1;
            }
            for user in func.dfg.outs(n) {
                let user_in_loop = func
                    .dfg
                    .block(user)
                    .map(|b| forest.block_in_loop(b, lp))
                    .unwrap_or(false);
                if user_in_loop {
                    continue;
                }
                if func.dfg.is_phi(user) {
                    func.dfg.add_input(user, clone);
                }
            }
        }

        // Chain control flow: the clone of the body's entry block (the
        // loop's continue block) is fed by whichever block the previous
        // generation exited through.
        if let Some(&continue_clone) = block_map.get(&info.continue_block) {
            func.dfg.blocks.add_pred(continue_clone, prev_exit);
            prev_exit = continue_clone;
        }

        let step_clone = func
            .dfg
            .link(iv.step_node)
            .expect("step node is always inside the body");

        generations.push(Generation {
            blocks: block_map,
            step_clone,
        });
        prev_step = step_clone;
    }

    // Rewire the header specially (spec.md §4.4 step 3): its out-of-loop
    // input is untouched, but its in-loop (back-edge) input now comes from
    // the last generation's clone of the original back-edge predecessor,
    // and every header phi's corresponding input is rewritten in parallel
    // to read that generation's clone of the value instead of the
    // original's. This must happen while the last generation's link table
    // is still live, hence before `release_links`.
    if let Some(last_gen) = generations.last() {
        let header_preds = func.dfg.blocks.data(info.header).preds.clone();
        let header_phis: Vec<Node> = func
            .dfg
            .nodes_in_block(info.header)
            .into_iter()
            .filter(|&n| func.dfg.is_phi(n))
            .collect();

        for (slot, pred) in header_preds.iter().enumerate() {
            if let Some(&pred_clone) = last_gen.blocks.get(pred) {
                func.dfg.blocks.data_mut(info.header).preds[slot] = pred_clone;
                for &phi in &header_phis {
                    if slot < func.dfg.arity(phi) {
                        let original_input = func.dfg.input(phi, slot);
                        let replacement = func.dfg.link(original_input).unwrap_or(original_input);
                        func.dfg.set_input(phi, slot, replacement);
                    }
                }
            }
        }
    }

    func.dfg.release_links();

    DuplicationResult {
        generations,
        keepalive_additions,
    }
}
