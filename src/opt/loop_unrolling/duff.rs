//! Duff's-device fixup synthesis (spec.md §4.7).
//!
//! Grounded on `create_fixup_switch_header` and the residue arithmetic in
//! `original_source/ir/opt/loop_unrolling.c`: when the chosen factor
//! doesn't evenly divide the trip count, the leftover iterations (the
//! "residue") are run individually, once each, by jumping directly into
//! the matching offset inside the duplicated body -- the same trick
//! Duff's device uses to unroll a `switch` around a loop body. The
//! entry point is chosen by a descending chain of comparisons against
//! `(factor - 1 - i) * |step|`, so the first comparison that succeeds
//! picks the largest number of residual copies that still fit.

use crate::ir::{Block, Function, Node, Opcode, Relation};
use crate::opt::loop_unrolling::duplicate::Generation;
use crate::opt::loop_unrolling::header::HeaderInfo;
use crate::opt::loop_unrolling::induction::LinearInductionVariable;

/// The constant addend of the residue formula: `(|c| - 1)`, with a `+1`
/// correction for non-strict relations (`<=`/`>=`) -- mirrors the exact
/// residue-bound formula from the original source's
/// `update_header_condition`. This is only the addend; the full residue
/// is `|N - I| + (|c| - 1)` (plus that correction), built as a graph node
/// by [`build_residue`] since `N` and `I` need not be compile-time
/// constants.
pub fn residue_bound(step_const: i64, relation: Relation) -> i64 {
    let abs_step = step_const.abs();
    let correction = if relation.is_non_strict() { 1 } else { 0 };
    (abs_step - 1) + correction
}

/// Build `r = |N - I| + (|c| - 1)` (with the non-strict-relation `+1`
/// correction folded into the constant addend) as a graph node living in
/// `header`. This is the value the Duff switch's compare chain tests
/// against its descending thresholds.
pub fn build_residue(func: &mut Function, header: Block, iv: &LinearInductionVariable) -> Node {
    let ty = func.dfg.mode(iv.bound);
    let diff = func.dfg.make_node_with_inputs(Opcode::Sub, ty, [iv.bound, iv.base]);
    func.dfg.set_block(diff, header);
    let abs_diff = func.dfg.make_node_with_inputs(Opcode::Abs, ty, [diff]);
    func.dfg.set_block(abs_diff, header);
    let addend = residue_bound(iv.step_const, iv.relation);
    let addend_const = func.dfg.make_node(Opcode::Const(addend), ty);
    func.dfg.set_block(addend_const, header);
    let residue = func
        .dfg
        .make_node_with_inputs(Opcode::Add, ty, [abs_diff, addend_const]);
    func.dfg.set_block(residue, header);
    residue
}

/// The descending comparison chain's thresholds: `(factor - 1 - i) *
/// |step|` for `i` in `0..factor-1`. The first comparison
/// `residue >= threshold` that holds selects how many residual copies of
/// the body must run before falling into the fully-fused loop.
pub fn thresholds(factor: u32, step_const: i64) -> Vec<i64> {
    let abs_step = step_const.abs();
    (0..factor.saturating_sub(1))
        .map(|i| i64::from(factor - 1 - i) * abs_step)
        .collect()
}

/// The synthesized fixup switch: one comparison-and-branch block per
/// threshold, entered before the fully-fused loop.
pub struct DuffSwitch {
    /// The first block of the switch; this is where control enters
    /// instead of going straight to the fused header.
    pub entry: Block,
    /// The `Cmp` node built for each threshold, in descending order.
    pub compares: Vec<Node>,
}

/// Build the fixup switch ahead of the fused loop's header.
///
/// `residue` is a node computing the (non-negative) number of leftover
/// iterations at runtime; `generations` is the body-duplication result
/// from [`crate::opt::loop_unrolling::duplicate::duplicate_body`], so the
/// switch can jump directly into the right offset.
pub fn build_switch(
    func: &mut Function,
    info: &HeaderInfo,
    generations: &[Generation],
    residue: Node,
    factor: u32,
    step_const: i64,
) -> DuffSwitch {
    let th = thresholds(factor, step_const);
    let mut blocks = Vec::with_capacity(th.len());
    let mut compares = Vec::with_capacity(th.len());

    for _ in &th {
        blocks.push(func.dfg.blocks.make_block());
    }

    for (i, &threshold) in th.iter().enumerate() {
        let block = blocks[i];
        let threshold_const = func.dfg.make_node(Opcode::Const(threshold), func.dfg.mode(residue));
        let cmp = func.dfg.make_node_with_inputs(
            Opcode::Cmp(Relation::GreaterEqual),
            func.dfg.mode(residue),
            [residue, threshold_const],
        );
        func.dfg.set_block(cmp, block);
        let branch = func.dfg.make_node_with_inputs(Opcode::If, crate::ir::Type::Tuple, [cmp]);
        func.dfg.set_block(branch, block);
        compares.push(cmp);

        // `i` residual copies remaining corresponds to entering
        // generation `factor - 1 - i - 1` (0-indexed into `generations`,
        // which holds `factor - 1` entries for copies 2..=factor).
        let remaining = factor - 1 - i as u32;
        if remaining > 0 {
            if let Some(gen) = generations.get((remaining - 1) as usize) {
                if let Some(&target) = gen.blocks.get(&info.continue_block) {
                    func.dfg.blocks.add_pred(target, block);
                }
            }
        }
        // The false edge of the last comparison falls through to the
        // fully-fused header; intermediate false edges fall through to
        // the next comparison block.
        if let Some(&next) = blocks.get(i + 1) {
            func.dfg.blocks.add_pred(next, block);
        } else {
            func.dfg.blocks.add_pred(info.header, block);
        }
    }

    let entry = blocks.first().copied().unwrap_or(info.header);
    DuffSwitch { entry, compares }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residue_bound_adds_one_for_non_strict_relations() {
        assert_eq!(residue_bound(2, Relation::Less), 1);
        assert_eq!(residue_bound(2, Relation::LessEqual), 2);
    }

    #[test]
    fn thresholds_descend_by_step_size() {
        let th = thresholds(4, 2);
        assert_eq!(th, vec![6, 4, 2]);
    }

    #[test]
    fn thresholds_empty_for_factor_one() {
        assert!(thresholds(1, 3).is_empty());
    }

    #[test]
    fn build_residue_takes_absolute_difference_and_adds_the_bound_term() {
        use crate::ir::{Function, Type};

        let mut func = Function::new();
        let header = func.dfg.blocks.make_block();
        // Descending loop: base = 10, bound = 0, step = -3 -- |N - I| =
        // |0 - 10| = 10, regardless of operand order.
        let base = func.dfg.make_node(Opcode::Const(10), Type::I32);
        let bound = func.dfg.make_node(Opcode::Const(0), Type::I32);
        let phi = func.dfg.make_node(Opcode::Phi, Type::I32);
        let step_const = func.dfg.make_node(Opcode::Const(-3), Type::I32);
        let step_node = func
            .dfg
            .make_node_with_inputs(Opcode::Add, Type::I32, [phi, step_const]);
        let cmp = func
            .dfg
            .make_node_with_inputs(Opcode::Cmp(Relation::GreaterEqual), Type::I32, [phi, bound]);

        let iv = LinearInductionVariable {
            cmp,
            phi,
            base,
            step_node,
            step_op: Opcode::Add,
            step_const: -3,
            relation: Relation::GreaterEqual,
            bound,
        };

        let residue = build_residue(&mut func, header, &iv);
        assert_eq!(func.dfg.opcode(residue), Opcode::Add);
        let abs_diff = func.dfg.input(residue, 0);
        assert_eq!(func.dfg.opcode(abs_diff), Opcode::Abs);
        let diff = func.dfg.input(abs_diff, 0);
        assert_eq!(func.dfg.opcode(diff), Opcode::Sub);
        // addend = (|-3| - 1) + 1 (GreaterEqual is non-strict) = 3.
        let addend = func.dfg.input(residue, 1);
        assert_eq!(func.dfg.opcode(addend), Opcode::Const(3));
        assert_eq!(func.dfg.block(residue), Some(header));
    }
}
