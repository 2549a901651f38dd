//! Induction-variable analysis (spec.md §4.2).
//!
//! Grounded on `determine_lin_unroll_info`, `is_valid_base`,
//! `check_cycle_and_find_exit`/`phi_cycle_dfs`, and `check_phi` in
//! `original_source/ir/opt/loop_unrolling.c`: starting from the header's
//! branch condition, walk back to find a header phi that is compared
//! against a loop-invariant bound, fed by a loop-invariant base on the
//! entry edge and by a constant-step linear operation on the back edge.
//! Anything this walk can't resolve -- a non-constant step, a base that
//! depends on another loop-carried value, a phi reached through more than
//! one in-loop predecessor -- is rejected with
//! [`RejectReason::ModeRejected`].

use crate::alias::{AliasOracle, ConservativeAliasOracle, MemRef};
use crate::ir::{Function, Node, Opcode, Relation};
use crate::loop_analysis::LoopForest;
use crate::opt::loop_unrolling::header::HeaderInfo;
use crate::result::RejectReason;
use std::collections::HashSet;

/// A recognized linear induction variable: `phi = base` on entry,
/// `phi' = phi OP step_const` on the back edge, compared against `bound`
/// with `relation`.
#[derive(Clone, Copy, Debug)]
pub struct LinearInductionVariable {
    /// The `Cmp` node comparing the phi against `bound`, as found in the
    /// header (the bound rewriter patches this node's bound operand in
    /// place).
    pub cmp: Node,
    /// The header phi carrying the induction variable.
    pub phi: Node,
    /// The value the phi takes on loop entry.
    pub base: Node,
    /// The arithmetic node computing the next iteration's value.
    pub step_node: Node,
    /// Which linear operation `step_node` performs.
    pub step_op: Opcode,
    /// The constant operand of `step_node` (the per-iteration delta, or
    /// the multiplier for a `Mul` step).
    pub step_const: i64,
    /// The relation the header branch's comparison uses.
    pub relation: Relation,
    /// The loop-invariant node the induction variable is compared
    /// against.
    pub bound: Node,
}

/// Analyze `info`'s header branch to find the linear induction variable
/// controlling it, if any.
pub fn analyze(
    func: &Function,
    forest: &LoopForest,
    lp: crate::ir::Loop,
    info: &HeaderInfo,
) -> Result<LinearInductionVariable, RejectReason> {
    let cond = func.dfg.input(info.branch, 0);
    let relation = match func.dfg.opcode(cond) {
        Opcode::Cmp(r) => r,
        _ => {
            log::debug!("header branch condition is not a direct comparison");
            return Err(RejectReason::ModeRejected);
        }
    };

    if func.dfg.arity(cond) != 2 {
        return Err(RejectReason::ModeRejected);
    }
    let lhs = func.dfg.input(cond, 0);
    let rhs = func.dfg.input(cond, 1);

    let (phi_side, bound_side, relation) = if func.dfg.block(lhs) == Some(info.header)
        && func.dfg.is_phi(skip_trivial_phis(func, lhs))
    {
        (lhs, rhs, relation)
    } else if func.dfg.block(rhs) == Some(info.header) && func.dfg.is_phi(skip_trivial_phis(func, rhs))
    {
        (rhs, lhs, relation.swapped())
    } else {
        log::debug!("header comparison does not reference a header phi");
        return Err(RejectReason::ModeRejected);
    };

    let phi = skip_trivial_phis(func, phi_side);
    if !at_most_one_loop_pred(func, forest, lp, phi) {
        log::debug!("induction phi {:?} has more than one in-loop predecessor", phi);
        return Err(RejectReason::ModeRejected);
    }

    if is_defined_in_loop(func, forest, lp, bound_side) {
        log::debug!("loop bound {:?} is not loop-invariant", bound_side);
        return Err(RejectReason::ModeRejected);
    }

    let preds = func.dfg.blocks.data(info.header).preds.clone();
    if preds.len() != func.dfg.arity(phi) {
        return Err(RejectReason::ModeRejected);
    }

    let mut base = None;
    let mut step_node = None;
    for (i, &pred) in preds.iter().enumerate() {
        let input = func.dfg.input(phi, i);
        if forest.block_in_loop(pred, lp) {
            step_node = Some(input);
        } else {
            base = Some(input);
        }
    }
    let (base, step_node) = match (base, step_node) {
        (Some(b), Some(s)) => (b, s),
        _ => {
            log::debug!("induction phi {:?} lacks a clean entry/back-edge split", phi);
            return Err(RejectReason::ModeRejected);
        }
    };

    let oracle = ConservativeAliasOracle;
    let alias_candidates = crate::alias::gather_alias_candidates(func, forest, lp);
    if !is_valid_base(func, forest, lp, base, &mut HashSet::new(), &oracle, &alias_candidates) {
        log::debug!("induction base {:?} is not a valid (loop-invariant, non-aliased) base", base);
        return Err(RejectReason::ShapeRejected);
    }

    let step_node_resolved = skip_trivial_phis(func, step_node);
    let step_opcode = func.dfg.opcode(step_node_resolved);
    if !step_opcode.is_linear_step() {
        log::debug!("induction step {:?} is not a recognized linear op", step_node_resolved);
        return Err(RejectReason::ModeRejected);
    }
    if func.dfg.arity(step_node_resolved) != 2 {
        return Err(RejectReason::ModeRejected);
    }
    let s_lhs = func.dfg.input(step_node_resolved, 0);
    let s_rhs = func.dfg.input(step_node_resolved, 1);
    let (carries_phi, const_operand) = if s_lhs == phi {
        (true, s_rhs)
    } else if s_rhs == phi {
        (true, s_lhs)
    } else {
        (false, s_rhs)
    };
    if !carries_phi {
        log::debug!("induction step {:?} does not feed back into its own phi", step_node_resolved);
        return Err(RejectReason::ModeRejected);
    }
    let step_const = match func.dfg.opcode(const_operand) {
        Opcode::Const(c) => c,
        _ => {
            log::debug!("induction step {:?} has a non-constant delta", step_node_resolved);
            return Err(RejectReason::ModeRejected);
        }
    };

    Ok(LinearInductionVariable {
        cmp: cond,
        phi,
        base,
        step_node: step_node_resolved,
        step_op: step_opcode,
        step_const,
        relation,
        bound: bound_side,
    })
}

/// `at_most_one_loop_pred`: the uniform criterion used by both the
/// induction-variable analyzer and the bound rewriter (DESIGN.md, Open
/// Question 3) -- a phi may have at most one predecessor block that is
/// itself inside the loop.
pub fn at_most_one_loop_pred(
    func: &Function,
    forest: &LoopForest,
    lp: crate::ir::Loop,
    phi: Node,
) -> bool {
    let block = match func.dfg.block(phi) {
        Some(b) => b,
        None => return false,
    };
    let in_loop_preds = func
        .dfg
        .blocks
        .data(block)
        .preds
        .iter()
        .filter(|&&p| forest.block_in_loop(p, lp))
        .count();
    in_loop_preds <= 1
}

/// Skip through trivial (arity-1) phis, which LCSSA can insert between a
/// definition and its use without changing the value. Grounded on
/// `skip_trivial_phis` in the original source. A visited set guards
/// against the cyclic-phi case `check_cycle_and_find_exit` exists for.
pub fn skip_trivial_phis(func: &Function, mut n: Node) -> Node {
    let mut visited = HashSet::new();
    while func.dfg.is_phi(n) && func.dfg.arity(n) == 1 {
        if !visited.insert(n) {
            break;
        }
        n = func.dfg.input(n, 0);
    }
    n
}

fn is_defined_in_loop(func: &Function, forest: &LoopForest, lp: crate::ir::Loop, n: Node) -> bool {
    match func.dfg.block(n) {
        Some(b) => forest.block_in_loop(b, lp),
        None => false,
    }
}

/// `is_valid_base`: is `n` safe to use as an induction variable's entry
/// value? Per spec.md §4.2, `n` is a valid base when it is a constant,
/// when its block lies outside the loop, when it is a pure `Load`/`Call`
/// whose address cannot alias any [`crate::alias::gather_alias_candidates`]
/// entry, or when it is a Phi whose every predecessor is itself a valid
/// base and at most one predecessor originates inside the loop. Anything
/// else defined inside the loop (a plain arithmetic op, say) is not a
/// valid base even if all of its own inputs are loop-invariant -- that
/// would make it itself a second loop-carried value, not a base.
/// Recursive with a visited set to tolerate phi cycles, matching the
/// original source's `is_valid_base_` helper.
fn is_valid_base(
    func: &Function,
    forest: &LoopForest,
    lp: crate::ir::Loop,
    n: Node,
    visited: &mut HashSet<Node>,
    oracle: &dyn AliasOracle,
    alias_candidates: &[MemRef],
) -> bool {
    if !visited.insert(n) {
        return true;
    }
    if func.dfg.opcode(n).is_block_independent() {
        return true;
    }
    if !is_defined_in_loop(func, forest, lp, n) {
        return true;
    }

    match func.dfg.opcode(n) {
        Opcode::Load => {
            let addr = func.dfg.input(n, 0);
            let addr_ref = crate::alias::mem_ref_for_address(func, addr);
            !crate::alias::aliases_any(oracle, &addr_ref, alias_candidates)
        }
        Opcode::Call => {
            // No call-graph to walk a callee's purity through; a call
            // found inside the loop is never provably non-aliasing.
            false
        }
        Opcode::Phi => {
            at_most_one_loop_pred(func, forest, lp, n)
                && (0..func.dfg.arity(n)).all(|i| {
                    let input = func.dfg.input(n, i);
                    is_valid_base(func, forest, lp, input, visited, oracle, alias_candidates)
                })
        }
        _ => false,
    }
}
