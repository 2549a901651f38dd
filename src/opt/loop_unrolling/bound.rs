//! Bound rewriting (spec.md §4.6).
//!
//! Grounded on `update_header_condition_add`/`update_header_condition_mul`
//! and `create_r_pow`/`create_abs` in
//! `original_source/ir/opt/loop_unrolling.c`: the body duplicator already
//! chains each copy's own step by the original `c` (`duplicate_body`
//! leaves every clone's step node reading the shared, unmutated constant,
//! so copy 1 still advances by `c`, copy 2 by `c` again, and so on); what
//! the fused body as a whole needs is a header comparison that accounts
//! for the `factor - 1` extra steps now taken between two checks of the
//! loop condition. `N' = N ± |c|·(k-1)` for an additive/subtractive
//! induction variable, or `N' = (N / c^k) · c` for a multiplicative one
//! (`create_r_pow`'s repeated-squaring helper for `c^k`).

use crate::ir::{Function, Node, Opcode};
use crate::opt::loop_unrolling::induction::LinearInductionVariable;

/// Rewrite the header's comparison bound so the fused (duplicated) body
/// still exits at the right iteration once it advances `factor` original
/// iterations per pass. Returns the new bound node, which this function
/// also splices into `iv.cmp` in place of the old one.
pub fn rewrite_bound(func: &mut Function, iv: &LinearInductionVariable, factor: u32) -> Node {
    let ty = func.dfg.mode(iv.bound);
    let new_bound = match iv.step_op {
        Opcode::Add | Opcode::Sub => {
            let delta = abs_step(iv.step_const).saturating_mul(factor as i64 - 1);
            let delta_const = func.dfg.make_node(Opcode::Const(delta), ty);
            let op = if iv.relation.is_ascending() {
                Opcode::Sub
            } else {
                Opcode::Add
            };
            func.dfg.make_node_with_inputs(op, ty, [iv.bound, delta_const])
        }
        Opcode::Mul => {
            let c_pow = pow(iv.step_const, factor);
            let pow_const = func.dfg.make_node(Opcode::Const(c_pow), ty);
            let divided = func.dfg.make_node_with_inputs(Opcode::Div, ty, [iv.bound, pow_const]);
            let c_const = func.dfg.make_node(Opcode::Const(iv.step_const), ty);
            func.dfg.make_node_with_inputs(Opcode::Mul, ty, [divided, c_const])
        }
        _ => unreachable!("induction analysis only recognizes linear step ops"),
    };

    let arity = func.dfg.arity(iv.cmp);
    for i in 0..arity {
        if func.dfg.input(iv.cmp, i) == iv.bound {
            func.dfg.set_input(iv.cmp, i, new_bound);
            break;
        }
    }

    new_bound
}

/// `create_r_pow`: repeated-squaring integer power, used for the
/// multiplicative-step case.
fn pow(base: i64, exp: u32) -> i64 {
    let mut result: i64 = 1;
    let mut base = base;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.saturating_mul(base);
        }
        base = base.saturating_mul(base);
        exp >>= 1;
    }
    result
}

/// `create_abs`: absolute value, used by the Duff synthesizer's residue
/// formula (spec.md §4.7) for both additive and subtractive steps.
pub fn abs_step(step_const: i64) -> i64 {
    step_const.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Relation, Type};

    fn build_add_iv(func: &mut Function, step: i64, relation: Relation) -> LinearInductionVariable {
        let base = func.dfg.make_node(Opcode::Const(0), Type::I32);
        let bound = func.dfg.make_node(Opcode::Const(10), Type::I32);
        let phi = func.dfg.make_node(Opcode::Phi, Type::I32);
        let step_const = func.dfg.make_node(Opcode::Const(step), Type::I32);
        let step_node = func.dfg.make_node_with_inputs(Opcode::Add, Type::I32, [phi, step_const]);
        let cmp = func.dfg.make_node_with_inputs(Opcode::Cmp(relation), Type::I32, [phi, bound]);
        LinearInductionVariable {
            cmp,
            phi,
            base,
            step_node,
            step_op: Opcode::Add,
            step_const: step,
            relation,
            bound,
        }
    }

    #[test]
    fn ascending_bound_is_lowered_by_delta_times_factor_minus_one() {
        let mut func = Function::new();
        let iv = build_add_iv(&mut func, 2, Relation::Less);
        let new_bound = rewrite_bound(&mut func, &iv, 4);
        // delta = |2| * (4-1) = 6, so N' = N - 6.
        assert_eq!(func.dfg.opcode(new_bound), Opcode::Sub);
        assert_eq!(func.dfg.input(new_bound, 0), iv.bound);
        assert_eq!(func.dfg.opcode(func.dfg.input(new_bound, 1)), Opcode::Const(6));
        // The comparison now reads the new bound, not the old one.
        assert_eq!(func.dfg.input(iv.cmp, 1), new_bound);
    }

    #[test]
    fn descending_bound_is_raised_by_delta_times_factor_minus_one() {
        let mut func = Function::new();
        let iv = build_add_iv(&mut func, -2, Relation::GreaterEqual);
        let new_bound = rewrite_bound(&mut func, &iv, 3);
        // delta = |-2| * (3-1) = 4, so N' = N + 4 (not `less`).
        assert_eq!(func.dfg.opcode(new_bound), Opcode::Add);
        assert_eq!(func.dfg.opcode(func.dfg.input(new_bound, 1)), Opcode::Const(4));
    }

    #[test]
    fn pow_computes_repeated_multiplication() {
        assert_eq!(pow(2, 10), 1024);
        assert_eq!(pow(3, 0), 1);
    }
}
