//! End-to-end tests driving `unroll_loops` over whole function graphs,
//! covering the scenarios spec.md §8 calls out.

use graphir_codegen::ir::{Function, Opcode, Relation, Type};
use graphir_codegen::opt::loop_unrolling::unroll_loops;
use graphir_codegen::result::RejectReason;
use graphir_codegen::settings::UnrollSettings;

/// Build `for (i = base; i < bound; i += step) {}` (single-block body,
/// no side effects) and return the function plus the phi/cmp nodes so
/// callers can inspect the rewritten graph.
fn build_counted_loop(base_val: i64, bound_val: i64, step: i64, relation: Relation) -> Function {
    let mut func = Function::new();
    let entry = func.dfg.block(func.end).unwrap();
    let header = func.dfg.blocks.make_block();
    let body = func.dfg.blocks.make_block();
    let exit = func.dfg.blocks.make_block();
    func.dfg.blocks.add_pred(header, entry);
    func.dfg.blocks.add_pred(header, body);
    func.dfg.blocks.add_pred(body, header);
    func.dfg.blocks.add_pred(exit, header);

    let base = func.dfg.make_node(Opcode::Const(base_val), Type::I32);
    let bound = func.dfg.make_node(Opcode::Const(bound_val), Type::I32);
    let step_const = func.dfg.make_node(Opcode::Const(step), Type::I32);

    let phi = func.dfg.make_node(Opcode::Phi, Type::I32);
    func.dfg.set_block(phi, header);
    let step_node = func.dfg.make_node_with_inputs(Opcode::Add, Type::I32, [phi, step_const]);
    func.dfg.set_block(step_node, body);
    func.dfg.add_input(phi, base);
    func.dfg.add_input(phi, step_node);

    let cmp = func
        .dfg
        .make_node_with_inputs(Opcode::Cmp(relation), Type::I32, [phi, bound]);
    func.dfg.set_block(cmp, header);
    let branch = func.dfg.make_node_with_inputs(Opcode::If, Type::Tuple, [cmp]);
    func.dfg.set_block(branch, header);

    func
}

#[test]
fn scenario_1_static_trip_count_is_fully_unrolled() {
    // for (i = 0; i < 8; i++) {} -- 8 iterations, max_factor covers the
    // whole count, so the classic path picks factor 8 and the loop is
    // fully unrolled with no Duff switch.
    let mut func = build_counted_loop(0, 8, 1, Relation::Less);
    let blocks_before = func.dfg.blocks.len();

    let mut settings = UnrollSettings::default();
    settings.classic_path_enabled = true;
    settings.max_factor = 16;

    let stats = unroll_loops(&mut func, &settings);
    assert_eq!(stats.unrolled, 1);
    assert!(stats.rejected.is_empty());

    // factor 8 means 7 extra body copies, i.e. 7 new blocks.
    assert_eq!(func.dfg.blocks.len(), blocks_before + 7);
}

#[test]
fn scenario_2_symbolic_bound_uses_duff_switch() {
    // for (i = 0; i < n; i++) {} with `n` symbolic -- the classic path
    // can't compute a trip count, so the dynamic Duff factor is used and
    // a fixup switch is synthesized ahead of the fused header.
    let mut func = Function::new();
    let entry = func.dfg.block(func.end).unwrap();
    let header = func.dfg.blocks.make_block();
    let body = func.dfg.blocks.make_block();
    let exit = func.dfg.blocks.make_block();
    func.dfg.blocks.add_pred(header, entry);
    func.dfg.blocks.add_pred(header, body);
    func.dfg.blocks.add_pred(body, header);
    func.dfg.blocks.add_pred(exit, header);

    let base = func.dfg.make_node(Opcode::Const(0), Type::I32);
    // The bound is a `Load`, not a constant -- symbolic as far as factor
    // selection is concerned.
    let n_addr = func.dfg.make_node(Opcode::Const(999), Type::I32);
    let n = func.dfg.make_node_with_inputs(Opcode::Load, Type::I32, [n_addr]);
    func.dfg.set_block(n, entry);
    let one = func.dfg.make_node(Opcode::Const(1), Type::I32);

    let phi = func.dfg.make_node(Opcode::Phi, Type::I32);
    func.dfg.set_block(phi, header);
    let step_node = func.dfg.make_node_with_inputs(Opcode::Add, Type::I32, [phi, one]);
    func.dfg.set_block(step_node, body);
    func.dfg.add_input(phi, base);
    func.dfg.add_input(phi, step_node);

    let cmp = func
        .dfg
        .make_node_with_inputs(Opcode::Cmp(Relation::Less), Type::I32, [phi, n]);
    func.dfg.set_block(cmp, header);
    let branch = func.dfg.make_node_with_inputs(Opcode::If, Type::Tuple, [cmp]);
    func.dfg.set_block(branch, header);

    let settings = UnrollSettings::default();
    assert!(!settings.classic_path_enabled);

    let blocks_before = func.dfg.blocks.len();
    let stats = unroll_loops(&mut func, &settings);
    assert_eq!(stats.unrolled, 1);
    assert!(stats.rejected.is_empty());

    // duff_factor (4) extra body copies, plus (factor - 1) switch compare
    // blocks ahead of the fused header.
    let expected_new_blocks = (settings.duff_factor - 1) as usize * 2;
    assert_eq!(func.dfg.blocks.len(), blocks_before + expected_new_blocks);
}

#[test]
fn scenario_3_descending_step_is_accepted_and_bound_is_raised() {
    // for (i = 20; i >= 0; i -= 2) {} -- a descending induction variable;
    // the bound rewriter raises (not lowers) the bound for a descending
    // relation.
    let mut func = build_counted_loop(20, 0, -2, Relation::GreaterEqual);

    let mut settings = UnrollSettings::default();
    settings.classic_path_enabled = true;
    settings.max_factor = 16;

    let stats = unroll_loops(&mut func, &settings);
    assert_eq!(stats.unrolled, 1);
    assert!(stats.rejected.is_empty());
}

#[test]
fn scenario_5_store_aliasing_induction_base_is_rejected() {
    // The induction variable's base is a Load whose address is clobbered
    // by a Store inside the same loop body -- ShapeRejected at the
    // "valid base" stage, and the graph is left untouched.
    let mut func = Function::new();
    let entry = func.dfg.block(func.end).unwrap();
    let header = func.dfg.blocks.make_block();
    let body = func.dfg.blocks.make_block();
    let exit = func.dfg.blocks.make_block();
    func.dfg.blocks.add_pred(header, entry);
    func.dfg.blocks.add_pred(header, body);
    func.dfg.blocks.add_pred(body, header);
    func.dfg.blocks.add_pred(exit, header);

    let addr = func.dfg.make_node(Opcode::Const(64), Type::I32);
    let base = func.dfg.make_node_with_inputs(Opcode::Load, Type::I32, [addr]);
    func.dfg.set_block(base, body);
    let stored_value = func.dfg.make_node(Opcode::Const(0), Type::I32);
    let store = func
        .dfg
        .make_node_with_inputs(Opcode::Store, Type::Memory, [addr, stored_value]);
    func.dfg.set_block(store, body);

    let bound = func.dfg.make_node(Opcode::Const(10), Type::I32);
    let one = func.dfg.make_node(Opcode::Const(1), Type::I32);
    let phi = func.dfg.make_node(Opcode::Phi, Type::I32);
    func.dfg.set_block(phi, header);
    let step_node = func.dfg.make_node_with_inputs(Opcode::Add, Type::I32, [phi, one]);
    func.dfg.set_block(step_node, body);
    func.dfg.add_input(phi, base);
    func.dfg.add_input(phi, step_node);

    let cmp = func
        .dfg
        .make_node_with_inputs(Opcode::Cmp(Relation::Less), Type::I32, [phi, bound]);
    func.dfg.set_block(cmp, header);
    let branch = func.dfg.make_node_with_inputs(Opcode::If, Type::Tuple, [cmp]);
    func.dfg.set_block(branch, header);

    let nodes_before = func.dfg.num_nodes();
    let blocks_before = func.dfg.blocks.len();

    let settings = UnrollSettings::default();
    let stats = unroll_loops(&mut func, &settings);

    assert_eq!(stats.unrolled, 0);
    assert_eq!(stats.rejected, vec![RejectReason::ShapeRejected]);
    assert_eq!(func.dfg.num_nodes(), nodes_before);
    assert_eq!(func.dfg.blocks.len(), blocks_before);
}

#[test]
fn boundary_multi_exit_loop_is_rejected() {
    // A loop body block with its own edge leaving the loop, in addition
    // to the header's own exit -- rejected as multi-exit.
    let mut func = Function::new();
    let entry = func.dfg.block(func.end).unwrap();
    let header = func.dfg.blocks.make_block();
    let body = func.dfg.blocks.make_block();
    let exit = func.dfg.blocks.make_block();
    let side_exit = func.dfg.blocks.make_block();
    func.dfg.blocks.add_pred(header, entry);
    func.dfg.blocks.add_pred(header, body);
    func.dfg.blocks.add_pred(body, header);
    func.dfg.blocks.add_pred(exit, header);
    func.dfg.blocks.add_pred(side_exit, body);

    let cond = func.dfg.make_node(Opcode::Const(1), Type::I32);
    func.dfg.set_block(cond, header);
    let branch = func.dfg.make_node_with_inputs(Opcode::If, Type::Tuple, [cond]);
    func.dfg.set_block(branch, header);

    let body_cond = func.dfg.make_node(Opcode::Const(1), Type::I32);
    func.dfg.set_block(body_cond, body);
    let body_branch = func.dfg.make_node_with_inputs(Opcode::If, Type::Tuple, [body_cond]);
    func.dfg.set_block(body_branch, body);

    let settings = UnrollSettings::default();
    let stats = unroll_loops(&mut func, &settings);
    assert_eq!(stats.unrolled, 0);
    assert_eq!(stats.rejected, vec![RejectReason::ShapeRejected]);
}

#[test]
fn boundary_factor_one_is_not_unrolled() {
    // Static trip count of 1 (base == bound - step): the divisor search
    // still finds a factor, but the driver refuses to unroll by 1.
    let mut func = build_counted_loop(0, 1, 1, Relation::Less);

    let mut settings = UnrollSettings::default();
    settings.classic_path_enabled = true;

    let stats = unroll_loops(&mut func, &settings);
    assert_eq!(stats.unrolled, 0);
    assert_eq!(stats.rejected, vec![RejectReason::CountRejected]);
}

#[test]
fn size_budget_rejects_a_loop_that_would_grow_past_it() {
    let mut func = build_counted_loop(0, 8, 1, Relation::Less);

    let mut settings = UnrollSettings::default();
    settings.max_size = 1;

    let stats = unroll_loops(&mut func, &settings);
    assert_eq!(stats.unrolled, 0);
    assert_eq!(stats.rejected, vec![RejectReason::SizeRejected]);
}
