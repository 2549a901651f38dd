//! A conservative memory alias oracle.
//!
//! Grounded on `alias_candidates`/`is_aliased`/`walk_call_for_aliases` in
//! `original_source/ir/opt/loop_unrolling.c`: before duplicating a loop
//! body that contains memory operations, the pass needs to know whether
//! any two memory references inside the loop might touch the same
//! location, since the body duplicator and bound rewriter must not reorder
//! aliasing stores relative to loads across iterations. A standalone
//! crate with no call graph of its own models a callee's effect on memory
//! as an opaque, caller-supplied [`CalleeSummary`] rather than walking
//! into a callee graph directly.

use crate::ir::{Function, Loop, Node, Opcode};
use crate::loop_analysis::{LoopElement, LoopForest};

/// A symbolic memory location: either a fixed global/constant base, or an
/// unknown base rooted at some node (a pointer parameter, a `Load`
/// result, etc.).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MemRef {
    /// A reference whose base is statically known to be a particular
    /// constant-valued node (e.g. the address of a global).
    ConstantBase(Node),
    /// A reference whose base cannot be resolved any further; assumed to
    /// possibly alias any other unknown-based reference.
    UnknownBase(Node),
}

/// What is known about a called function's effect on memory, supplied by
/// the caller since this crate has no cross-function call graph.
#[derive(Clone, Debug, Default)]
pub struct CalleeSummary {
    /// `true` if the callee is known to neither read nor write through
    /// any pointer reachable from its parameters or globals.
    pub pure: bool,
    /// Memory references derived from the callee's parameters, if known.
    /// Used the same way `walk_call_for_aliases` in the original source
    /// falls back to parameter-derived addresses for an unanalyzable
    /// callee.
    pub parameter_derived: Vec<MemRef>,
}

/// Conservative alias analysis used by the induction-variable analyzer
/// and body duplicator to check whether unrolling would be unsound for a
/// loop with memory side effects.
pub trait AliasOracle {
    /// May `a` and `b` refer to overlapping memory?
    fn may_alias(&self, a: &MemRef, b: &MemRef) -> bool;
}

/// The default, conservative oracle: same constant base aliases itself;
/// different constant bases never alias; anything involving an unknown
/// base is assumed to possibly alias, matching the original source's
/// "when in doubt, it aliases" posture for `is_aliased`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConservativeAliasOracle;

impl AliasOracle for ConservativeAliasOracle {
    fn may_alias(&self, a: &MemRef, b: &MemRef) -> bool {
        match (a, b) {
            (MemRef::ConstantBase(x), MemRef::ConstantBase(y)) => x == y,
            _ => true,
        }
    }
}

/// Do any of `refs` possibly alias any other reference in `refs`
/// (including itself, trivially)? Grounded on `alias_candidates`'s
/// all-pairs scan over the memory operations found inside a loop body.
pub fn any_pair_aliases(oracle: &dyn AliasOracle, refs: &[MemRef]) -> bool {
    for (i, a) in refs.iter().enumerate() {
        for b in &refs[i + 1..] {
            if oracle.may_alias(a, b) {
                return true;
            }
        }
    }
    false
}

/// Does `candidate` possibly alias anything in `candidates`? The
/// induction-variable analyzer's "valid base" check (spec.md §4.2) uses
/// this to decide whether a `Load`'s address may be clobbered by a
/// `Store` found anywhere inside the loop being considered for
/// unrolling.
pub fn aliases_any(oracle: &dyn AliasOracle, candidate: &MemRef, candidates: &[MemRef]) -> bool {
    candidates.iter().any(|c| oracle.may_alias(candidate, c))
}

/// The symbolic memory reference a `Load`/`Store`'s address operand
/// represents: a known constant base if the address is itself a
/// compile-time constant, otherwise an opaque base rooted at the address
/// node.
pub fn mem_ref_for_address(func: &Function, addr: Node) -> MemRef {
    match func.dfg.opcode(addr) {
        Opcode::Const(_) => MemRef::ConstantBase(addr),
        _ => MemRef::UnknownBase(addr),
    }
}

/// Gather `L`'s alias candidates (spec.md §4.2): every `Store`'s address
/// found anywhere inside the loop, recursing into sub-loops, plus a
/// conservative unknown-base entry for every `Call` (this crate has no
/// call graph to walk a callee's effects through, so every call is
/// assumed capable of storing through an unresolvable address -- the
/// same fallback `walk_call_for_aliases` takes for an unanalyzable
/// callee).
pub fn gather_alias_candidates(func: &Function, forest: &LoopForest, lp: Loop) -> Vec<MemRef> {
    let mut candidates = Vec::new();
    collect_candidates(func, forest, lp, &mut candidates);
    candidates
}

fn collect_candidates(func: &Function, forest: &LoopForest, lp: Loop, out: &mut Vec<MemRef>) {
    for element in forest.elements(lp) {
        match element {
            LoopElement::Block(b) => {
                for node in func.dfg.nodes_in_block(*b) {
                    match func.dfg.opcode(node) {
                        Opcode::Store => {
                            let addr = func.dfg.input(node, 0);
                            out.push(mem_ref_for_address(func, addr));
                        }
                        Opcode::Call => out.push(MemRef::UnknownBase(node)),
                        _ => {}
                    }
                }
            }
            LoopElement::SubLoop(inner) => collect_candidates(func, forest, *inner, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn distinct_constant_bases_do_not_alias() {
        let oracle = ConservativeAliasOracle;
        let a = MemRef::ConstantBase(Node::new(0));
        let b = MemRef::ConstantBase(Node::new(1));
        assert!(!oracle.may_alias(&a, &b));
    }

    #[test]
    fn unknown_bases_are_conservatively_aliased() {
        let oracle = ConservativeAliasOracle;
        let a = MemRef::UnknownBase(Node::new(0));
        let b = MemRef::UnknownBase(Node::new(1));
        assert!(oracle.may_alias(&a, &b));
    }

    #[test]
    fn gather_alias_candidates_finds_store_in_loop_body() {
        use crate::dominator_tree::DominatorTree;
        use crate::flowgraph::ControlFlowGraph;
        use crate::ir::{Function, Type};

        let mut func = Function::new();
        let entry = func.dfg.block(func.end).unwrap();
        let header = func.dfg.blocks.make_block();
        let body = func.dfg.blocks.make_block();
        let exit = func.dfg.blocks.make_block();
        func.dfg.blocks.add_pred(header, entry);
        func.dfg.blocks.add_pred(header, body);
        func.dfg.blocks.add_pred(body, header);
        func.dfg.blocks.add_pred(exit, header);

        let addr = func.dfg.make_node(Opcode::Const(42), Type::I32);
        let value = func.dfg.make_node(Opcode::Const(1), Type::I32);
        let store = func.dfg.make_node_with_inputs(Opcode::Store, Type::Memory, [addr, value]);
        func.dfg.set_block(store, body);

        let cfg = ControlFlowGraph::with_function(&func);
        let domtree = DominatorTree::compute(&cfg, entry);
        let forest = LoopForest::compute(&cfg, &domtree);
        let lp = forest.loop_of(body).unwrap();

        let candidates = gather_alias_candidates(&func, &forest, lp);
        assert_eq!(candidates, vec![MemRef::ConstantBase(addr)]);

        let oracle = ConservativeAliasOracle;
        let load_addr = mem_ref_for_address(&func, addr);
        assert!(aliases_any(&oracle, &load_addr, &candidates));
    }
}
