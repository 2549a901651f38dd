//! Node storage and the graph-mutation primitives the pass is built from.
//!
//! This is the concrete implementation of the "external interfaces" spec.md
//! §6 treats as a black box: `arity`/`input`/`outs`/`block`/`mode`/`opcode`,
//! the `is_*` predicates, `duplicate`, the input-list editors
//! (`set_input`/`add_input`/`remove_input`/`exchange`), `set_block`, the
//! keep-alive set editors, and the per-node link slot used as duplication
//! scratch. Grounded on the ownership shape of
//! `cranelift-codegen/src/ir/function.rs` (a `DataFlowGraph` owning node
//! storage, consulted by every pass rather than passed around piecemeal).

use crate::entity::{PackedOption, PrimaryMap, SecondaryMap};
use crate::ir::blocks::BlockMap;
use crate::ir::entities::{Block, Node};
use crate::ir::opcode::Opcode;
use crate::ir::types::Type;
use smallvec::SmallVec;
use std::collections::HashSet;

/// Per-node data: everything spec.md §3's Node row asks for.
#[derive(Clone, Debug)]
struct NodeData {
    opcode: Opcode,
    ty: Type,
    inputs: SmallVec<[Node; 4]>,
    block: PackedOption<Block>,
}

/// A graph's nodes, blocks, and keep-alive set, plus the scratch "link"
/// slot used by the body duplicator (spec.md §3's Link-slot pattern and
/// §6's `link_slot`/`reserve_links`/`release_links`/`clear_links`).
#[derive(Clone, Debug, Default)]
pub struct DataFlowGraph {
    nodes: PrimaryMap<Node, NodeData>,
    /// `blocks` lives alongside nodes rather than in a separate top-level
    /// field so that `block()`/`set_block()` have one obvious owner.
    pub blocks: BlockMap,
    keep_alive: HashSet<Node>,
    /// `None` until `reserve_links` is called; `Some` for the duration of
    /// a single duplication pass. Modeled as an `Option` around the
    /// `SecondaryMap` (rather than always-present) so that stale reads
    /// from a previous pass can never leak into the next one -- every
    /// user must `reserve_links` before use and `release_links` after,
    /// matching the reserve/release discipline spec.md §6 calls for.
    links: Option<SecondaryMap<Node, PackedOption<Node>>>,
}

impl DataFlowGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new node with no inputs, not yet assigned to a block.
    pub fn make_node(&mut self, opcode: Opcode, ty: Type) -> Node {
        self.nodes.push(NodeData {
            opcode,
            ty,
            inputs: SmallVec::new(),
            block: PackedOption::default(),
        })
    }

    /// Allocate a new node with the given inputs.
    pub fn make_node_with_inputs(
        &mut self,
        opcode: Opcode,
        ty: Type,
        inputs: impl IntoIterator<Item = Node>,
    ) -> Node {
        let n = self.make_node(opcode, ty);
        self.nodes[n].inputs = inputs.into_iter().collect();
        n
    }

    // -- spec.md §6 external interface -------------------------------

    /// `opcode`: which operation this node performs.
    pub fn opcode(&self, n: Node) -> Opcode {
        self.nodes[n].opcode
    }

    /// `mode`: the data mode (type) this node produces.
    pub fn mode(&self, n: Node) -> Type {
        self.nodes[n].ty
    }

    /// `arity`: number of inputs.
    pub fn arity(&self, n: Node) -> usize {
        self.nodes[n].inputs.len()
    }

    /// `input`: the `i`-th input of `n`.
    pub fn input(&self, n: Node, i: usize) -> Node {
        self.nodes[n].inputs[i]
    }

    /// All inputs of `n`, in order.
    pub fn inputs(&self, n: Node) -> &[Node] {
        &self.nodes[n].inputs
    }

    /// `outs`: every node that has `n` as one of its inputs.
    ///
    /// This graph doesn't maintain an incremental use-list (duplication
    /// would have to keep it consistent through every rewrite, which the
    /// teacher's own IR avoids by not tracking def-use at all); instead
    /// this scans the node table, matching the "compute what you need,
    /// don't cache what you don't" posture of `flowgraph::ControlFlowGraph`
    /// itself (it too is recomputed, not maintained, per spec.md §6).
    pub fn outs(&self, n: Node) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|(_, data)| data.inputs.contains(&n))
            .map(|(k, _)| k)
            .collect()
    }

    /// `block`: which block `n` belongs to, if assigned.
    pub fn block(&self, n: Node) -> Option<Block> {
        self.nodes[n].block.expand()
    }

    /// `set_block`: assign `n` to `block`.
    pub fn set_block(&mut self, n: Node, block: Block) {
        self.nodes[n].block = block.into();
    }

    /// `is_phi`.
    pub fn is_phi(&self, n: Node) -> bool {
        self.opcode(n) == Opcode::Phi
    }

    /// `is_const`.
    pub fn is_const(&self, n: Node) -> bool {
        matches!(self.opcode(n), Opcode::Const(_))
    }

    /// `is_bad`.
    pub fn is_bad(&self, n: Node) -> bool {
        self.opcode(n) == Opcode::Bad
    }

    /// `is_control`.
    pub fn is_control(&self, n: Node) -> bool {
        self.opcode(n).is_control()
    }

    /// `set_input`: rewrite the `i`-th input of `n` in place.
    pub fn set_input(&mut self, n: Node, i: usize, new_input: Node) {
        self.nodes[n].inputs[i] = new_input;
    }

    /// `add_input`: append a new input (used when growing a phi/region
    /// for a newly-added control predecessor).
    pub fn add_input(&mut self, n: Node, input: Node) {
        self.nodes[n].inputs.push(input);
    }

    /// `remove_input`: delete the `i`-th input, shifting later inputs down.
    ///
    /// Callers updating a phi must remove the matching block predecessor
    /// at the same index to keep the two lists in lockstep -- see
    /// [`crate::ir::blocks::BlockMap`] and spec.md §3's arity-alignment
    /// invariant.
    pub fn remove_input(&mut self, n: Node, i: usize) {
        self.nodes[n].inputs.remove(i);
    }

    /// `exchange`: replace every use of `old` with `new` across the whole
    /// graph. Grounded on the bulk-rewrite helper the original source's
    /// `rewire_*` family performs by hand per use; this folds that pattern
    /// into one graph-wide operation.
    pub fn exchange(&mut self, old: Node, new: Node) {
        for (_, data) in self.nodes.iter_mut() {
            for input in data.inputs.iter_mut() {
                if *input == old {
                    *input = new;
                }
            }
        }
    }

    /// `duplicate`: create a shallow copy of `n` (same opcode, mode, and
    /// inputs; inputs are expected to be rewired by the caller afterward
    /// via [`DataFlowGraph::set_input`], matching the original source's
    /// duplicate-then-rewire two-step).
    pub fn duplicate(&mut self, n: Node) -> Node {
        let data = self.nodes[n].clone();
        let clone = self.nodes.push(data);
        if let Some(block) = self.block(n) {
            self.set_block(clone, block);
        }
        clone
    }

    // -- keep-alive set ------------------------------------------------

    /// `add_keepalive`: anchor `n` on the graph's End node so it survives
    /// even with no other uses.
    pub fn add_keepalive(&mut self, n: Node) {
        self.keep_alive.insert(n);
    }

    /// `remove_keepalive`: drop `n` from the keep-alive set.
    pub fn remove_keepalive(&mut self, n: Node) {
        self.keep_alive.remove(&n);
    }

    /// The current keep-alive set, for verification (spec.md §8).
    pub fn keep_alive_set(&self) -> &HashSet<Node> {
        &self.keep_alive
    }

    // -- link slot -------------------------------------------------------

    /// `reserve_links`: start a duplication pass's original->clone scratch
    /// table. Panics if a previous reservation was never released --
    /// nesting two duplication passes is a pass-ordering bug, not a
    /// recoverable condition (spec.md §7).
    pub fn reserve_links(&mut self) {
        assert!(self.links.is_none(), "link slots already reserved");
        self.links = Some(SecondaryMap::new());
    }

    /// `link_slot` getter: the clone currently recorded for `n`, if any.
    pub fn link(&self, n: Node) -> Option<Node> {
        self.links
            .as_ref()
            .expect("link slots not reserved")
            .get(n)
            .expand()
    }

    /// `link_slot` setter: record `clone` as the duplicate of `n`.
    pub fn set_link(&mut self, n: Node, clone: Node) {
        self.links
            .as_mut()
            .expect("link slots not reserved")
            .set(n, clone.into());
    }

    /// `clear_links`: forget all recorded original->clone mappings without
    /// releasing the reservation (used between successive unroll
    /// iterations within one `duplicate` phase).
    pub fn clear_links(&mut self) {
        self.links
            .as_mut()
            .expect("link slots not reserved")
            .clear();
    }

    /// `release_links`: end the duplication pass's scratch table.
    pub fn release_links(&mut self) {
        assert!(self.links.is_some(), "link slots not reserved");
        self.links = None;
    }

    /// Total number of nodes allocated, for size-budget checks
    /// ([`crate::result::RejectReason::SizeRejected`]).
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over every node reference allocated so far, in allocation
    /// order.
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys()
    }

    /// Every node assigned to `block`, in allocation order.
    pub fn nodes_in_block(&self, block: Block) -> Vec<Node> {
        self.nodes()
            .filter(|&n| self.block(n) == Some(block))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_copies_opcode_and_inputs() {
        let mut dfg = DataFlowGraph::new();
        let a = dfg.make_node(Opcode::Const(1), Type::I32);
        let b = dfg.make_node_with_inputs(Opcode::Add, Type::I32, [a, a]);
        let clone = dfg.duplicate(b);
        assert_eq!(dfg.opcode(clone), Opcode::Add);
        assert_eq!(dfg.arity(clone), 2);
        assert_eq!(dfg.input(clone, 0), a);
    }

    #[test]
    fn exchange_rewrites_every_use() {
        let mut dfg = DataFlowGraph::new();
        let a = dfg.make_node(Opcode::Const(1), Type::I32);
        let b = dfg.make_node(Opcode::Const(2), Type::I32);
        let sum1 = dfg.make_node_with_inputs(Opcode::Add, Type::I32, [a, a]);
        let sum2 = dfg.make_node_with_inputs(Opcode::Add, Type::I32, [a, b]);
        dfg.exchange(a, b);
        assert_eq!(dfg.input(sum1, 0), b);
        assert_eq!(dfg.input(sum1, 1), b);
        assert_eq!(dfg.input(sum2, 0), b);
    }

    #[test]
    fn link_slots_round_trip_and_require_reservation() {
        let mut dfg = DataFlowGraph::new();
        let a = dfg.make_node(Opcode::Const(1), Type::I32);
        let b = dfg.make_node(Opcode::Const(2), Type::I32);
        dfg.reserve_links();
        assert!(dfg.link(a).is_none());
        dfg.set_link(a, b);
        assert_eq!(dfg.link(a), Some(b));
        dfg.clear_links();
        assert!(dfg.link(a).is_none());
        dfg.release_links();
    }

    #[test]
    fn keep_alive_set_tracks_adds_and_removes() {
        let mut dfg = DataFlowGraph::new();
        let a = dfg.make_node(Opcode::Const(1), Type::I32);
        dfg.add_keepalive(a);
        assert!(dfg.keep_alive_set().contains(&a));
        dfg.remove_keepalive(a);
        assert!(!dfg.keep_alive_set().contains(&a));
    }
}
