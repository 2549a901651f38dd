//! References to the entities that make up the graph.
//!
//! These are opaque, densely-numbered indices (see [`crate::entity`]), not
//! smart pointers: all of a graph's actual data lives in the
//! [`crate::ir::DataFlowGraph`] and [`crate::ir::BlockData`] tables, keyed
//! by these references. Generalizes the teacher's `Ebb`/`Value`/`Inst`
//! split in `cranelift-codegen/src/ir/entities.rs` to this crate's node
//! graph, where data and control live in one node kind rather than two.

use crate::entity::entity_impl;

/// A reference to a single node in the graph: an instruction, a phi, a
/// constant, a region, or a projection. See spec.md §3's Node row.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node(u32);
entity_impl!(Node);

/// A reference to a basic block: a maximal run of nodes sharing one
/// control-flow membership. See spec.md §3's Block row.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block);

/// A reference to a natural loop in the loop forest. See spec.md §3's
/// Loop row.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Loop(u32);
entity_impl!(Loop);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn entities_are_distinguishable_by_index() {
        let a = Node::new(0);
        let b = Node::new(1);
        assert_ne!(a, b);
        assert_eq!(a.index(), 0);
    }
}
