//! Intermediate representation: a sea-of-nodes graph.
//!
//! A [`Function`] owns the graph's nodes, blocks, and End node, mirroring
//! the way `cranelift-codegen/src/ir/function.rs`'s `Function` owns its
//! `DataFlowGraph` and layout -- except this IR has no linear instruction
//! layout to maintain, since control and data are both represented as
//! graph nodes (spec.md §3).

pub mod blocks;
pub mod dfg;
pub mod entities;
pub mod opcode;
pub mod relation;
pub mod types;

pub use blocks::{BlockData, BlockMap};
pub use dfg::DataFlowGraph;
pub use entities::{Block, Loop, Node};
pub use opcode::Opcode;
pub use relation::Relation;
pub use types::Type;

/// A complete function graph: its node/block storage plus the distinguished
/// `End` node that anchors the keep-alive set.
#[derive(Clone, Debug)]
pub struct Function {
    /// The function's nodes and blocks.
    pub dfg: DataFlowGraph,
    /// The graph's `End` node, created with the function.
    pub end: Node,
}

impl Function {
    /// Create a new, empty function with just an `End` node in a single
    /// entry block.
    pub fn new() -> Self {
        let mut dfg = DataFlowGraph::new();
        let entry = dfg.blocks.make_block();
        let end = dfg.make_node(Opcode::End, Type::Control);
        dfg.set_block(end, entry);
        Self { dfg, end }
    }
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_has_an_end_node() {
        let func = Function::new();
        assert_eq!(func.dfg.opcode(func.end), Opcode::End);
        assert!(func.dfg.block(func.end).is_some());
    }
}
