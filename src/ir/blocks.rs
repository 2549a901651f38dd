//! Block storage: control-flow membership and dominance/loop annotations.
//!
//! Grounded on the block-local data the teacher keeps in
//! `cranelift-codegen/src/ir/entities.rs`'s `Ebb`-adjacent structures,
//! narrowed to what the loop-unrolling pass actually consults: a block's
//! predecessor list (also mirrored by [`crate::flowgraph::ControlFlowGraph`],
//! which is the canonical source -- this struct's `preds` exists only as
//! the phi-arity source of truth, per spec.md §3's note that block/phi
//! input order must agree), its immediate dominator, and which loop (if
//! any) it belongs to.

use crate::entity::{PackedOption, PrimaryMap};
use crate::ir::entities::{Block, Loop};
use smallvec::SmallVec;

/// Per-block data.
#[derive(Clone, Debug, Default)]
pub struct BlockData {
    /// Control predecessors, in the order phi/region inputs must agree
    /// with.
    pub preds: SmallVec<[Block; 4]>,
    /// This block's immediate dominator, if computed.
    pub idom: PackedOption<Block>,
    /// The innermost loop this block belongs to, if any.
    pub loop_of: PackedOption<Loop>,
}

/// The set of blocks in a graph, plus their per-block metadata.
#[derive(Clone, Debug, Default)]
pub struct BlockMap {
    blocks: PrimaryMap<Block, BlockData>,
}

impl BlockMap {
    /// Create an empty block map.
    pub fn new() -> Self {
        Self {
            blocks: PrimaryMap::new(),
        }
    }

    /// Allocate a new, empty block.
    pub fn make_block(&mut self) -> Block {
        self.blocks.push(BlockData::default())
    }

    /// Number of blocks allocated.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if no blocks have been allocated.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Borrow a block's data.
    pub fn data(&self, block: Block) -> &BlockData {
        &self.blocks[block]
    }

    /// Mutably borrow a block's data.
    pub fn data_mut(&mut self, block: Block) -> &mut BlockData {
        &mut self.blocks[block]
    }

    /// Record `pred` as a control predecessor of `block`.
    pub fn add_pred(&mut self, block: Block, pred: Block) {
        self.blocks[block].preds.push(pred);
    }

    /// Iterate over all allocated blocks.
    pub fn iter(&self) -> impl Iterator<Item = Block> + '_ {
        self.blocks.keys()
    }

    /// `loop_of` external interface: which loop (if any) owns `block`.
    pub fn loop_of(&self, block: Block) -> Option<Loop> {
        self.blocks[block].loop_of.expand()
    }

    /// Record that `block` belongs to `lp`.
    pub fn set_loop_of(&mut self, block: Block, lp: Option<Loop>) {
        self.blocks[block].loop_of = lp.into();
    }

    /// `idom` external interface: the immediate dominator of `block`.
    pub fn idom(&self, block: Block) -> Option<Block> {
        self.blocks[block].idom.expand()
    }

    /// Record the immediate dominator of `block`.
    pub fn set_idom(&mut self, block: Block, idom: Option<Block>) {
        self.blocks[block].idom = idom.into();
    }
}
