//! Pass orchestration (spec.md §4.8-4.10).
//!
//! Grounded on `unroll_loop`/`unroll_loops`/`duplicate_innermost_loops` in
//! `original_source/ir/opt/loop_unrolling.c`: recompute the control flow
//! graph, dominator tree, and loop forest once per invocation, then visit
//! every loop innermost-first (an outer loop's body may shrink once its
//! inner loop has already been unrolled, so inner-first avoids redundant
//! work -- the same order `loops_innermost_first` exists to provide).
//! Each loop goes through header discovery, induction analysis, factor
//! selection, duplication, bound rewriting, and (when the factor doesn't
//! evenly divide the trip count) Duff-switch synthesis, finishing with
//! excess-header elimination and an invariant check. A loop that fails
//! any step is left untouched and the reason is logged at `debug`
//! (spec.md §7) -- this pass never panics on a rejected loop, only on an
//! internal bug.
//!
//! The "fallback full-copy fixup" named in spec.md §4.8 is the `exact`
//! branch of [`crate::opt::loop_unrolling::factor::FactorChoice`]: when
//! the classical trip-count path finds a factor that evenly divides the
//! loop, the duplicated copies already cover every iteration and no Duff
//! switch is built at all, which is the simplest possible fixup.

use crate::flowgraph::ControlFlowGraph;
use crate::ir::Function;
use crate::loop_analysis::LoopForest;
use crate::result::RejectReason;
use crate::settings::UnrollSettings;
use crate::{dominator_tree::DominatorTree, timing};

use super::{bound, duff, duplicate, excess_header, factor, header, induction};
use crate::verifier;

/// Summary of what the driver did, for callers that want to report
/// progress (e.g. a test asserting at least one loop was unrolled).
#[derive(Default, Debug, Clone)]
pub struct UnrollStats {
    /// Number of loops successfully unrolled.
    pub unrolled: u32,
    /// Number of loops considered but rejected, by reason.
    pub rejected: Vec<RejectReason>,
}

/// Run the loop-unrolling pass over every loop in `func`.
pub fn unroll_loops(func: &mut Function, settings: &UnrollSettings) -> UnrollStats {
    let entry = match func.dfg.block(func.end) {
        Some(b) => b,
        None => return UnrollStats::default(),
    };

    let cfg = {
        let _t = timing::header_discovery();
        ControlFlowGraph::with_function(func)
    };
    let domtree = DominatorTree::compute(&cfg, entry);
    let forest = LoopForest::compute(&cfg, &domtree);

    let mut stats = UnrollStats::default();

    for lp in forest.loops_innermost_first() {
        match unroll_one_loop(func, &cfg, &forest, lp, settings) {
            Ok(()) => stats.unrolled += 1,
            Err(reason) => {
                log::debug!("loop rejected for unrolling: {}", reason);
                stats.rejected.push(reason);
            }
        }
    }

    stats
}

fn unroll_one_loop(
    func: &mut Function,
    cfg: &ControlFlowGraph,
    forest: &LoopForest,
    lp: crate::ir::Loop,
    settings: &UnrollSettings,
) -> Result<(), RejectReason> {
    let info = {
        let _t = timing::header_discovery();
        header::discover(func, cfg, forest, lp)?
    };

    let iv = {
        let _t = timing::induction_analysis();
        induction::analyze(func, forest, lp, &info)?
    };

    let body_size = forest
        .elements(lp)
        .iter()
        .map(|e| match e {
            crate::loop_analysis::LoopElement::Block(b) => func.dfg.nodes_in_block(*b).len() as u32,
            crate::loop_analysis::LoopElement::SubLoop(_) => 0,
        })
        .sum();

    let choice = {
        let _t = timing::factor_selection();
        factor::select(settings, func, &iv, body_size)?
    };

    if choice.factor <= 1 {
        log::debug!("selected factor {} does not warrant unrolling", choice.factor);
        return Err(RejectReason::CountRejected);
    }

    let keep_alive_before = func.dfg.keep_alive_set().len();

    let result = {
        let _t = timing::body_duplication();
        duplicate::duplicate_body(func, forest, lp, &info, &iv, choice.factor)
    };

    {
        let _t = timing::bound_rewriting();
        bound::rewrite_bound(func, &iv, choice.factor);
    }

    let duplicated_blocks: Vec<crate::ir::Block> =
        result.generations.iter().flat_map(|g| g.blocks.values().copied()).collect();
    let mut touched_blocks = duplicated_blocks.clone();

    if !choice.exact {
        let _t = timing::duff_synthesis();
        let residue = duff::build_residue(func, info.header, &iv);
        let switch = duff::build_switch(
            func,
            &info,
            &result.generations,
            residue,
            choice.factor,
            iv.step_const,
        );
        touched_blocks.push(switch.entry);
    }

    {
        let _t = timing::excess_header_elimination();
        excess_header::remove_excess_headers(func, &touched_blocks);
    }

    // Single-header is a property of the fused loop body itself; the Duff
    // switch's dispatcher blocks are a preamble outside the loop and are
    // expected to carry their own `If`s, so they're excluded here.
    debug_assert!(
        verifier::verify_single_header(func, info.header, &duplicated_blocks).is_ok(),
        "loop unrolling produced more than one If-controlled header block"
    );
    debug_assert!(
        verifier::verify_keep_alive_delta(
            func,
            keep_alive_before,
            result.keepalive_additions as isize,
        )
        .is_ok(),
        "loop unrolling's keep-alive set delta did not match the duplicator's own accounting"
    );

    Ok(())
}
