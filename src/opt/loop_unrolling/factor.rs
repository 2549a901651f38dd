//! Factor selection (spec.md §4.3).
//!
//! Grounded on `find_suitable_factor`, `determine_unroll_factor`, and
//! `load_duff_factor` in `original_source/ir/opt/loop_unrolling.c`. Two
//! independent strategies feed the chosen factor:
//!
//! - the classical path (`classic_trip_count_factor`): when both the base
//!   and the bound are compile-time constants, pick the largest factor
//!   (up to `max_factor`) that evenly divides the known trip count, so no
//!   Duff's-device fixup is needed at all.
//! - the environment-driven fallback (`settings.duff_factor`): used
//!   whenever the classical path is disabled or inapplicable, always
//!   paired with the Duff synthesizer to cover the remainder.
//!
//! The original source's `find_suitable_factor` contains an unconditional
//! early `return 0;` ahead of its classical-path body, permanently
//! disabling it; this crate keeps that body fully implemented but gates
//! it behind `UnrollSettings::classic_path_enabled` (DESIGN.md, Open
//! Question 1) instead of silently reinstating it.

use crate::opt::loop_unrolling::induction::LinearInductionVariable;
use crate::result::RejectReason;
use crate::settings::UnrollSettings;

/// The chosen unroll factor, and whether the loop divides evenly into it
/// (in which case no Duff's-device fixup is required).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FactorChoice {
    /// How many copies of the loop body to generate per iteration of the
    /// unrolled loop.
    pub factor: u32,
    /// `true` if the factor is known to evenly divide the trip count, so
    /// the fixup loop built by [`crate::opt::loop_unrolling::duff`] is
    /// unnecessary.
    pub exact: bool,
}

/// Choose an unroll factor for a loop with induction variable `iv` and
/// body size `body_size` (in nodes).
pub fn select(
    settings: &UnrollSettings,
    func: &crate::ir::Function,
    iv: &LinearInductionVariable,
    body_size: u32,
) -> Result<FactorChoice, RejectReason> {
    if settings.classic_path_enabled {
        if let Some(factor) = classic_trip_count_factor(func, iv, settings.max_factor) {
            check_size(settings, body_size, factor)?;
            return Ok(FactorChoice {
                factor,
                exact: true,
            });
        }
    }

    let factor = settings.duff_factor.min(settings.max_factor).max(1);
    check_size(settings, body_size, factor)?;
    Ok(FactorChoice {
        factor,
        exact: false,
    })
}

fn check_size(settings: &UnrollSettings, body_size: u32, factor: u32) -> Result<(), RejectReason> {
    if body_size.saturating_mul(factor) > settings.max_size {
        log::debug!(
            "unrolling by {} would grow body to {} nodes, exceeding budget {}",
            factor,
            body_size.saturating_mul(factor),
            settings.max_size
        );
        return Err(RejectReason::SizeRejected);
    }
    Ok(())
}

/// When the induction variable's base and bound are both known constants,
/// compute the exact iteration count and pick the largest power-of-two
/// divisor of it that doesn't exceed `max_factor`. Returns `None` if
/// either endpoint isn't a compile-time constant (mirroring the original
/// source's fallback to the dynamic path whenever the trip count can't be
/// computed statically), if the step is zero, or if the induction
/// variable never actually terminates in the direction implied by its
/// relation.
fn classic_trip_count_factor(
    func: &crate::ir::Function,
    iv: &LinearInductionVariable,
    max_factor: u32,
) -> Option<u32> {
    use crate::ir::Relation;

    let base = const_value(func, iv.base)?;
    let bound = const_value(func, iv.bound)?;
    if iv.step_const == 0 || !matches!(iv.step_op, crate::ir::Opcode::Add | crate::ir::Opcode::Sub) {
        return None;
    }

    let ascending = iv.relation.is_ascending();
    let strict = matches!(iv.relation, Relation::Less | Relation::Greater);

    // Normalize: fold the strict-inequality "subtract one" correction into
    // the bound, then measure distance in the direction the variable
    // actually moves.
    let adjusted_bound = match (ascending, strict) {
        (true, true) => bound - 1,
        (false, true) => bound + 1,
        _ => bound,
    };
    let distance = if ascending {
        adjusted_bound - base
    } else {
        base - adjusted_bound
    };

    let abs_step = iv.step_const.abs();
    if distance < 0 {
        return None;
    }
    let iterations = distance / abs_step + 1;
    if iterations <= 0 {
        return None;
    }
    let iterations = iterations as u32;

    (1..=max_factor.min(iterations))
        .rev()
        .filter(|f| f.is_power_of_two())
        .find(|&f| iterations % f == 0)
}

fn const_value(func: &crate::ir::Function, n: crate::ir::Node) -> Option<i64> {
    match func.dfg.opcode(n) {
        crate::ir::Opcode::Const(c) => Some(c),
        _ => None,
    }
}
