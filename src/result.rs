//! Error types returned by the public API.
//!
//! This mirrors the teacher crate's split between a small `Fail`-derived
//! error for caller-facing failures and a separate, lighter enum for the
//! pass-internal rejection taxonomy (see [`crate::ir::opcode`] users and
//! [`RejectReason`] below), rather than funneling everything through one
//! god-enum.

use failure_derive::Fail;

/// An error produced by a public entry point of this crate.
///
/// Unlike [`RejectReason`], which is an expected, frequent outcome of
/// analyzing a loop that doesn't fit this pass's shape, `CodegenError`
/// is for malformed input that should not occur in a well-formed graph
/// (e.g. a `Loop` reference from a stale `LoopForest`).
#[derive(Fail, Debug)]
pub enum CodegenError {
    /// An entity reference did not originate from the graph it was used
    /// against.
    #[fail(display = "entity reference does not belong to this graph")]
    InvalidEntityReference,

    /// A verifier invariant was violated after a transformation ran.
    #[fail(display = "invariant violated: {}", 0)]
    InvariantViolation(String),
}

/// Result alias for fallible public entry points.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Why a loop was rejected for unrolling.
///
/// This is not an error: loops that don't match the shape this pass
/// handles are extremely common, and rejecting them is the expected,
/// silent (besides a debug log) outcome described in spec.md §7. Keeping
/// it as a plain enum instead of `CodegenError` keeps that distinction
/// visible in the type signatures of the analysis functions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RejectReason {
    /// The loop's control structure doesn't match a single-header,
    /// single-backedge natural loop (e.g. multiple exits, irreducible
    /// control flow).
    ShapeRejected,
    /// The loop is too large to duplicate under the configured size
    /// budget, or the computed unroll factor would produce a body larger
    /// than that budget.
    SizeRejected,
    /// The loop's trip count (static or dynamic) could not be bounded,
    /// or the requested factor doesn't divide cleanly under the chosen
    /// strategy.
    CountRejected,
    /// The induction variable's step, base, or comparison doesn't match
    /// a recognized linear-induction mode (e.g. non-constant step,
    /// non-monotonic comparison).
    ModeRejected,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            RejectReason::ShapeRejected => "shape rejected",
            RejectReason::SizeRejected => "size rejected",
            RejectReason::CountRejected => "count rejected",
            RejectReason::ModeRejected => "mode rejected",
        };
        f.write_str(s)
    }
}
