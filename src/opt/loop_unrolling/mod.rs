//! Loop-unrolling transformation.
//!
//! See the module docs on [`header`], [`induction`], [`factor`],
//! [`duplicate`], [`excess_header`], [`bound`], [`duff`], and [`driver`]
//! for the component breakdown; `driver::unroll_loops` is the pass's
//! single public entry point.

pub mod bound;
pub mod duff;
pub mod duplicate;
pub mod excess_header;
pub mod factor;
pub mod header;
pub mod induction;
pub mod driver;

pub use driver::{unroll_loops, UnrollStats};
