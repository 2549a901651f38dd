//! Graph transformation passes.
//!
//! Mirrors the teacher crate's flat pass-module layout (`dce`, `licm`,
//! `simple_gvn`, ... each a sibling module under the crate root) by
//! grouping this crate's one pass family under `opt::`, the way a larger
//! sibling pass would sit next to it if this crate grew more transforms.

pub mod loop_unrolling;
