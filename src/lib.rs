//! A compiler middle-end library built around a sea-of-nodes
//! intermediate representation, centered on one transformation: loop
//! unrolling driven by linear induction-variable analysis, with a
//! Duff's-device fixup for trip counts that don't divide evenly.
//!
//! The entry point is [`opt::loop_unrolling::unroll_loops`]; everything
//! else in this crate (`ir`, `flowgraph`, `dominator_tree`,
//! `loop_analysis`, `alias`) is the minimal graph machinery that pass
//! needs, not a general-purpose compiler back end (see the crate's
//! `DESIGN.md` for what was deliberately left out).

#![deny(missing_docs, trivial_numeric_casts)]
#![warn(unused_import_braces)]
#![cfg_attr(feature = "std", deny(unstable_features))]

pub mod alias;
pub mod dominator_tree;
pub mod entity;
pub mod flowgraph;
pub mod ir;
pub mod loop_analysis;
pub mod opt;
pub mod result;
pub mod settings;
pub mod timing;
pub mod verifier;

pub use crate::result::{CodegenError, CodegenResult};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
