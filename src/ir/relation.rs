//! Comparison relations, as used by `Cmp` nodes and the bound rewriter.
//!
//! Named and shaped directly after `ir_relation` in
//! `original_source/ir/opt/loop_unrolling.c`, which distinguishes strict
//! from non-strict relations when computing the Duff residue (a `+1`
//! correction applies for `<=`/`>=`; see [`crate::opt::loop_unrolling::duff`]).

/// A comparison relation between two linear-induction values.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Relation {
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

impl Relation {
    /// Returns `true` for `<=`/`>=`, which need the `+1` residue
    /// correction described in spec.md §4.7 and mirrored from
    /// `update_header_condition` in the original source.
    pub fn is_non_strict(self) -> bool {
        matches!(self, Relation::LessEqual | Relation::GreaterEqual)
    }

    /// Returns `true` if this relation is monotonically increasing in its
    /// left operand (`<`, `<=`), i.e. compatible with a positive step.
    pub fn is_ascending(self) -> bool {
        matches!(self, Relation::Less | Relation::LessEqual)
    }

    /// Returns `true` if this relation is monotonically decreasing in its
    /// left operand (`>`, `>=`), i.e. compatible with a negative step.
    pub fn is_descending(self) -> bool {
        matches!(self, Relation::Greater | Relation::GreaterEqual)
    }

    /// The relation with its operands swapped (`a R b` <=> `b R.swapped() a`).
    pub fn swapped(self) -> Relation {
        match self {
            Relation::Less => Relation::Greater,
            Relation::LessEqual => Relation::GreaterEqual,
            Relation::Greater => Relation::Less,
            Relation::GreaterEqual => Relation::LessEqual,
            Relation::Equal => Relation::Equal,
            Relation::NotEqual => Relation::NotEqual,
        }
    }
}
