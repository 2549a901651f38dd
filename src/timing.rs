//! Cheap per-pass timing scopes.
//!
//! Mirrors the teacher crate's `timing::flowgraph()`-style API: a named
//! pass phase is entered by calling a function that returns a guard; the
//! guard logs elapsed time at `trace` level when dropped. There is no
//! global aggregation table here (the teacher's is driven by a
//! feature-gated thread-local that this crate has no use for at its size).

use std::time::Instant;

/// An RAII guard that logs how long its pass phase took when dropped.
pub struct PassTimer {
    name: &'static str,
    start: Instant,
}

impl Drop for PassTimer {
    fn drop(&mut self) {
        log::trace!("{} took {:?}", self.name, self.start.elapsed());
    }
}

fn start(name: &'static str) -> PassTimer {
    PassTimer {
        name,
        start: Instant::now(),
    }
}

/// Time the header & exit discovery phase.
pub fn header_discovery() -> PassTimer {
    start("header_discovery")
}

/// Time the induction-variable analysis phase.
pub fn induction_analysis() -> PassTimer {
    start("induction_analysis")
}

/// Time the factor selection phase.
pub fn factor_selection() -> PassTimer {
    start("factor_selection")
}

/// Time the body duplication phase.
pub fn body_duplication() -> PassTimer {
    start("body_duplication")
}

/// Time the excess-header elimination phase.
pub fn excess_header_elimination() -> PassTimer {
    start("excess_header_elimination")
}

/// Time the bound rewriting phase.
pub fn bound_rewriting() -> PassTimer {
    start("bound_rewriting")
}

/// Time the Duff switch synthesis phase.
pub fn duff_synthesis() -> PassTimer {
    start("duff_synthesis")
}
