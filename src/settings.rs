//! Pass configuration.
//!
//! Settings are read once, at driver construction time, and threaded
//! through as a plain value from then on -- see Design Note "Global
//! mutable state" in spec.md §9. Nothing in this module re-reads the
//! environment on every call.

use std::env;

/// Default unroll factor used when no `DUFF_FACTOR` environment override
/// is present and the dynamic IV-based factor selection doesn't produce
/// one of its own.
const DEFAULT_DUFF_FACTOR: u32 = 4;

/// Configuration for the loop-unrolling pass.
#[derive(Clone, Debug)]
pub struct UnrollSettings {
    /// Upper bound on the unroll factor, regardless of how factor
    /// selection arrived at a larger candidate.
    pub max_factor: u32,
    /// Upper bound on the duplicated body size (in nodes) before a loop
    /// is rejected with [`crate::result::RejectReason::SizeRejected`].
    pub max_size: u32,
    /// Fallback/default factor used by the Duff's-device fixup path when
    /// no better factor is available. Overridable via the `DUFF_FACTOR`
    /// environment variable, matching the teacher source's
    /// `load_duff_factor`.
    pub duff_factor: u32,
    /// Whether the classical static-trip-count factor path
    /// (`factor::classic_trip_count_factor`) is enabled.
    ///
    /// The libFirm source this pass is grounded on disables this path
    /// unconditionally via an early `return 0;` in `find_suitable_factor`.
    /// Rather than silently reinstating it, this crate exposes the choice
    /// explicitly, defaulting to the observed (disabled) behavior -- see
    /// DESIGN.md, Open Question 1.
    pub classic_path_enabled: bool,
}

impl Default for UnrollSettings {
    fn default() -> Self {
        Self {
            max_factor: 16,
            max_size: 4096,
            duff_factor: DEFAULT_DUFF_FACTOR,
            classic_path_enabled: false,
        }
    }
}

impl UnrollSettings {
    /// Build settings from defaults overlaid with the `DUFF_FACTOR`
    /// environment variable, if present and parseable.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(val) = env::var("DUFF_FACTOR") {
            if let Ok(parsed) = val.parse::<u32>() {
                if parsed > 0 {
                    settings.duff_factor = parsed;
                } else {
                    log::warn!("DUFF_FACTOR must be nonzero, ignoring {:?}", val);
                }
            } else {
                log::warn!("DUFF_FACTOR is not a valid u32, ignoring {:?}", val);
            }
        }
        settings
    }
}
