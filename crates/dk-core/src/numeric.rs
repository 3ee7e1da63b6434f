use crate::CoreError;

/// Floating point type used throughout the runtime.
pub type Real = f64;

/// Tolerance pair used both for float comparison and for judging pivot
/// magnitudes during state selection.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Derive a tolerance pair from a caller-supplied relative tolerance,
    /// keeping the default absolute floor.
    pub fn from_relative(rel: Real) -> Self {
        Self {
            rel,
            ..Self::default()
        }
    }

    /// Threshold below which a pivot candidate counts as zero, scaled by
    /// the largest magnitude in the matrix under decomposition. Never an
    /// exact-zero test.
    pub fn pivot_threshold(&self, max_abs: Real) -> Real {
        self.abs + self.rel * max_abs
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances::default();
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn pivot_threshold_scales_with_matrix() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(tol.pivot_threshold(1.0) < tol.pivot_threshold(1e6));
        // absolute floor survives a zero matrix
        assert!(tol.pivot_threshold(0.0) > 0.0);
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }
}
