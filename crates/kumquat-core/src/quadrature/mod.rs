//! Complex-valued quadrature routines
//!
//! Every routine takes the integrand as `FnMut(f64) -> Result<Complex64, E>`,
//! so a [`CallableAdapter`](crate::CallableAdapter) is passed as
//! `|x| adapter.call(x)` and plain Rust closures work the same way. The
//! first integrand error aborts the routine and comes back unchanged in
//! [`QuadratureError::Integrand`].
//!
//! # Routines
//!
//! - [`gauss_kronrod`]: adaptive Gauss-Kronrod over a finite interval
//! - [`tanh_sinh`]: double-exponential over finite, semi-infinite or infinite intervals
//! - [`sinh_sinh`]: double-exponential over the whole real line
//! - [`exp_sinh`]: double-exponential over a half-infinite interval
//! - [`trapezoidal`]: adaptive trapezoidal rule over a finite interval

mod double_exponential;
mod exp_sinh;
mod gauss_kronrod;
mod legendre;
mod sinh_sinh;
mod tanh_sinh;
mod trapezoidal;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, QuadratureError, Result};

pub use exp_sinh::exp_sinh;
pub use gauss_kronrod::{gauss_kronrod, KronrodRule};
pub use sinh_sinh::sinh_sinh;
pub use tanh_sinh::tanh_sinh;
pub use trapezoidal::trapezoidal;

/// Default relative tolerance, the square root of machine epsilon
pub const DEFAULT_TOLERANCE: f64 = 1.490_116_119_384_765_6e-8;

/// Default number of refinement levels for the adaptive routines
pub const DEFAULT_MAX_LEVELS: usize = 15;

/// Default number of refinement levels for the trapezoidal rule
pub const DEFAULT_TRAPEZOIDAL_LEVELS: usize = 12;

/// Result of an integration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Estimated value of the integral
    pub value: Complex64,
    /// Estimated absolute error
    pub error: f64,
    /// Estimate of the integral of `|f|`
    pub l1_norm: f64,
    /// Refinement levels used
    pub levels: usize,
    /// Number of integrand evaluations
    pub evaluations: usize,
}

impl Estimate {
    /// Whether the error estimate meets `tolerance` relative to the L1 norm
    pub fn converged(&self, tolerance: f64) -> bool {
        self.error <= tolerance * self.l1_norm
    }
}

/// Options shared by all routines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Maximum refinement levels; `0` disables adaptivity
    pub max_levels: usize,
    /// Relative tolerance against the L1 norm of the integrand
    pub tolerance: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Options {
    /// Options with the trapezoidal rule's default level count
    pub fn trapezoidal() -> Self {
        Self {
            max_levels: DEFAULT_TRAPEZOIDAL_LEVELS,
            ..Self::default()
        }
    }

    /// Replace `max_levels` and `tolerance` when given
    pub fn with_overrides(mut self, max_levels: Option<usize>, tolerance: Option<f64>) -> Self {
        if let Some(max_levels) = max_levels {
            self.max_levels = max_levels;
        }
        if let Some(tolerance) = tolerance {
            self.tolerance = tolerance;
        }
        self
    }

    /// Check that the tolerance is usable
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(Error::validation(
                "tolerance",
                format!("must be a finite positive number, got {}", self.tolerance),
            ));
        }
        Ok(())
    }
}

/// Options for [`gauss_kronrod`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussKronrodOptions {
    /// Kronrod rule applied on each subinterval
    pub points: KronrodRule,
    /// Maximum bisection depth; `0` disables adaptivity
    pub max_levels: usize,
    /// Relative tolerance against the L1 norm of the integrand
    pub tolerance: f64,
}

impl Default for GaussKronrodOptions {
    fn default() -> Self {
        Self {
            points: KronrodRule::default(),
            max_levels: DEFAULT_MAX_LEVELS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl GaussKronrodOptions {
    /// The level and tolerance part of these options
    pub fn options(&self) -> Options {
        Options {
            max_levels: self.max_levels,
            tolerance: self.tolerance,
        }
    }

    /// Check that the tolerance is usable
    pub fn validate(&self) -> Result<()> {
        self.options().validate()
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ± {:e} ({} evaluations, {} levels)",
            self.value, self.error, self.evaluations, self.levels
        )
    }
}

/// Integrand wrapper that counts evaluations and rejects non-finite values
pub(crate) struct Counted<F> {
    f: F,
    evaluations: usize,
}

impl<F> Counted<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f, evaluations: 0 }
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub(crate) fn eval<E>(&mut self, x: f64) -> std::result::Result<Complex64, QuadratureError<E>>
    where
        F: FnMut(f64) -> std::result::Result<Complex64, E>,
    {
        self.evaluations += 1;
        let y = (self.f)(x).map_err(QuadratureError::Integrand)?;
        if !(y.re.is_finite() && y.im.is_finite()) {
            return Err(QuadratureError::NonFinite { x });
        }
        Ok(y)
    }
}

/// Reject NaN endpoints and empty or reversed intervals
///
/// Finite limits must also have a representable width `b - a`, which every
/// affine map onto a reference interval relies on.
pub(crate) fn check_ordered<E>(a: f64, b: f64) -> std::result::Result<(), QuadratureError<E>> {
    if a.is_nan() || b.is_nan() {
        return Err(QuadratureError::interval(a, b, "limits must not be NaN"));
    }
    if a >= b {
        return Err(QuadratureError::interval(
            a,
            b,
            "the upper limit must be strictly greater than the lower limit",
        ));
    }
    if a.is_finite() && b.is_finite() && !(b - a).is_finite() {
        return Err(QuadratureError::interval(
            a,
            b,
            "the interval width overflows; split it or use an infinite limit",
        ));
    }
    Ok(())
}

/// Require both ends of the interval to be finite
pub(crate) fn check_finite<E>(a: f64, b: f64) -> std::result::Result<(), QuadratureError<E>> {
    check_ordered(a, b)?;
    if !(a.is_finite() && b.is_finite()) {
        return Err(QuadratureError::interval(a, b, "both limits must be finite"));
    }
    Ok(())
}

pub(crate) fn report(routine: &'static str, estimate: &Estimate, tolerance: f64) {
    if estimate.converged(tolerance) {
        tracing::debug!(
            routine,
            value = %estimate.value,
            error = estimate.error,
            levels = estimate.levels,
            evaluations = estimate.evaluations,
            "integration converged"
        );
    } else {
        tracing::warn!(
            routine,
            value = %estimate.value,
            error = estimate.error,
            l1_norm = estimate.l1_norm,
            tolerance,
            "integration did not reach the requested tolerance"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerance_is_sqrt_epsilon() {
        assert_eq!(DEFAULT_TOLERANCE, f64::EPSILON.sqrt());
    }

    #[test]
    fn test_options_validation() {
        assert!(Options::default().validate().is_ok());
        assert!(Options { tolerance: 0.0, ..Options::default() }.validate().is_err());
        assert!(Options { tolerance: f64::NAN, ..Options::default() }.validate().is_err());
        assert_eq!(Options::trapezoidal().max_levels, 12);
    }

    #[test]
    fn test_overrides() {
        let options = Options::default().with_overrides(Some(3), None);
        assert_eq!(options.max_levels, 3);
        assert_eq!(options.tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_interval_checks() {
        assert!(check_finite::<()>(0.0, 1.0).is_ok());
        assert!(check_finite::<()>(1.0, 1.0).is_err());
        assert!(check_finite::<()>(0.0, f64::INFINITY).is_err());
        assert!(check_ordered::<()>(0.0, f64::INFINITY).is_ok());
        assert!(check_ordered::<()>(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_overflowing_width_is_rejected() {
        assert!(matches!(
            check_ordered::<()>(-f64::MAX, f64::MAX),
            Err(QuadratureError::InvalidInterval { .. })
        ));
        assert!(check_finite::<()>(-f64::MAX, f64::MAX).is_err());
        assert!(check_ordered::<()>(0.0, f64::MAX).is_ok());
        assert!(check_ordered::<()>(-f64::MAX, f64::INFINITY).is_ok());
    }

    #[test]
    fn test_counted_rejects_non_finite() {
        let mut f = Counted::new(|x: f64| Ok::<_, ()>(Complex64::new(1.0 / x, 0.0)));
        assert!(f.eval(2.0).is_ok());
        assert!(matches!(f.eval(0.0), Err(QuadratureError::NonFinite { x }) if x == 0.0));
        assert_eq!(f.evaluations(), 2);
    }
}
