//! Sinh-sinh quadrature over the whole real line

use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;

use super::double_exponential::{self, Node};
use super::{report, Counted, Estimate, Options};
use crate::error::QuadratureError;

fn node(t: f64) -> Node {
    let u = FRAC_PI_2 * t.sinh();
    let x = u.sinh();
    let w = FRAC_PI_2 * t.cosh() * u.cosh();
    if !(x.is_finite() && w.is_finite()) {
        return Node::Stop;
    }
    Node::Point { x, w }
}

/// Integrate `f` over `(-inf, inf)` by sinh-sinh quadrature.
///
/// The integrand must decay at both ends; slowly decaying integrands are
/// truncated where the transformed terms leave the floating-point range.
#[tracing::instrument(level = "debug", skip(f))]
pub fn sinh_sinh<F, E>(f: F, options: &Options) -> Result<Estimate, QuadratureError<E>>
where
    F: FnMut(f64) -> Result<Complex64, E>,
{
    options.validate()?;

    let mut f = Counted::new(f);
    let sum = double_exponential::integrate(&mut f, node, options)?;
    let estimate = Estimate {
        value: sum.value,
        error: sum.error,
        l1_norm: sum.l1,
        levels: sum.levels,
        evaluations: f.evaluations(),
    };
    report("sinh_sinh", &estimate, options.tolerance);
    Ok(estimate)
}
