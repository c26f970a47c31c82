//! Exp-sinh quadrature over half-infinite intervals

use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;

use super::double_exponential::{self, Node};
use super::{check_ordered, report, Counted, Estimate, Options};
use crate::error::QuadratureError;

/// `x = origin + sign * exp(pi/2 sinh t)`
fn half_line(origin: f64, sign: f64) -> impl Fn(f64) -> Node {
    move |t| {
        let e = (FRAC_PI_2 * t.sinh()).exp();
        let x = origin + sign * e;
        let w = FRAC_PI_2 * t.cosh() * e;
        if !(x.is_finite() && w.is_finite()) || e == 0.0 || x == origin {
            return Node::Stop;
        }
        Node::Point { x, w }
    }
}

/// Integrate `f` over a half-infinite interval by exp-sinh quadrature.
///
/// Exactly one of `a` and `b` must be infinite: `[a, inf)` or `(-inf, b]`.
#[tracing::instrument(level = "debug", skip(f))]
pub fn exp_sinh<F, E>(f: F, a: f64, b: f64, options: &Options) -> Result<Estimate, QuadratureError<E>>
where
    F: FnMut(f64) -> Result<Complex64, E>,
{
    options.validate()?;
    check_ordered(a, b)?;

    let node = match (a.is_finite(), b.is_finite()) {
        (true, false) => half_line(a, 1.0),
        (false, true) => half_line(b, -1.0),
        _ => {
            return Err(QuadratureError::interval(
                a,
                b,
                "exactly one limit must be infinite",
            ))
        }
    };

    let mut f = Counted::new(f);
    let sum = double_exponential::integrate(&mut f, node, options)?;
    let estimate = Estimate {
        value: sum.value,
        error: sum.error,
        l1_norm: sum.l1,
        levels: sum.levels,
        evaluations: f.evaluations(),
    };
    report("exp_sinh", &estimate, options.tolerance);
    Ok(estimate)
}
