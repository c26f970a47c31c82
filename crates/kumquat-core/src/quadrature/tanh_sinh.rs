//! Tanh-sinh quadrature

use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;

use super::double_exponential::{self, Node};
use super::{check_ordered, report, Counted, Estimate, Options};
use crate::error::QuadratureError;

/// The tanh-sinh map on `(-1, 1)` at `t`
///
/// Returns `1 - |y|`, computed without cancellation, and the weight
/// `dy/dt`. The sign of `y` is the sign of `t`.
fn unit(t: f64) -> Option<(f64, f64)> {
    let u = FRAC_PI_2 * t.sinh();
    let complement = 2.0 / (1.0 + (2.0 * u.abs()).exp());
    let weight = FRAC_PI_2 * t.cosh() * complement * (2.0 - complement);
    if complement == 0.0 || weight == 0.0 || !weight.is_finite() {
        return None;
    }
    Some((complement, weight))
}

fn finite(a: f64, b: f64) -> impl Fn(f64) -> Node {
    let half = 0.5 * (b - a);
    move |t| {
        let Some((complement, weight)) = unit(t) else {
            return Node::Stop;
        };
        let offset = half * complement;
        let x = if t >= 0.0 { b - offset } else { a + offset };
        if x <= a || x >= b {
            return Node::Stop;
        }
        Node::Point {
            x,
            w: half * weight,
        }
    }
}

/// `[a, inf)` through `x = a + s / (1 - s)` when `sign` is 1, and
/// `(-inf, a]` through `x = a - s / (1 - s)` when it is -1
fn half_line(a: f64, sign: f64) -> impl Fn(f64) -> Node {
    move |t| {
        let Some((complement, weight)) = unit(t) else {
            return Node::Stop;
        };
        // s = (1 + y) / 2 on (0, 1)
        let (s, one_minus_s) = if t >= 0.0 {
            (1.0 - 0.5 * complement, 0.5 * complement)
        } else {
            (0.5 * complement, 1.0 - 0.5 * complement)
        };
        let x = a + sign * s / one_minus_s;
        let w = 0.5 * weight / (one_minus_s * one_minus_s);
        if !(x.is_finite() && w.is_finite()) || x == a {
            return Node::Stop;
        }
        Node::Point { x, w }
    }
}

/// `(-inf, inf)` through `x = y / (1 - y^2)`
fn whole_line(t: f64) -> Node {
    let Some((complement, weight)) = unit(t) else {
        return Node::Stop;
    };
    let y = (1.0 - complement).copysign(t);
    let one_minus_y2 = complement * (2.0 - complement);
    let x = y / one_minus_y2;
    let w = weight * (1.0 + y * y) / (one_minus_y2 * one_minus_y2);
    if !(x.is_finite() && w.is_finite()) {
        return Node::Stop;
    }
    Node::Point { x, w }
}

/// Integrate `f` over `[a, b]` by tanh-sinh quadrature.
///
/// Either limit may be infinite; half-infinite and infinite intervals are
/// mapped onto a finite one first. Endpoint singularities are handled well
/// since the integrand is never evaluated at the limits themselves.
#[tracing::instrument(level = "debug", skip(f))]
pub fn tanh_sinh<F, E>(f: F, a: f64, b: f64, options: &Options) -> Result<Estimate, QuadratureError<E>>
where
    F: FnMut(f64) -> Result<Complex64, E>,
{
    options.validate()?;
    check_ordered(a, b)?;

    let mut f = Counted::new(f);
    let sum = match (a.is_finite(), b.is_finite()) {
        (true, true) => double_exponential::integrate(&mut f, finite(a, b), options)?,
        (true, false) => double_exponential::integrate(&mut f, half_line(a, 1.0), options)?,
        (false, true) => double_exponential::integrate(&mut f, half_line(b, -1.0), options)?,
        (false, false) => double_exponential::integrate(&mut f, whole_line, options)?,
    };

    let estimate = Estimate {
        value: sum.value,
        error: sum.error,
        l1_norm: sum.l1,
        levels: sum.levels,
        evaluations: f.evaluations(),
    };
    report("tanh_sinh", &estimate, options.tolerance);
    Ok(estimate)
}
