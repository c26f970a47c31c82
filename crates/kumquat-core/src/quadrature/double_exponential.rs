//! Shared engine for the double-exponential (tanh-sinh family) routines
//!
//! A transform maps the real line of the parameter `t` onto the integration
//! interval so that the transformed integrand decays double-exponentially.
//! The engine sums it with the trapezoidal rule at step `h = 1`, trims the
//! tails once terms become negligible, then halves `h` level by level,
//! adding only the new odd-index points each time.

use num_complex::Complex64;

use super::{Counted, Options};
use crate::error::QuadratureError;

/// Beyond this `|t|` every transform has left the representable range
const T_LIMIT: f64 = 8.0;

/// What a transform yields at a parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Node {
    /// Evaluate the integrand at `x` with weight `w`
    Point { x: f64, w: f64 },
    /// The transform has run out of range in this direction
    Stop,
}

/// Raw output of the engine
#[derive(Debug, Clone, Copy)]
pub(crate) struct Sum {
    pub value: Complex64,
    pub error: f64,
    pub l1: f64,
    pub levels: usize,
}

/// Weighted value and its magnitude at `t`, `None` once the transform stops
fn term<F, E>(
    f: &mut Counted<F>,
    node: &impl Fn(f64) -> Node,
    t: f64,
) -> Result<Option<(Complex64, f64)>, QuadratureError<E>>
where
    F: FnMut(f64) -> Result<Complex64, E>,
{
    Ok(match node(t) {
        Node::Point { x, w } => {
            let y = f.eval(x)?;
            Some((w * y, w * y.norm()))
        }
        Node::Stop => None,
    })
}

pub(crate) fn integrate<F, E>(
    f: &mut Counted<F>,
    node: impl Fn(f64) -> Node,
    options: &Options,
) -> Result<Sum, QuadratureError<E>>
where
    F: FnMut(f64) -> Result<Complex64, E>,
{
    let mut sum = Complex64::new(0.0, 0.0);
    let mut sum_abs = 0.0;
    // Terms at even t, i.e. the same rule with h = 2
    let mut coarse = Complex64::new(0.0, 0.0);

    if let Some((v, a)) = term(f, &node, 0.0)? {
        sum += v;
        sum_abs += a;
        coarse += v;
    }

    // Per direction: the |t| at which level 0 stopped
    let mut limits = [T_LIMIT; 2];
    for (limit, sign) in limits.iter_mut().zip([1.0, -1.0]) {
        let mut k = 1usize;
        loop {
            let t = k as f64;
            if t > T_LIMIT {
                break;
            }
            let Some((v, a)) = term(f, &node, sign * t)? else {
                *limit = t;
                break;
            };
            sum += v;
            sum_abs += a;
            if k % 2 == 0 {
                coarse += v;
            }
            if k >= 2 && a <= f64::EPSILON * sum_abs {
                *limit = t;
                break;
            }
            k += 1;
        }
    }

    let mut h = 1.0;
    let mut value = sum;
    let mut error = (sum - 2.0 * coarse).norm();
    let mut l1 = sum_abs;
    let mut level = 0;
    tracing::trace!(level, value = %value, error, "double-exponential level");

    while level < options.max_levels && error > options.tolerance * l1 {
        level += 1;
        h *= 0.5;
        for (&limit, sign) in limits.iter().zip([1.0, -1.0]) {
            let mut j = 1usize;
            loop {
                let t = j as f64 * h;
                if t >= limit {
                    break;
                }
                let Some((v, a)) = term(f, &node, sign * t)? else {
                    break;
                };
                sum += v;
                sum_abs += a;
                j += 2;
            }
        }

        let refined = h * sum;
        error = (refined - value).norm();
        value = refined;
        l1 = h * sum_abs;
        tracing::trace!(level, value = %value, error, "double-exponential level");
    }

    Ok(Sum {
        value,
        error,
        l1,
        levels: level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_engine_with_tanh_sinh_transform() {
        // Plain tanh-sinh on [-1, 1] for f = 1
        let node = |t: f64| {
            let u = FRAC_PI_2 * t.sinh();
            let x = u.tanh();
            let w = FRAC_PI_2 * t.cosh() / (u.cosh() * u.cosh());
            if w == 0.0 || x.abs() >= 1.0 {
                Node::Stop
            } else {
                Node::Point { x, w }
            }
        };
        let mut f = Counted::new(|_x: f64| Ok::<_, Infallible>(Complex64::new(1.0, 0.0)));
        let sum = integrate(&mut f, node, &Options::default()).unwrap();
        assert!((sum.value.re - 2.0).abs() < 1e-12);
        assert!(sum.levels >= 1);
        assert!(sum.levels <= Options::default().max_levels);
    }

    #[test]
    fn test_zero_levels_uses_unit_step_only() {
        let node = |t: f64| Node::Point {
            x: t,
            w: (-t * t).exp(),
        };
        let mut f = Counted::new(|_x: f64| Ok::<_, Infallible>(Complex64::new(1.0, 0.0)));
        let options = Options {
            max_levels: 0,
            ..Options::default()
        };
        let sum = integrate(&mut f, node, &options).unwrap();
        assert_eq!(sum.levels, 0);
        assert!(f.evaluations() <= 17);
    }

    #[test]
    fn test_stop_ends_one_direction_only() {
        let node = |t: f64| {
            if t > 3.0 {
                Node::Stop
            } else {
                Node::Point { x: t, w: 1.0 }
            }
        };
        let mut f = Counted::new(|_x: f64| Ok::<_, Infallible>(Complex64::new(1.0, 0.0)));
        let options = Options {
            max_levels: 0,
            ..Options::default()
        };
        let sum = integrate(&mut f, node, &options).unwrap();
        // t = 0..=3 forwards, t = -1..=-8 backwards
        assert_eq!(sum.value.re, 12.0);
        assert_eq!(f.evaluations(), 12);
    }
}
