//! Adaptive trapezoidal rule

use num_complex::Complex64;

use super::{check_finite, report, Counted, Estimate, Options};
use crate::error::QuadratureError;

/// Halvings always performed before the error estimate is trusted
const MIN_LEVELS: usize = 4;

/// Integrate `f` over the finite interval `[a, b]` with the trapezoidal rule,
/// halving the step until successive estimates agree.
///
/// Very effective for periodic integrands over a full period and for
/// functions that vanish smoothly at both ends. At least one halving is
/// always done so an error estimate exists, even with `max_levels == 0`.
#[tracing::instrument(level = "debug", skip(f))]
pub fn trapezoidal<F, E>(f: F, a: f64, b: f64, options: &Options) -> Result<Estimate, QuadratureError<E>>
where
    F: FnMut(f64) -> Result<Complex64, E>,
{
    options.validate()?;
    check_finite(a, b)?;

    let mut f = Counted::new(f);
    let width = b - a;
    let fa = f.eval(a)?;
    let fb = f.eval(b)?;

    let mut value = 0.5 * width * (fa + fb);
    let mut l1 = 0.5 * width * (fa.norm() + fb.norm());
    let mut error;
    let max_levels = options.max_levels.max(1);
    let mut level = 0;

    loop {
        level += 1;
        let intervals = 1usize << level;
        let h = width / intervals as f64;

        let mut fresh = Complex64::new(0.0, 0.0);
        let mut fresh_abs = 0.0;
        for j in (1..intervals).step_by(2) {
            let y = f.eval(a + j as f64 * h)?;
            fresh += y;
            fresh_abs += y.norm();
        }

        let refined = 0.5 * value + h * fresh;
        error = (refined - value).norm();
        value = refined;
        l1 = 0.5 * l1 + h * fresh_abs;
        tracing::trace!(level, value = %value, error, "trapezoidal level");

        let settled = level >= MIN_LEVELS.min(max_levels) && error <= options.tolerance * l1;
        if level >= max_levels || settled {
            break;
        }
    }

    let estimate = Estimate {
        value,
        error,
        l1_norm: l1,
        levels: level,
        evaluations: f.evaluations(),
    };
    report("trapezoidal", &estimate, options.tolerance);
    Ok(estimate)
}
