//! Kumquat Python Bindings
//!
//! This crate provides the `kumquat` extension module: complex-valued
//! numerical integration of Python callables.
//!
//! ```python
//! import cmath, kumquat
//!
//! value, error = kumquat.gauss_kronrod(lambda x, k: cmath.exp(1j * k * x), 0.0, 1.0, (3.0,))
//! value, error, info = kumquat.tanh_sinh(lambda x: x ** -0.5, 0.0, 1.0, full_output=True)
//! ```

#![allow(non_local_definitions)] // PyO3 macros generate non-local impl blocks

use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

mod error;
mod host;
mod logging;
mod routines;

pub use error::{IntegrandError, IntegrationError};
pub use host::PythonHost;

/// Provides routines to perform efficient complex valued numeric integration
#[pymodule]
fn kumquat(py: Python<'_>, m: &PyModule) -> PyResult<()> {
    if logging::requested_by_env() {
        let mut config = routines::settings().logging.clone();
        logging::merge_with_env(&mut config);
        if let Err(e) = logging::init_logging(config) {
            eprintln!("Warning: kumquat logging disabled: {}", e);
        }
    }

    // Add exception types
    m.add("IntegrandError", py.get_type::<IntegrandError>())?;
    m.add("IntegrationError", py.get_type::<IntegrationError>())?;

    // Add integration routines
    m.add_function(wrap_pyfunction!(routines::gauss_kronrod, m)?)?;
    m.add_function(wrap_pyfunction!(routines::tanh_sinh, m)?)?;
    m.add_function(wrap_pyfunction!(routines::sinh_sinh, m)?)?;
    m.add_function(wrap_pyfunction!(routines::exp_sinh, m)?)?;
    m.add_function(wrap_pyfunction!(routines::trapezoidal, m)?)?;

    // Add utility functions
    m.add_function(wrap_pyfunction!(enable_logging, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;

    m.add("DEFAULT_TOLERANCE", kumquat_core::quadrature::DEFAULT_TOLERANCE)?;

    Ok(())
}

/// Send the library's log events to stderr
///
/// Args:
///     level (Optional[str]): Filter directive such as "debug" or "kumquat_core=trace"
///     format (Optional[str]): One of "compact", "full" or "json"
///
/// Returns:
///     bool: False if logging had already been enabled, in which case the
///     earlier settings stay in effect
#[pyfunction]
#[pyo3(signature = (level=None, format=None))]
fn enable_logging(level: Option<String>, format: Option<&str>) -> PyResult<bool> {
    let mut config = routines::settings().logging.clone();
    logging::merge_with_env(&mut config);
    if let Some(level) = level {
        config.level = level;
    }
    if let Some(format) = format {
        config.format = format.parse().map_err(error::core_error_to_py)?;
    }
    logging::init_logging(config).map_err(error::core_error_to_py)
}

/// Get the version of the Kumquat library
#[pyfunction]
fn version() -> PyResult<String> {
    Ok(format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyo3::types::PyDict;

    fn run(script: &str) {
        Python::with_gil(|py| {
            let module = PyModule::new(py, "kumquat").unwrap();
            kumquat(py, module).unwrap();
            let globals = PyDict::new(py);
            globals.set_item("kumquat", module).unwrap();
            if let Err(err) = py.run(script, Some(globals), None) {
                err.print(py);
                panic!("script failed: {}", err);
            }
        });
    }

    #[test]
    fn test_identity_and_extra_args() {
        run(r#"
value, error = kumquat.gauss_kronrod(lambda x: complex(x, 0), 0.0, 1.0)
assert abs(value - 0.5) < 1e-14, value
assert isinstance(value, complex) and isinstance(error, float)

value, _ = kumquat.gauss_kronrod(lambda x, k: x * k, 0.0, 1.0, (3,))
assert abs(value - 1.5) < 1e-14, value

seen = []
def record(*a):
    seen.append(a)
    return 0j
kumquat.trapezoidal(record, 0.0, 1.0, (), max_levels=1)
kumquat.trapezoidal(record, 0.0, 1.0, None, max_levels=1)
assert all(len(a) == 1 for a in seen), seen

kumquat.tanh_sinh(record, 0.0, 1.0, ("a", 2, None), max_levels=0)
assert seen[-1][1:] == ("a", 2, None), seen[-1]
"#);
    }

    #[test]
    fn test_every_routine() {
        run(r#"
import math, cmath
value, _ = kumquat.tanh_sinh(lambda x: x ** -0.5, 0.0, 1.0)
assert abs(value - 2.0) < 1e-8, value
value, _ = kumquat.sinh_sinh(lambda x: math.exp(-x * x))
assert abs(value - math.sqrt(math.pi)) < 1e-9, value
value, _ = kumquat.exp_sinh(lambda x: math.exp(-x), 0.0, math.inf)
assert abs(value - 1.0) < 1e-9, value
value, _ = kumquat.tanh_sinh(lambda x: 1 / (1 + x * x), -math.inf, math.inf)
assert abs(value - math.pi) < 1e-8, value
value, _ = kumquat.gauss_kronrod(lambda x: cmath.exp(1j * x), 0.0, math.pi, points=61)
assert abs(value - 2j) < 1e-13, value
value, _ = kumquat.trapezoidal(lambda x: cmath.exp(1j * x) + 1, 0.0, 2 * math.pi)
assert abs(value - 2 * math.pi) < 1e-12, value
"#);
    }

    #[test]
    fn test_full_output() {
        run(r#"
value, error, info = kumquat.gauss_kronrod(lambda x: x, 0.0, 1.0, full_output=True, points=15)
assert set(info) == {"L1", "abscissa", "weights", "levels", "evaluations"}, info
assert len(info["abscissa"]) == 8 and info["abscissa"][0] == 0.0
assert len(info["weights"]) == 8
assert info["evaluations"] == 15 and info["levels"] == 0
assert abs(info["L1"] - 0.5) < 1e-14

for routine in (kumquat.tanh_sinh, kumquat.trapezoidal):
    result = routine(lambda x: x, 0.0, 1.0, full_output=True)
    assert len(result) == 3 and set(result[2]) == {"L1", "levels", "evaluations"}
result = kumquat.sinh_sinh(lambda x: 1 / (1 + x * x), full_output=True)
assert set(result[2]) == {"L1", "levels", "evaluations"}
"#);
    }

    #[test]
    fn test_errors() {
        run(r#"
def raises(kind, fn, *args, **kwargs):
    try:
        fn(*args, **kwargs)
    except kind as exc:
        return exc
    raise AssertionError("expected " + kind.__name__)

class Boom(Exception):
    pass
def explode(x):
    raise Boom("from the integrand")
exc = raises(Boom, kumquat.tanh_sinh, explode, 0.0, 1.0)
assert str(exc) == "from the integrand"

raises(kumquat.IntegrandError, kumquat.gauss_kronrod, 5, 0.0, 1.0)
raises(ValueError, kumquat.gauss_kronrod, 5, 0.0, 1.0)
raises(kumquat.IntegrandError, kumquat.gauss_kronrod, lambda x, k: x, 0.0, 1.0, [1])
raises(kumquat.IntegrandError, kumquat.gauss_kronrod, lambda x: "abc", 0.0, 1.0)

class Bad:
    def __complex__(self):
        raise KeyError("inside __complex__")
exc = raises(KeyError, kumquat.tanh_sinh, lambda x: Bad(), 0.0, 1.0)
assert exc.args == ("inside __complex__",), exc.args
raises(ValueError, kumquat.tanh_sinh, lambda x: x, -1.7e308, 1.7e308)
raises(kumquat.IntegrationError, kumquat.gauss_kronrod, lambda x: float("nan"), 0.0, 1.0)
raises(ValueError, kumquat.gauss_kronrod, lambda x: x, 0.0, 1.0, points=20)
raises(ValueError, kumquat.gauss_kronrod, lambda x: x, 1.0, 0.0)
raises(ValueError, kumquat.exp_sinh, lambda x: x, 0.0, 1.0)
raises(ValueError, kumquat.tanh_sinh, lambda x: x, 0.0, 1.0, tolerance=-1.0)
raises(NotImplementedError, kumquat.tanh_sinh, lambda x, k=1: x, 0.0, 1.0, None, {"k": 2})
kumquat.tanh_sinh(lambda x: x, 0.0, 1.0, None, {})
"#);
    }

    #[test]
    fn test_reference_counts_are_restored() {
        run(r#"
import sys
def f(x, k):
    return x * k
k = 2.5
args = (k,)
before = (sys.getrefcount(f), sys.getrefcount(k), sys.getrefcount(args))
kumquat.gauss_kronrod(f, 0.0, 1.0, args)
kumquat.tanh_sinh(f, 0.0, 1.0, args)
try:
    kumquat.gauss_kronrod(f, 0.0, 1.0, args, points=20)
except ValueError:
    pass
after = (sys.getrefcount(f), sys.getrefcount(k), sys.getrefcount(args))
assert before == after, (before, after)
"#);
    }

    #[test]
    fn test_version() {
        run(r#"
assert kumquat.version().startswith("kumquat-python ")
assert kumquat.DEFAULT_TOLERANCE == 2.0 ** -26
"#);
    }
}
