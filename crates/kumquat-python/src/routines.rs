//! Integration functions exposed to Python
//!
//! Each function wraps `f` and `args` in a [`CallableAdapter`], runs the
//! routine with the GIL held, and returns `(value, error)` or, with
//! `full_output=True`, `(value, error, info)`.

use kumquat_core::quadrature::{self, Estimate, GaussKronrodOptions, KronrodRule, Options};
use kumquat_core::{AdapterError, CallableAdapter, Config, QuadratureError};
use pyo3::exceptions::PyNotImplementedError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::sync::OnceLock;

use crate::error::{adapter_error_to_py, core_error_to_py, quadrature_error_to_py};
use crate::host::PythonHost;

type Integrand<'py> = CallableAdapter<PythonHost<'py>>;
type RoutineResult = Result<Estimate, QuadratureError<AdapterError<PyErr>>>;

static SETTINGS: OnceLock<Config> = OnceLock::new();

/// Routine defaults, loaded once from `KUMQUAT_CONFIG`
pub fn settings() -> &'static Config {
    SETTINGS.get_or_init(|| {
        Config::load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unusable configuration file");
            Config::default()
        })
    })
}

/// Wrap `f` and run `routine` on it
fn integrate<'py>(
    py: Python<'py>,
    f: &'py PyAny,
    args: Option<&'py PyAny>,
    kwargs: Option<&'py PyAny>,
    routine: impl FnOnce(&Integrand<'py>) -> RoutineResult,
) -> PyResult<Estimate> {
    if let Some(kwargs) = kwargs {
        let empty = kwargs.downcast::<PyDict>().map(|d| d.is_empty()).unwrap_or(false);
        if !empty {
            return Err(PyNotImplementedError::new_err(
                "keyword arguments cannot be forwarded to the integrand; bind them with functools.partial",
            ));
        }
    }

    let extra_args = args.unwrap_or_else(|| py.None().into_ref(py));
    let adapter = CallableAdapter::create(
        PythonHost::new(py),
        Some(PythonHost::handle(f)),
        Some(PythonHost::handle(extra_args)),
    )
    .map_err(adapter_error_to_py)?;

    routine(&adapter).map_err(quadrature_error_to_py)
}

fn output(
    py: Python<'_>,
    estimate: &Estimate,
    full_output: bool,
    extra: impl FnOnce(&PyDict) -> PyResult<()>,
) -> PyResult<PyObject> {
    if !full_output {
        return Ok((estimate.value, estimate.error).into_py(py));
    }

    let info = PyDict::new(py);
    info.set_item("L1", estimate.l1_norm)?;
    info.set_item("levels", estimate.levels)?;
    info.set_item("evaluations", estimate.evaluations)?;
    extra(info)?;
    Ok((estimate.value, estimate.error, info).into_py(py))
}

/// Performs Gauss-Kronrod quadrature, returning a complex result and a real error estimate
///
/// Args:
///     f (Callable): Function to integrate, called as f(x, *args) and returning a complex
///     a (float): Lower limit of integration
///     b (float): Upper limit of integration; must be finite and greater than a
///     args (Optional[tuple]): Extra positional arguments passed after x
///     kwargs (Optional[dict]): Must be None or empty
///     full_output (bool): Also return a dict with L1, abscissa, weights, levels and evaluations
///     max_levels (Optional[int]): Maximum bisection depth, 0 for non-adaptive (default 15)
///     tolerance (Optional[float]): Relative tolerance (default sqrt of machine epsilon)
///     points (Optional[int]): Kronrod points, one of 15, 31, 41, 51, 61 (default 31)
///
/// Returns:
///     tuple: (value, error) or (value, error, info)
#[pyfunction]
#[pyo3(signature = (f, a, b, args=None, kwargs=None, *, full_output=false, max_levels=None, tolerance=None, points=None))]
#[allow(clippy::too_many_arguments)]
pub fn gauss_kronrod(
    py: Python<'_>,
    f: &PyAny,
    a: f64,
    b: f64,
    args: Option<&PyAny>,
    kwargs: Option<&PyAny>,
    full_output: bool,
    max_levels: Option<usize>,
    tolerance: Option<f64>,
    points: Option<usize>,
) -> PyResult<PyObject> {
    let defaults = settings().gauss_kronrod;
    let rule = match points {
        Some(points) => KronrodRule::try_from(points).map_err(core_error_to_py)?,
        None => defaults.points,
    };
    let overrides = defaults.options().with_overrides(max_levels, tolerance);
    let options = GaussKronrodOptions {
        points: rule,
        max_levels: overrides.max_levels,
        tolerance: overrides.tolerance,
    };

    let estimate = integrate(py, f, args, kwargs, |adapter| {
        quadrature::gauss_kronrod(|x| adapter.call(x), a, b, &options)
    })?;

    output(py, &estimate, full_output, |info| {
        info.set_item("abscissa", PyList::new(py, rule.abscissa()))?;
        info.set_item("weights", PyList::new(py, rule.weights()))
    })
}

/// Performs tanh-sinh quadrature, returning a complex result and a real error estimate
///
/// Args:
///     f (Callable): Function to integrate, called as f(x, *args) and returning a complex
///     a (float): Lower limit of integration; may be -inf
///     b (float): Upper limit of integration; must be greater than a, may be +inf
///     args (Optional[tuple]): Extra positional arguments passed after x
///     kwargs (Optional[dict]): Must be None or empty
///     full_output (bool): Also return a dict with L1, levels and evaluations
///     max_levels (Optional[int]): Maximum refinement levels (default 15)
///     tolerance (Optional[float]): Relative tolerance (default sqrt of machine epsilon)
///
/// Returns:
///     tuple: (value, error) or (value, error, info)
#[pyfunction]
#[pyo3(signature = (f, a, b, args=None, kwargs=None, *, full_output=false, max_levels=None, tolerance=None))]
#[allow(clippy::too_many_arguments)]
pub fn tanh_sinh(
    py: Python<'_>,
    f: &PyAny,
    a: f64,
    b: f64,
    args: Option<&PyAny>,
    kwargs: Option<&PyAny>,
    full_output: bool,
    max_levels: Option<usize>,
    tolerance: Option<f64>,
) -> PyResult<PyObject> {
    let options = settings().tanh_sinh.with_overrides(max_levels, tolerance);
    let estimate = integrate(py, f, args, kwargs, |adapter| {
        quadrature::tanh_sinh(|x| adapter.call(x), a, b, &options)
    })?;
    output(py, &estimate, full_output, |_| Ok(()))
}

/// Performs sinh-sinh quadrature over the whole real line, returning a complex
/// result and a real error estimate
///
/// Args:
///     f (Callable): Function to integrate, called as f(x, *args) and returning a complex
///     args (Optional[tuple]): Extra positional arguments passed after x
///     kwargs (Optional[dict]): Must be None or empty
///     full_output (bool): Also return a dict with L1, levels and evaluations
///     max_levels (Optional[int]): Maximum refinement levels (default 15)
///     tolerance (Optional[float]): Relative tolerance (default sqrt of machine epsilon)
///
/// Returns:
///     tuple: (value, error) or (value, error, info)
#[pyfunction]
#[pyo3(signature = (f, args=None, kwargs=None, *, full_output=false, max_levels=None, tolerance=None))]
pub fn sinh_sinh(
    py: Python<'_>,
    f: &PyAny,
    args: Option<&PyAny>,
    kwargs: Option<&PyAny>,
    full_output: bool,
    max_levels: Option<usize>,
    tolerance: Option<f64>,
) -> PyResult<PyObject> {
    let options = settings().sinh_sinh.with_overrides(max_levels, tolerance);
    let estimate = integrate(py, f, args, kwargs, |adapter| {
        quadrature::sinh_sinh(|x| adapter.call(x), &options)
    })?;
    output(py, &estimate, full_output, |_| Ok(()))
}

/// Performs exp-sinh quadrature over a half-infinite interval, returning a
/// complex result and a real error estimate
///
/// Args:
///     f (Callable): Function to integrate, called as f(x, *args) and returning a complex
///     a (float): Lower limit of integration
///     b (float): Upper limit of integration; exactly one of a and b must be infinite
///     args (Optional[tuple]): Extra positional arguments passed after x
///     kwargs (Optional[dict]): Must be None or empty
///     full_output (bool): Also return a dict with L1, levels and evaluations
///     max_levels (Optional[int]): Maximum refinement levels (default 15)
///     tolerance (Optional[float]): Relative tolerance (default sqrt of machine epsilon)
///
/// Returns:
///     tuple: (value, error) or (value, error, info)
#[pyfunction]
#[pyo3(signature = (f, a, b, args=None, kwargs=None, *, full_output=false, max_levels=None, tolerance=None))]
#[allow(clippy::too_many_arguments)]
pub fn exp_sinh(
    py: Python<'_>,
    f: &PyAny,
    a: f64,
    b: f64,
    args: Option<&PyAny>,
    kwargs: Option<&PyAny>,
    full_output: bool,
    max_levels: Option<usize>,
    tolerance: Option<f64>,
) -> PyResult<PyObject> {
    let options = settings().exp_sinh.with_overrides(max_levels, tolerance);
    let estimate = integrate(py, f, args, kwargs, |adapter| {
        quadrature::exp_sinh(|x| adapter.call(x), a, b, &options)
    })?;
    output(py, &estimate, full_output, |_| Ok(()))
}

/// Performs trapezoidal quadrature, returning a complex result and a real error estimate
///
/// Args:
///     f (Callable): Function to integrate, called as f(x, *args) and returning a complex
///     a (float): Lower limit of integration
///     b (float): Upper limit of integration; must be finite and greater than a
///     args (Optional[tuple]): Extra positional arguments passed after x
///     kwargs (Optional[dict]): Must be None or empty
///     full_output (bool): Also return a dict with L1, levels and evaluations
///     max_levels (Optional[int]): Maximum halvings (default 12)
///     tolerance (Optional[float]): Relative tolerance (default sqrt of machine epsilon)
///
/// Returns:
///     tuple: (value, error) or (value, error, info)
#[pyfunction]
#[pyo3(signature = (f, a, b, args=None, kwargs=None, *, full_output=false, max_levels=None, tolerance=None))]
#[allow(clippy::too_many_arguments)]
pub fn trapezoidal(
    py: Python<'_>,
    f: &PyAny,
    a: f64,
    b: f64,
    args: Option<&PyAny>,
    kwargs: Option<&PyAny>,
    full_output: bool,
    max_levels: Option<usize>,
    tolerance: Option<f64>,
) -> PyResult<PyObject> {
    let options: Options = settings().trapezoidal.with_overrides(max_levels, tolerance);
    let estimate = integrate(py, f, args, kwargs, |adapter| {
        quadrature::trapezoidal(|x| adapter.call(x), a, b, &options)
    })?;
    output(py, &estimate, full_output, |_| Ok(()))
}
