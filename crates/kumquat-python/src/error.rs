//! Error handling for Python bindings
//!
//! This module defines the custom exception types and maps adapter and
//! quadrature failures to Python exceptions. An exception raised by the
//! integrand itself is re-raised unchanged.

use kumquat_core::{AdapterError, Error, QuadratureError};
use pyo3::create_exception;
use pyo3::exceptions::{PyArithmeticError, PyTypeError, PyValueError};
use pyo3::prelude::*;

create_exception!(
    kumquat,
    IntegrandError,
    PyValueError,
    "The integrand cannot be wrapped or returned an unusable value."
);
create_exception!(
    kumquat,
    IntegrationError,
    PyArithmeticError,
    "The integrand produced a non-finite value."
);

/// Convert an adapter failure into the exception to raise
pub fn adapter_error_to_py(err: AdapterError<PyErr>) -> PyErr {
    match err.into_host_error() {
        Ok(cause) => cause,
        Err(
            err @ (AdapterError::InvalidCallback
            | AdapterError::InvalidArguments
            | AdapterError::TooManyArguments { .. }),
        ) => PyTypeError::new_err(err.to_string()),
        Err(err) => IntegrandError::new_err(err.to_string()),
    }
}

/// Convert a routine failure into the exception to raise
pub fn quadrature_error_to_py(err: QuadratureError<AdapterError<PyErr>>) -> PyErr {
    match err {
        QuadratureError::Integrand(err) => adapter_error_to_py(err),
        err @ QuadratureError::NonFinite { .. } => IntegrationError::new_err(err.to_string()),
        err @ QuadratureError::InvalidInterval { .. } => PyValueError::new_err(err.to_string()),
        QuadratureError::Options(err) => core_error_to_py(err),
    }
}

/// Convert a configuration or validation error
pub fn core_error_to_py(err: Error) -> PyErr {
    PyValueError::new_err(err.to_string())
}
