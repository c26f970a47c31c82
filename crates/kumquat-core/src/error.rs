//! Error types for the Kumquat core library
//!
//! This module defines the error handling system for Kumquat, using
//! thiserror for the error definitions. There are three families:
//!
//! - [`Error`]: configuration and option validation failures
//! - [`AdapterError`]: failures while wrapping or calling a host callable
//! - [`QuadratureError`]: failures of an integration routine
//!
//! The adapter and quadrature errors are generic over the diagnostic type
//! carried by the host runtime (for CPython, `PyErr`), so a failure raised
//! inside the wrapped function reaches the caller untouched.

use thiserror::Error;

/// Main error type for configuration and option handling
#[derive(Error, Debug)]
pub enum Error {
    /// Validation errors for options and configuration values
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Configuration loading errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing errors
    #[error("TOML error: {message}")]
    Toml {
        message: String,
        #[source]
        source: toml::de::Error,
    },

    /// JSON parsing errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Toml {
            message: err.message().to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Failures of [`CallableAdapter`](crate::CallableAdapter) construction and calls
///
/// `E` is the diagnostic type of the host runtime. Construction errors never
/// carry one; marshaling and call errors carry the diagnostic the host
/// reported.
#[derive(Error, Debug)]
pub enum AdapterError<E> {
    /// No object was given to wrap
    #[error("no valid object was passed to wrap as the integrand")]
    InvalidCallback,

    /// The extra-argument slot was null, as opposed to the host's `None`
    #[error("no valid object was passed as the integrand's extra arguments")]
    InvalidArguments,

    /// The object to wrap cannot be called
    #[error("unable to wrap uncallable object")]
    NotCallable,

    /// The extra arguments were neither `None` nor a tuple
    #[error("the extra arguments passed to the integrand must be a tuple, not {found}")]
    ArgsNotTuple { found: String },

    /// The argument tuple would not fit the host's size type
    #[error("too many arguments provided to integrand function ({count}, limit {max})")]
    TooManyArguments { count: usize, max: usize },

    /// The abscissa could not be converted into a host float
    #[error("unable to convert abscissa {x} to a host float: {cause}")]
    Conversion { x: f64, cause: E },

    /// The argument tuple could not be built
    #[error("unable to build an argument tuple of length {len}: {cause}")]
    ArgTuple { len: usize, cause: E },

    /// The wrapped function itself failed
    #[error("{0}")]
    UserFunction(E),

    /// The wrapped function returned something that is not a complex number
    #[error("the integrand returned a value of type {found}, which cannot be converted to complex")]
    ResultNotComplex { found: String },
}

impl<E> AdapterError<E> {
    /// Take the host diagnostic out of the error, or hand the error back
    /// when it has none
    pub fn into_host_error(self) -> std::result::Result<E, Self> {
        match self {
            Self::Conversion { cause, .. } | Self::ArgTuple { cause, .. } => Ok(cause),
            Self::UserFunction(cause) => Ok(cause),
            other => Err(other),
        }
    }
}

/// Failures of an integration routine
///
/// `E` is the error type of the integrand. The first integrand failure
/// aborts the routine and is returned unchanged.
#[derive(Error, Debug)]
pub enum QuadratureError<E> {
    /// The integrand failed
    #[error("{0}")]
    Integrand(E),

    /// The integration interval is not usable by the routine
    #[error("invalid interval [{a}, {b}]: {reason}")]
    InvalidInterval { a: f64, b: f64, reason: String },

    /// The integrand produced an infinite or NaN value
    #[error("the integrand returned a non-finite value at x = {x}")]
    NonFinite { x: f64 },

    /// The routine options are out of range
    #[error(transparent)]
    Options(#[from] Error),
}

impl<E> QuadratureError<E> {
    pub(crate) fn interval(a: f64, b: f64, reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            a,
            b,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = Error::validation("points", "must be one of 15, 31, 41, 51, 61");
        assert_eq!(
            err.to_string(),
            "Validation error: points - must be one of 15, 31, 41, 51, 61"
        );
    }

    #[test]
    fn test_adapter_error_host_diagnostic() {
        let err: AdapterError<String> = AdapterError::NotCallable;
        assert!(matches!(err.into_host_error(), Err(AdapterError::NotCallable)));

        let err: AdapterError<String> = AdapterError::UserFunction("ZeroDivisionError".into());
        assert_eq!(err.to_string(), "ZeroDivisionError");
        assert_eq!(err.into_host_error().ok().as_deref(), Some("ZeroDivisionError"));

        let err: AdapterError<String> = AdapterError::ArgTuple {
            len: 2,
            cause: "MemoryError".into(),
        };
        assert_eq!(err.into_host_error().ok().as_deref(), Some("MemoryError"));
    }

    #[test]
    fn test_quadrature_error_from_options() {
        let err: QuadratureError<String> = Error::validation("tolerance", "must be positive").into();
        assert!(matches!(err, QuadratureError::Options(Error::Validation { .. })));
    }
}
