//! Kumquat Core - complex-valued quadrature of host-language callables
//!
//! This crate turns a callable owned by a reference-counted host runtime
//! (CPython, or the in-process [`Arena`]) into a native integrand and
//! integrates it with one of several quadrature routines.
//!
//! # Main Components
//!
//! - **Host abstraction**: the [`Host`] trait and the [`Retained`] stake guard
//! - **Adapter**: [`CallableAdapter`], a value-semantic wrapper calling
//!   `f(x, *args)` and converting the result to `Complex64`
//! - **Quadrature**: Gauss-Kronrod, tanh-sinh, sinh-sinh, exp-sinh and
//!   trapezoidal routines over complex-valued integrands
//! - **Configuration**: routine defaults and logging settings from TOML or JSON
//!
//! # Example
//!
//! ```
//! use kumquat_core::{tanh_sinh, Arena, CallableAdapter, Options};
//! use num_complex::Complex64;
//!
//! let arena = Arena::new();
//! let square = arena.function(|arena, args| {
//!     let x = arena.float_value(args[0]).unwrap_or(f64::NAN);
//!     Ok(arena.complex(Complex64::new(x * x, 0.0)))
//! });
//!
//! let adapter = CallableAdapter::create(&arena, Some(square), Some(arena.none())).unwrap();
//! let estimate = tanh_sinh(|x| adapter.call(x), 0.0, 1.0, &Options::default()).unwrap();
//! assert!((estimate.value.re - 1.0 / 3.0).abs() < 1e-10);
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod host;
pub mod quadrature;

pub use adapter::{classify_extra_args, CallableAdapter, ExtraArgs};
pub use config::{Config, LogFormat, LoggingConfig};
pub use error::{AdapterError, Error, QuadratureError, Result};
pub use host::{Arena, ArenaError, ComplexHook, Event, Host, ObjectId, Retained};
pub use quadrature::{
    exp_sinh, gauss_kronrod, sinh_sinh, tanh_sinh, trapezoidal, Estimate, GaussKronrodOptions,
    KronrodRule, Options,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
