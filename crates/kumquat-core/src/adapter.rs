//! Host callables as native integrands
//!
//! [`CallableAdapter`] wraps a host callable together with a fixed tuple of
//! extra positional arguments and exposes it as a value-semantic native
//! function `f64 -> Complex64`. It owns exactly one stake on the callable
//! and on each extra argument for as long as it lives; every stake taken
//! while evaluating the function is released before `call` returns.

use num_complex::Complex64;
use std::fmt;

use crate::error::AdapterError;
use crate::host::{Host, Retained};

/// Shape of the extra-argument input given to [`CallableAdapter::create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraArgs {
    /// The host's `None` sentinel: no extra arguments were supplied
    Absent,
    /// An empty tuple
    Empty,
    /// A tuple with this many positional arguments
    Positional(usize),
}

impl ExtraArgs {
    /// Number of arguments passed after the abscissa
    pub fn len(&self) -> usize {
        match self {
            ExtraArgs::Absent | ExtraArgs::Empty => 0,
            ExtraArgs::Positional(n) => *n,
        }
    }

    /// Whether the integrand is called with the abscissa only
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify the extra-argument input without taking any stake
///
/// `None` stands for a null handle.
pub fn classify_extra_args<H: Host>(
    host: H,
    extra_args: Option<H::Handle>,
) -> Result<ExtraArgs, AdapterError<H::Error>> {
    let handle = extra_args.ok_or(AdapterError::InvalidArguments)?;
    if host.is_none(handle) {
        return Ok(ExtraArgs::Absent);
    }
    match host.tuple_len(handle) {
        Some(0) => Ok(ExtraArgs::Empty),
        Some(n) => Ok(ExtraArgs::Positional(n)),
        None => Err(AdapterError::ArgsNotTuple {
            found: host.type_name(handle),
        }),
    }
}

/// A host callable and its fixed extra arguments, callable as `f(x)`
///
/// Cloning takes a fresh stake on the callable and on every argument, so
/// clones are fully independent. Moving is a plain Rust move: the source is
/// never dropped. Assignment is an exchange of state ([`CallableAdapter::swap`]).
pub struct CallableAdapter<H: Host> {
    callback: Retained<H>,
    extra_args: Vec<Retained<H>>,
}

impl<H: Host> CallableAdapter<H> {
    /// Wrap `callback`, to be called as `callback(x, *extra_args)`
    ///
    /// `None` handles stand for null pointers handed over by the caller.
    /// `extra_args` is either the host's `None` sentinel or a tuple. Checks
    /// run in a fixed order and any stake taken before a failing check is
    /// released on the way out.
    pub fn create(
        host: H,
        callback: Option<H::Handle>,
        extra_args: Option<H::Handle>,
    ) -> Result<Self, AdapterError<H::Error>> {
        let callback = callback.ok_or(AdapterError::InvalidCallback)?;
        let extra_args = extra_args.ok_or(AdapterError::InvalidArguments)?;

        if !host.is_callable(callback) {
            tracing::debug!(found = %host.type_name(callback), "refusing to wrap uncallable object");
            return Err(AdapterError::NotCallable);
        }

        let callback = Retained::retain(host, callback);

        // From here on an early return drops `callback`, releasing its stake.
        let shape = classify_extra_args(host, Some(extra_args))?;
        if shape.is_empty() {
            tracing::trace!(?shape, "wrapped integrand without extra arguments");
            return Ok(Self {
                callback,
                extra_args: Vec::new(),
            });
        }

        let count = shape.len();
        let max = host.max_tuple_len();
        if count >= max {
            return Err(AdapterError::TooManyArguments { count, max });
        }

        let mut args = Vec::with_capacity(count);
        for index in 0..count {
            let item = host
                .tuple_item(extra_args, index)
                .ok_or_else(|| AdapterError::ArgsNotTuple {
                    found: host.type_name(extra_args),
                })?;
            args.push(Retained::retain(host, item));
        }

        tracing::trace!(extra_args = count, "wrapped integrand");
        Ok(Self {
            callback,
            extra_args: args,
        })
    }

    /// Evaluate the wrapped function at `x`
    ///
    /// The host error of a failing user function is returned unchanged in
    /// [`AdapterError::UserFunction`], and so is an error raised by the
    /// returned value's own conversion to complex.
    pub fn call(&self, x: f64) -> Result<Complex64, AdapterError<H::Error>> {
        let host = self.callback.host();
        let len = self.extra_args.len() + 1;

        let abscissa = host
            .new_float(x)
            .map(|handle| Retained::adopt(host, handle))
            .map_err(|cause| AdapterError::Conversion { x, cause })?;

        let mut items = Vec::with_capacity(len);
        items.push(abscissa);
        items.extend(self.extra_args.iter().cloned());
        let arg_tuple = host
            .new_tuple(items)
            .map_err(|cause| AdapterError::ArgTuple { len, cause })?;

        let outcome = host.call(self.callback.handle(), &arg_tuple);
        // Released only once the call has returned and any host error has
        // been captured: finalizers may run arbitrary host code.
        drop(arg_tuple);

        let result = outcome.map_err(|err| {
            tracing::debug!(x, "integrand raised");
            AdapterError::UserFunction(err)
        })?;

        match host.to_complex(result.handle()) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => {
                let found = host.type_name(result.handle());
                tracing::debug!(x, %found, "integrand returned a non-complex value");
                Err(AdapterError::ResultNotComplex { found })
            }
            Err(err) => {
                tracing::debug!(x, "converting the integrand's result raised");
                Err(AdapterError::UserFunction(err))
            }
        }
    }

    /// Exchange the wrapped state of two adapters
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Handle of the wrapped callable (borrowed)
    pub fn callback(&self) -> H::Handle {
        self.callback.handle()
    }

    /// Handles of the extra arguments, in call order (borrowed)
    pub fn extra_args(&self) -> impl ExactSizeIterator<Item = H::Handle> + '_ {
        self.extra_args.iter().map(Retained::handle)
    }

    /// Number of positional arguments the callable receives, including `x`
    pub fn arity(&self) -> usize {
        self.extra_args.len() + 1
    }
}

impl<H: Host> Clone for CallableAdapter<H> {
    fn clone(&self) -> Self {
        Self {
            callback: self.callback.clone(),
            extra_args: self.extra_args.clone(),
        }
    }
}

impl<H: Host> fmt::Debug for CallableAdapter<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableAdapter")
            .field("callback", &self.callback.handle())
            .field("extra_args", &self.extra_args.len())
            .finish()
    }
}
