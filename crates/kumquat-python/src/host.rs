//! CPython as a [`Host`]
//!
//! Handles are raw `PyObject` pointers; stakes are plain reference counts.
//! Every method requires the GIL, which the `Python<'py>` token proves.

use kumquat_core::{Host, Retained};
use num_complex::Complex64;
use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::PyComplex;
use std::ptr::NonNull;

/// Special methods through which CPython turns an object into a complex
const CONVERSION_HOOKS: [&str; 3] = ["__complex__", "__float__", "__index__"];

/// The interpreter, seen through the GIL token
#[derive(Clone, Copy)]
pub struct PythonHost<'py> {
    py: Python<'py>,
}

impl<'py> PythonHost<'py> {
    pub fn new(py: Python<'py>) -> Self {
        Self { py }
    }

    /// Handle for a borrowed Python object
    pub fn handle(object: &PyAny) -> NonNull<ffi::PyObject> {
        // A `&PyAny` is never null
        unsafe { NonNull::new_unchecked(object.as_ptr()) }
    }

    fn borrowed(self, handle: NonNull<ffi::PyObject>) -> &'py PyAny {
        unsafe { self.py.from_borrowed_ptr(handle.as_ptr()) }
    }

    fn new_reference(self, ptr: *mut ffi::PyObject) -> PyResult<NonNull<ffi::PyObject>> {
        NonNull::new(ptr).ok_or_else(|| PyErr::fetch(self.py))
    }
}

impl<'py> Host for PythonHost<'py> {
    type Handle = NonNull<ffi::PyObject>;
    type Error = PyErr;

    fn retain(self, handle: Self::Handle) {
        unsafe { ffi::Py_IncRef(handle.as_ptr()) }
    }

    fn release(self, handle: Self::Handle) {
        unsafe { ffi::Py_DecRef(handle.as_ptr()) }
    }

    fn is_none(self, handle: Self::Handle) -> bool {
        handle.as_ptr() == unsafe { ffi::Py_None() }
    }

    fn is_callable(self, handle: Self::Handle) -> bool {
        unsafe { ffi::PyCallable_Check(handle.as_ptr()) != 0 }
    }

    fn tuple_len(self, handle: Self::Handle) -> Option<usize> {
        unsafe {
            if ffi::PyTuple_Check(handle.as_ptr()) == 0 {
                return None;
            }
            usize::try_from(ffi::PyTuple_Size(handle.as_ptr())).ok()
        }
    }

    fn tuple_item(self, tuple: Self::Handle, index: usize) -> Option<Self::Handle> {
        let index = ffi::Py_ssize_t::try_from(index).ok()?;
        let item = unsafe { ffi::PyTuple_GetItem(tuple.as_ptr(), index) };
        match NonNull::new(item) {
            Some(item) => Some(item),
            None => {
                // Clear the IndexError; the caller reports its own error
                drop(PyErr::take(self.py));
                None
            }
        }
    }

    fn max_tuple_len(self) -> usize {
        ffi::PY_SSIZE_T_MAX as usize
    }

    fn type_name(self, handle: Self::Handle) -> String {
        self.borrowed(handle)
            .get_type()
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|_| "object".to_owned())
    }

    fn new_float(self, x: f64) -> PyResult<Self::Handle> {
        self.new_reference(unsafe { ffi::PyFloat_FromDouble(x) })
    }

    fn new_tuple(self, items: Vec<Retained<Self>>) -> PyResult<Retained<Self>> {
        let len = ffi::Py_ssize_t::try_from(items.len())
            .map_err(|_| pyo3::exceptions::PyOverflowError::new_err("argument tuple too long"))?;
        let tuple = self.new_reference(unsafe { ffi::PyTuple_New(len) })?;
        let tuple = Retained::adopt(self, tuple);

        for (index, item) in items.into_iter().enumerate() {
            // PyTuple_SetItem steals the item's reference, even on failure
            let status = unsafe {
                ffi::PyTuple_SetItem(
                    tuple.handle().as_ptr(),
                    index as ffi::Py_ssize_t,
                    item.into_raw().as_ptr(),
                )
            };
            if status != 0 {
                return Err(PyErr::fetch(self.py));
            }
        }
        Ok(tuple)
    }

    fn call(self, callable: Self::Handle, args: &Retained<Self>) -> PyResult<Retained<Self>> {
        let result = unsafe { ffi::PyObject_CallObject(callable.as_ptr(), args.handle().as_ptr()) };
        // The pending exception is taken out of the interpreter here, before
        // the caller releases anything.
        self.new_reference(result)
            .map(|result| Retained::adopt(self, result))
    }

    fn to_complex(self, handle: Self::Handle) -> PyResult<Option<Complex64>> {
        let value = self.borrowed(handle);
        if !value.is_instance_of::<PyComplex>() {
            let kind = value.get_type();
            let mut convertible = false;
            for hook in CONVERSION_HOOKS {
                if kind.hasattr(hook)? {
                    convertible = true;
                    break;
                }
            }
            if !convertible {
                return Ok(None);
            }
        }
        // A hook that raises is the user's error, not a type mismatch
        value.extract::<Complex64>().map(Some)
    }
}
