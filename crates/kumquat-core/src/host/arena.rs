//! In-process reference-counted host
//!
//! [`Arena`] is a small object store with the same ownership rules as
//! CPython: every value carries a reference count, tuples own stakes on
//! their items, and a value is finalized when its count drops to zero.
//! Functions are native closures. It lets native code drive a
//! [`CallableAdapter`](crate::CallableAdapter) without an interpreter, and
//! lets tests observe reference counts and the order of host operations.
//!
//! Retaining or releasing a value that has already been freed panics, so
//! use-after-free and double release show up immediately, until the slot
//! is handed out again. Freed slots are reused by later allocations, so a
//! long integration keeps the store at the size of its live set.

use num_complex::Complex64;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

use super::{Host, Retained};

/// Handle to a value stored in an [`Arena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

/// A native function stored in the arena
///
/// It receives borrowed handles to its positional arguments and returns a
/// new reference.
pub type NativeFn = Rc<dyn Fn(&Arena, &[ObjectId]) -> Result<ObjectId, ArenaError>>;

/// Conversion hook of a user-defined object, in the role of `__complex__`
pub type ComplexHook = Rc<dyn Fn() -> Result<Complex64, ArenaError>>;

/// Failure raised inside the arena
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArenaError {
    /// An exception raised by a native function
    #[error("{kind}: {message}")]
    Raised { kind: String, message: String },

    /// The allocation budget set with [`Arena::fail_allocations_after`] ran out
    #[error("MemoryError: allocation budget exhausted")]
    OutOfMemory,

    /// Attempted to call a value that is not a function
    #[error("TypeError: '{0}' object is not callable")]
    NotCallable(String),
}

impl ArenaError {
    /// Build an exception the way a native function would raise it
    pub fn raise(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Host operation recorded while event recording is enabled
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A function is about to be called with the tuple `args`
    Call { callable: ObjectId, args: ObjectId },
    /// A call has returned
    Returned { callable: ObjectId, ok: bool },
    /// A stake was dropped; `freed` is set when the value was finalized
    Release { object: ObjectId, freed: bool },
}

enum Value {
    None,
    Float(f64),
    Int(i64),
    Complex(Complex64),
    Str(String),
    Tuple(Vec<ObjectId>),
    Function(NativeFn),
    Object {
        type_name: String,
        complex: Option<ComplexHook>,
    },
}

impl Value {
    fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Complex(_) => "complex",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::Function(_) => "function",
            Value::Object { type_name, .. } => type_name.as_str(),
        }
    }
}

struct Slot {
    value: Value,
    refcount: usize,
}

/// Reference-counted object store implementing [`Host`] for `&Arena`
pub struct Arena {
    slots: RefCell<Vec<Slot>>,
    free: RefCell<Vec<usize>>,
    events: RefCell<Vec<Event>>,
    recording: Cell<bool>,
    calls: Cell<usize>,
    allocation_budget: Cell<Option<usize>>,
    max_tuple_len: Cell<usize>,
    none: ObjectId,
}

impl Arena {
    /// Create an empty arena holding only the `None` sentinel
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(vec![Slot {
                value: Value::None,
                // The arena keeps its own stake so the sentinel is never freed
                refcount: 1,
            }]),
            free: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
            recording: Cell::new(false),
            calls: Cell::new(0),
            allocation_budget: Cell::new(None),
            max_tuple_len: Cell::new(isize::MAX as usize),
            none: ObjectId(0),
        }
    }

    /// The `None` sentinel (borrowed)
    pub fn none(&self) -> ObjectId {
        self.none
    }

    /// Allocate a float (new reference)
    pub fn float(&self, x: f64) -> ObjectId {
        self.alloc(Value::Float(x))
    }

    /// Allocate an integer (new reference)
    pub fn int(&self, i: i64) -> ObjectId {
        self.alloc(Value::Int(i))
    }

    /// Allocate a complex number (new reference)
    pub fn complex(&self, z: Complex64) -> ObjectId {
        self.alloc(Value::Complex(z))
    }

    /// Allocate a string (new reference)
    pub fn str(&self, s: impl Into<String>) -> ObjectId {
        self.alloc(Value::Str(s.into()))
    }

    /// Allocate an instance of a user-defined type (new reference)
    ///
    /// With a `complex` hook the object converts to a complex number by
    /// running it, and whatever the hook raises is reported as raised by the
    /// object. Without one it has no complex interpretation.
    pub fn object(&self, type_name: impl Into<String>, complex: Option<ComplexHook>) -> ObjectId {
        self.alloc(Value::Object {
            type_name: type_name.into(),
            complex,
        })
    }

    /// Allocate a tuple taking a fresh stake on each item (new reference)
    pub fn tuple(&self, items: &[ObjectId]) -> ObjectId {
        for &item in items {
            self.retain_object(item);
        }
        self.alloc(Value::Tuple(items.to_vec()))
    }

    /// Allocate a native function (new reference)
    pub fn function<F>(&self, f: F) -> ObjectId
    where
        F: Fn(&Arena, &[ObjectId]) -> Result<ObjectId, ArenaError> + 'static,
    {
        self.alloc(Value::Function(Rc::new(f)))
    }

    /// Current reference count, zero once the value is freed
    pub fn refcount(&self, id: ObjectId) -> usize {
        self.slots.borrow()[id.0].refcount
    }

    /// Whether the value has not been finalized yet
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.refcount(id) > 0
    }

    /// Number of live values, including the `None` sentinel
    pub fn live_objects(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.refcount > 0).count()
    }

    /// Number of slots, live or waiting for reuse
    pub fn capacity(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Numeric value of a float or integer
    pub fn float_value(&self, id: ObjectId) -> Option<f64> {
        match self.slots.borrow()[id.0].value {
            Value::Float(x) => Some(x),
            Value::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    /// Contents of a string
    pub fn str_value(&self, id: ObjectId) -> Option<String> {
        match &self.slots.borrow()[id.0].value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Items of a tuple (borrowed)
    pub fn tuple_items(&self, id: ObjectId) -> Option<Vec<ObjectId>> {
        match &self.slots.borrow()[id.0].value {
            Value::Tuple(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Add a stake on `id`
    pub fn retain_object(&self, id: ObjectId) {
        let mut slots = self.slots.borrow_mut();
        let slot = &mut slots[id.0];
        if slot.refcount == 0 {
            panic!("retain of freed object {:?}", id);
        }
        slot.refcount += 1;
    }

    /// Drop a stake on `id`, finalizing it when the count reaches zero
    pub fn release_object(&self, id: ObjectId) {
        let freed = {
            let mut slots = self.slots.borrow_mut();
            let slot = &mut slots[id.0];
            if slot.refcount == 0 {
                panic!("release of freed object {:?}", id);
            }
            slot.refcount -= 1;
            if slot.refcount == 0 {
                self.free.borrow_mut().push(id.0);
                Some(std::mem::replace(&mut slot.value, Value::None))
            } else {
                None
            }
        };

        self.record(Event::Release {
            object: id,
            freed: freed.is_some(),
        });

        // Finalization runs with no borrow held; it may release more values.
        if let Some(Value::Tuple(items)) = freed {
            for item in items {
                self.release_object(item);
            }
        }
    }

    /// Let the next `n` host allocations succeed and fail every one after
    pub fn fail_allocations_after(&self, n: usize) {
        self.allocation_budget.set(Some(n));
    }

    /// Remove the allocation budget
    pub fn clear_allocation_budget(&self) {
        self.allocation_budget.set(None);
    }

    /// Set the largest tuple length reported by [`Host::max_tuple_len`]
    pub fn set_max_tuple_len(&self, len: usize) {
        self.max_tuple_len.set(len);
    }

    /// Start or stop recording [`Event`]s
    pub fn record_events(&self, on: bool) {
        self.recording.set(on);
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Number of function calls made through [`Host::call`]
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }

    fn alloc(&self, value: Value) -> ObjectId {
        let mut slots = self.slots.borrow_mut();
        let slot = Slot { value, refcount: 1 };
        match self.free.borrow_mut().pop() {
            Some(index) => {
                slots[index] = slot;
                ObjectId(index)
            }
            None => {
                slots.push(slot);
                ObjectId(slots.len() - 1)
            }
        }
    }

    fn try_alloc(&self, value: Value) -> Result<ObjectId, ArenaError> {
        match self.allocation_budget.get() {
            Some(0) => return Err(ArenaError::OutOfMemory),
            Some(n) => self.allocation_budget.set(Some(n - 1)),
            None => {}
        }
        Ok(self.alloc(value))
    }

    fn record(&self, event: Event) {
        if self.recording.get() {
            self.events.borrow_mut().push(event);
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("objects", &self.capacity())
            .field("live", &self.live_objects())
            .field("calls", &self.calls.get())
            .finish()
    }
}

impl<'a> Host for &'a Arena {
    type Handle = ObjectId;
    type Error = ArenaError;

    fn retain(self, handle: ObjectId) {
        self.retain_object(handle);
    }

    fn release(self, handle: ObjectId) {
        self.release_object(handle);
    }

    fn is_none(self, handle: ObjectId) -> bool {
        handle == self.none
    }

    fn is_callable(self, handle: ObjectId) -> bool {
        matches!(self.slots.borrow()[handle.0].value, Value::Function(_))
    }

    fn tuple_len(self, handle: ObjectId) -> Option<usize> {
        match &self.slots.borrow()[handle.0].value {
            Value::Tuple(items) => Some(items.len()),
            _ => None,
        }
    }

    fn tuple_item(self, tuple: ObjectId, index: usize) -> Option<ObjectId> {
        match &self.slots.borrow()[tuple.0].value {
            Value::Tuple(items) => items.get(index).copied(),
            _ => None,
        }
    }

    fn max_tuple_len(self) -> usize {
        self.max_tuple_len.get()
    }

    fn type_name(self, handle: ObjectId) -> String {
        self.slots.borrow()[handle.0].value.type_name().to_string()
    }

    fn new_float(self, x: f64) -> Result<ObjectId, ArenaError> {
        self.try_alloc(Value::Float(x))
    }

    fn new_tuple(self, items: Vec<Retained<Self>>) -> Result<Retained<Self>, ArenaError> {
        if let Some(0) = self.allocation_budget.get() {
            return Err(ArenaError::OutOfMemory);
        }
        let stolen: Vec<ObjectId> = items.into_iter().map(Retained::into_raw).collect();
        let tuple = self.try_alloc(Value::Tuple(stolen))?;
        Ok(Retained::adopt(self, tuple))
    }

    fn call(self, callable: ObjectId, args: &Retained<Self>) -> Result<Retained<Self>, ArenaError> {
        let function = match &self.slots.borrow()[callable.0].value {
            Value::Function(f) => Rc::clone(f),
            other => return Err(ArenaError::NotCallable(other.type_name().to_string())),
        };
        let items = self.tuple_items(args.handle()).unwrap_or_default();

        self.calls.set(self.calls.get() + 1);
        self.record(Event::Call {
            callable,
            args: args.handle(),
        });
        let outcome = function(self, &items);
        self.record(Event::Returned {
            callable,
            ok: outcome.is_ok(),
        });

        outcome.map(|result| Retained::adopt(self, result))
    }

    fn to_complex(self, handle: ObjectId) -> Result<Option<Complex64>, ArenaError> {
        let hook = match &self.slots.borrow()[handle.0].value {
            Value::Float(x) => return Ok(Some(Complex64::new(*x, 0.0))),
            Value::Int(i) => return Ok(Some(Complex64::new(*i as f64, 0.0))),
            Value::Complex(z) => return Ok(Some(*z)),
            Value::Object {
                complex: Some(hook),
                ..
            } => Rc::clone(hook),
            _ => return Ok(None),
        };
        // The hook runs with no borrow held
        hook().map(Some)
    }
}
