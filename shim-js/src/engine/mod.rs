//! The underlying engine the bridge runs on.
//!
//! This is a deliberately small, precise-GC engine: a non-moving mark/sweep [`Heap`] whose
//! collector only sees values registered on its [`RootStack`] or in its persistent root table.
//! The bridge talks to it exclusively through [`Context`], which exposes the allocation and rooting
//! primitives listed below:
//!
//! - [`Context::new_string_copy_n`]: copy a counted byte buffer into a new string;
//! - [`Context::new_string_copy_z`]: copy a zero-terminated byte buffer into a new string;
//! - [`Context::root`]: register a value in the innermost rooting frame.
//!
//! Values returned by the allocation functions are **unrooted**. They must be passed to
//! [`Context::root`] (or [`Heap::add_root`]) before anything else allocates, otherwise the next
//! collection may free them.

mod handle;
mod heap;
mod roots;
mod string;
mod value;

pub use handle::{GcObject, GcString, HeapId, RootId};
pub use heap::{Heap, HeapLimits, ObjectKind, PropertyKey};
pub use roots::{FrameId, RootStack, SlotRef, StackId};
pub use string::JsString;
pub use value::Value;

use crate::error::ShimError;

/// One engine execution context.
///
/// Owns the heap and a couple of well-known values every context needs: the canonical empty
/// string and the global object. Both are held by persistent roots for the lifetime of the
/// context.
pub struct Context {
  heap: Heap,
  empty_string: GcString,
  global: GcObject,
}

impl Context {
  /// Creates a context, allocating its base objects.
  ///
  /// Fails with [`ShimError::InvalidHeapLimits`] if the GC threshold lies above the memory limit,
  /// and with [`ShimError::OutOfMemory`] if `limits` cannot hold the base objects.
  pub fn new(limits: HeapLimits) -> Result<Self, ShimError> {
    let mut heap = Heap::new(limits.validate()?);

    let empty_string = heap.alloc_string_from_code_units(&[])?;
    heap.add_root(Value::String(empty_string));
    let global = heap.alloc_object(ObjectKind::Ordinary, 0)?;
    heap.add_root(Value::Object(global));

    Ok(Self {
      heap,
      empty_string,
      global,
    })
  }

  pub fn heap(&self) -> &Heap {
    &self.heap
  }

  pub fn heap_mut(&mut self) -> &mut Heap {
    &mut self.heap
  }

  pub fn empty_string(&self) -> GcString {
    self.empty_string
  }

  pub fn global(&self) -> GcObject {
    self.global
  }

  /// Copies exactly `bytes` into a new (unrooted) string, decoding them as UTF-8.
  pub fn new_string_copy_n(&mut self, bytes: &[u8]) -> Result<GcString, ShimError> {
    self.heap.alloc_string_from_utf8(bytes)
  }

  /// Copies `bytes` up to the first zero byte (or the end of the slice) into a new (unrooted)
  /// string, decoding them as UTF-8.
  pub fn new_string_copy_z(&mut self, bytes: &[u8]) -> Result<GcString, ShimError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    self.heap.alloc_string_from_utf8(&bytes[..end])
  }

  /// Registers `value` in `frame`, which must be the innermost frame of the rooting stack.
  pub fn root(&mut self, frame: FrameId, value: Value) -> SlotRef {
    debug_assert!(self.heap.is_valid_or_primitive(value));
    self.heap.root_stack_mut().root(frame, value)
  }
}
