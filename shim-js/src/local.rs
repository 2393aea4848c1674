use crate::data::ValueKind;
use crate::engine::{Context, SlotRef, Value};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// A handle to a value rooted in a [`HandleScope`](crate::HandleScope).
///
/// A `Local` is a typed [`SlotRef`] into the isolate's rooting stack: copying it copies the slot
/// reference, never the slot. It is valid exactly as long as the scope that created the slot.
/// Using it afterwards is detected through the slot's generation counter and panics.
///
/// `Local::empty()` (also the [`Default`]) holds no slot. The only valid operations on an empty
/// handle are [`Local::is_empty`] and equality.
///
/// Equality is slot identity: copies of one handle are equal, two handles created separately are
/// not, even when they refer to equal values. Use
/// [`strict_equals`](Local::strict_equals) to compare the values themselves.
pub struct Local<T> {
  slot: Option<SlotRef>,
  _kind: PhantomData<T>,
}

impl<T> Local<T> {
  /// The empty handle.
  pub const fn empty() -> Self {
    Self {
      slot: None,
      _kind: PhantomData,
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.slot.is_none()
  }

  /// The rooted slot this handle refers to.
  #[inline]
  pub fn slot(&self) -> Option<SlotRef> {
    self.slot
  }

  pub(crate) fn from_slot(slot: SlotRef) -> Self {
    Self {
      slot: Some(slot),
      _kind: PhantomData,
    }
  }

  /// Reinterprets the handle as another kind without checking.
  pub(crate) fn reinterpret<U>(self) -> Local<U> {
    Local {
      slot: self.slot,
      _kind: PhantomData,
    }
  }

  /// Reads the rooted value.
  ///
  /// Panics if the handle is empty, belongs to another isolate, or its scope has exited.
  #[track_caller]
  pub(crate) fn resolve(self, cx: &Context) -> Value {
    let Some(slot) = self.slot else {
      contract_violation("dereferenced an empty Local");
    };
    let stack = cx.heap().root_stack();
    if !stack.owns(slot) {
      contract_violation("used a Local with an Isolate other than the one that created it");
    }
    match stack.get(slot) {
      Some(value) => value,
      None => contract_violation("used a Local after its HandleScope exited"),
    }
  }
}

#[cold]
#[track_caller]
pub(crate) fn contract_violation(what: &str) -> ! {
  panic!("handle contract violation: {what}")
}

impl<T> Clone for Local<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Local<T> {}

impl<T> Default for Local<T> {
  fn default() -> Self {
    Self::empty()
  }
}

impl<T> PartialEq for Local<T> {
  fn eq(&self, other: &Self) -> bool {
    self.slot == other.slot
  }
}

impl<T> Eq for Local<T> {}

impl<T> Hash for Local<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.slot.hash(state);
  }
}

impl<T: ValueKind> fmt::Debug for Local<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.slot {
      Some(slot) => write!(
        f,
        "Local<{}>({}, gen {})",
        T::NAME,
        slot.index(),
        slot.generation()
      ),
      None => write!(f, "Local<{}>(empty)", T::NAME),
    }
  }
}
