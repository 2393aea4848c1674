//! Exception-free result types.
//!
//! Fallible bridge operations return [`MaybeLocal`] (handle results) or [`Maybe`] (plain results)
//! instead of unwinding. An empty result means the operation failed; for allocations that means
//! the engine ran out of memory.

use crate::local::{contract_violation, Local};

/// Either empty, or a [`Local`].
///
/// Never holds an unrooted engine value: the handle inside was rooted before the `MaybeLocal` was
/// built. There is no third state; wrapping an empty `Local` produces an empty `MaybeLocal`.
pub struct MaybeLocal<T> {
  local: Local<T>,
}

impl<T> MaybeLocal<T> {
  pub const fn empty() -> Self {
    Self {
      local: Local::empty(),
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.local.is_empty()
  }

  /// Converts into an `Option`, the idiomatic way to branch on the result.
  pub fn to_local(self) -> Option<Local<T>> {
    if self.local.is_empty() {
      None
    } else {
      Some(self.local)
    }
  }

  /// Returns the handle, panicking if the result is empty.
  #[track_caller]
  pub fn to_local_checked(self) -> Local<T> {
    if self.local.is_empty() {
      contract_violation("to_local_checked on an empty MaybeLocal");
    }
    self.local
  }

  /// Returns the held handle, or `default` when empty. Never panics.
  ///
  /// This is how the legacy non-fallible entry points are derived from the fallible ones: they
  /// call `from_maybe(Local::empty())`, deliberately turning a failure into an empty handle.
  pub fn from_maybe(self, default: Local<T>) -> Local<T> {
    if self.local.is_empty() {
      default
    } else {
      self.local
    }
  }
}

impl<T> From<Local<T>> for MaybeLocal<T> {
  fn from(local: Local<T>) -> Self {
    Self { local }
  }
}

impl<T> From<Option<Local<T>>> for MaybeLocal<T> {
  fn from(local: Option<Local<T>>) -> Self {
    local.map_or_else(Self::empty, Self::from)
  }
}

impl<T> Clone for MaybeLocal<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for MaybeLocal<T> {}

impl<T> Default for MaybeLocal<T> {
  fn default() -> Self {
    Self::empty()
  }
}

impl<T> PartialEq for MaybeLocal<T> {
  fn eq(&self, other: &Self) -> bool {
    self.local == other.local
  }
}

impl<T> Eq for MaybeLocal<T> {}

impl<T: crate::data::ValueKind> core::fmt::Debug for MaybeLocal<T> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_tuple("MaybeLocal").field(&self.local).finish()
  }
}

/// A plain result that may be missing, used where there is no handle to return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Maybe<T>(Option<T>);

impl<T> Maybe<T> {
  pub const fn just(value: T) -> Self {
    Self(Some(value))
  }

  pub const fn nothing() -> Self {
    Self(None)
  }

  pub fn is_just(&self) -> bool {
    self.0.is_some()
  }

  pub fn is_nothing(&self) -> bool {
    self.0.is_none()
  }

  /// Returns the value, panicking on `nothing`.
  #[track_caller]
  pub fn from_just(self) -> T {
    match self.0 {
      Some(value) => value,
      None => contract_violation("from_just on an empty Maybe"),
    }
  }

  pub fn from_maybe(self, default: T) -> T {
    self.0.unwrap_or(default)
  }

  pub fn to_option(self) -> Option<T> {
    self.0
  }
}

impl<T> From<Option<T>> for Maybe<T> {
  fn from(value: Option<T>) -> Self {
    Self(value)
  }
}
