use crate::data::ValueKind;
use crate::engine::{Context, RootId, StackId};
use crate::isolate::Isolate;
use crate::local::{contract_violation, Local};
use crate::scope::HandleScope;
use core::fmt;
use core::marker::PhantomData;

/// A handle that outlives handle scopes.
///
/// Backed by a persistent root in the engine heap. The value stays alive until
/// [`Persistent::reset`] is called; dropping a `Persistent` without resetting it keeps the value
/// alive until the isolate is disposed.
///
/// A `Persistent` belongs to the isolate that created it; using it with another isolate panics.
pub struct Persistent<T> {
  root: Option<(StackId, RootId)>,
  _kind: PhantomData<T>,
}

impl<T: ValueKind> Persistent<T> {
  pub fn empty() -> Self {
    Self {
      root: None,
      _kind: PhantomData,
    }
  }

  /// Roots the value of `local` persistently. An empty `local` gives an empty `Persistent`.
  #[track_caller]
  pub fn new(scope: &HandleScope<'_>, local: Local<T>) -> Self {
    if local.is_empty() {
      return Self::empty();
    }
    let root = scope.with_context(|cx, _| {
      let value = local.resolve(cx);
      (cx.heap().root_stack().id(), cx.heap_mut().add_root(value))
    });
    Self {
      root: Some(root),
      _kind: PhantomData,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.root.is_none()
  }

  /// A new handle to the value, rooted in `scope`. Empty if this `Persistent` is empty.
  #[track_caller]
  pub fn get(&self, scope: &HandleScope<'_>) -> Local<T> {
    let Some((owner, root)) = self.root else {
      return Local::empty();
    };
    scope.with_context(|cx, frame| {
      check_owner(cx, owner);
      match cx.heap().get_root(root) {
        Some(value) => Local::from_slot(cx.root(frame, value)),
        None => Local::empty(),
      }
    })
  }

  /// Releases the root. The value becomes collectable unless something else keeps it alive.
  #[track_caller]
  pub fn reset(&mut self, isolate: &Isolate) {
    let Some((owner, root)) = self.root else {
      return;
    };
    let mut cx = isolate.context();
    check_owner(&cx, owner);
    cx.heap_mut().remove_root(root);
    self.root = None;
  }
}

#[track_caller]
fn check_owner(cx: &Context, owner: StackId) {
  if cx.heap().root_stack().id() != owner {
    contract_violation("used a Persistent with an Isolate other than the one that created it");
  }
}

impl<T: ValueKind> Default for Persistent<T> {
  fn default() -> Self {
    Self::empty()
  }
}

impl<T: ValueKind> fmt::Debug for Persistent<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.root {
      Some((_, root)) => write!(f, "Persistent<{}>({})", T::NAME, root.index()),
      None => write!(f, "Persistent<{}>(empty)", T::NAME),
    }
  }
}
