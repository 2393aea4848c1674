use crate::data;
use crate::engine::{Context, HeapLimits, RootId, Value};
use crate::error::ShimError;
use crate::local::Local;
use crate::scope::HandleScope;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell, RefMut};

/// Construction-time isolate options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateParams {
  pub heap_limits: HeapLimits,
}

impl CreateParams {
  pub fn with_heap_limits(mut self, heap_limits: HeapLimits) -> Self {
    self.heap_limits = heap_limits;
    self
  }
}

/// A snapshot of heap and handle usage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HeapStatistics {
  pub used_heap_size: usize,
  pub heap_size_limit: usize,
  pub gc_runs: u64,
  pub live_allocations: usize,
  /// Slots currently held by open handle scopes.
  pub handle_count: usize,
  pub scope_depth: usize,
  /// Persistent roots, including the ones the context holds for its own base objects.
  pub persistent_handles: usize,
}

/// An independent engine instance.
///
/// Owns one engine [`Context`] (and with it the heap and the rooting stack) plus a single pending
/// exception slot. An isolate is used from one thread at a time: it is `Send` but not `Sync`, so
/// hosts that share it must wrap the whole isolate in one mutex.
///
/// Every [`HandleScope`] borrows the isolate, so the isolate outlives all scopes and handles
/// derived from it.
pub struct Isolate {
  context: RefCell<Context>,
  pending_exception: Cell<Option<RootId>>,
  exceptions_thrown: Cell<u64>,
}

impl Isolate {
  /// Creates an isolate with a fresh engine context.
  ///
  /// Fails with [`ShimError::InvalidHeapLimits`] if `params.heap_limits.gc_threshold` exceeds
  /// `max_bytes`, and with [`ShimError::OutOfMemory`] if the heap limits cannot hold the context's
  /// base objects.
  pub fn new(params: CreateParams) -> Result<Self, ShimError> {
    let context = Context::new(params.heap_limits)?;
    tracing::debug!(
      max_bytes = params.heap_limits.max_bytes,
      gc_threshold = params.heap_limits.gc_threshold,
      "isolate created"
    );
    Ok(Self {
      context: RefCell::new(context),
      pending_exception: Cell::new(None),
      exceptions_thrown: Cell::new(0),
    })
  }

  /// Destroys the isolate.
  ///
  /// Panics if any handle scope is still open, e.g. one that was leaked with `mem::forget`.
  pub fn dispose(self) {
    let depth = self.context.borrow().heap().root_stack().depth();
    assert!(
      depth == 0,
      "Isolate disposed with {depth} open HandleScope(s)"
    );
    tracing::debug!(gc_runs = self.context.borrow().heap().gc_runs(), "isolate disposed");
  }

  pub(crate) fn context(&self) -> RefMut<'_, Context> {
    self.context.borrow_mut()
  }

  pub(crate) fn try_context(&self) -> Option<RefMut<'_, Context>> {
    self.context.try_borrow_mut().ok()
  }

  pub fn has_pending_exception(&self) -> bool {
    self.pending_exception.get().is_some()
  }

  /// Roots the pending exception into `scope` and returns it, if there is one.
  pub fn pending_exception(&self, scope: &HandleScope<'_>) -> Option<Local<data::Value>> {
    let id = self.pending_exception.get()?;
    scope.with_context(|cx, frame| {
      let value = cx.heap().get_root(id)?;
      Some(Local::from_slot(cx.root(frame, value)))
    })
  }

  pub fn clear_pending_exception(&self) {
    if let Some(id) = self.pending_exception.take() {
      self.context().heap_mut().remove_root(id);
    }
  }

  /// Stores `value` as the pending exception. A previous pending exception is overwritten.
  pub(crate) fn set_pending_exception(&self, value: Value) {
    let mut cx = self.context();
    if let Some(previous) = self.pending_exception.take() {
      tracing::debug!("overwriting an unhandled pending exception");
      cx.heap_mut().remove_root(previous);
    }
    let id = cx.heap_mut().add_root(value);
    self.pending_exception.set(Some(id));
    self.exceptions_thrown.set(self.exceptions_thrown.get() + 1);
  }

  /// Number of exceptions thrown so far, pending or not.
  pub(crate) fn exceptions_thrown(&self) -> u64 {
    self.exceptions_thrown.get()
  }

  /// Runs a full GC cycle. Intended for tests.
  pub fn collect_garbage(&self) {
    self.context().heap_mut().collect_garbage();
  }

  pub fn heap_statistics(&self) -> HeapStatistics {
    let cx = self.context.borrow();
    let heap = cx.heap();
    HeapStatistics {
      used_heap_size: heap.used_bytes(),
      heap_size_limit: heap.limits().max_bytes,
      gc_runs: heap.gc_runs(),
      live_allocations: heap.live_allocations(),
      handle_count: heap.root_stack().len(),
      scope_depth: heap.root_stack().depth(),
      persistent_handles: heap.persistent_root_count(),
    }
  }
}

impl Drop for Isolate {
  fn drop(&mut self) {
    if std::thread::panicking() {
      return;
    }
    debug_assert_eq!(
      self.context.get_mut().heap().root_stack().depth(),
      0,
      "Isolate dropped with open HandleScope(s)"
    );
  }
}
