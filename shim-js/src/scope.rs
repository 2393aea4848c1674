use crate::data;
use crate::engine::{Context, FrameId, SlotRef, Value};
use crate::isolate::Isolate;
use crate::local::{contract_violation, Local};
use core::cell::Cell;
use core::ops::Deref;

/// A stack-rooting scope.
///
/// Entering a scope pushes a frame onto the isolate's rooting stack; every [`Local`] created
/// through the scope is rooted in that frame. Dropping the scope pops the frame and invalidates
/// all of those handles at once.
///
/// Scopes must exit in the reverse order they were entered. Only the innermost scope may create
/// handles. Both rules are checked in debug builds.
pub struct HandleScope<'i> {
  isolate: &'i Isolate,
  frame: FrameId,
}

impl<'i> HandleScope<'i> {
  pub fn new(isolate: &'i Isolate) -> Self {
    let frame = isolate.context().heap_mut().root_stack_mut().push_frame();
    Self { isolate, frame }
  }

  pub fn isolate(&self) -> &'i Isolate {
    self.isolate
  }

  /// Exits the scope. Equivalent to dropping it.
  pub fn exit(self) {}

  /// The context's global object.
  pub fn global(&self) -> Local<data::Object> {
    self.with_context(|cx, frame| {
      let global = cx.global();
      Local::from_slot(cx.root(frame, Value::Object(global)))
    })
  }

  /// Makes `exception` the isolate's pending exception and returns `undefined`.
  ///
  /// An exception that is already pending is replaced.
  pub fn throw_exception(&self, exception: Local<data::Value>) -> Local<data::Value> {
    let value = self.with_context(|cx, _| exception.resolve(cx));
    self.isolate.set_pending_exception(value);
    self.root(Value::Undefined)
  }

  /// Runs `f` with exclusive access to the engine context and this scope's frame.
  ///
  /// `f` must not re-enter the isolate (e.g. by creating another scope).
  pub(crate) fn with_context<R>(&self, f: impl FnOnce(&mut Context, FrameId) -> R) -> R {
    let mut cx = self.isolate.context();
    f(&mut cx, self.frame)
  }

  pub(crate) fn root<T>(&self, value: Value) -> Local<T> {
    self.with_context(|cx, frame| Local::from_slot(cx.root(frame, value)))
  }

  #[track_caller]
  pub(crate) fn resolve<T>(&self, local: Local<T>) -> Value {
    let cx = self.isolate.context();
    local.resolve(&cx)
  }
}

impl Drop for HandleScope<'_> {
  fn drop(&mut self) {
    match self.isolate.try_context() {
      Some(mut cx) => cx.heap_mut().root_stack_mut().pop_frame(self.frame),
      None => debug_assert!(
        std::thread::panicking(),
        "HandleScope dropped while the isolate is borrowed"
      ),
    }
  }
}

/// A [`HandleScope`] that can hand one handle back to its enclosing scope.
///
/// The slot for the escaped handle is reserved in the enclosing frame *before* this scope's own
/// frame is pushed, so escaping never roots into a frame other than the innermost one.
pub struct EscapableHandleScope<'i> {
  escape_slot: SlotRef,
  escaped: Cell<bool>,
  scope: HandleScope<'i>,
}

impl<'i> EscapableHandleScope<'i> {
  /// Enters a new escapable scope. Requires an enclosing [`HandleScope`].
  #[track_caller]
  pub fn new(isolate: &'i Isolate) -> Self {
    let escape_slot = {
      let mut cx = isolate.context();
      let Some(parent) = cx.heap().root_stack().top() else {
        drop(cx);
        contract_violation("EscapableHandleScope entered without an enclosing HandleScope");
      };
      cx.root(parent, Value::Undefined)
    };
    Self {
      escape_slot,
      escaped: Cell::new(false),
      scope: HandleScope::new(isolate),
    }
  }

  /// Copies `local` into the enclosing scope and returns the new handle.
  ///
  /// Can be called at most once per scope.
  #[track_caller]
  pub fn escape<T>(&self, local: Local<T>) -> Local<T> {
    if self.escaped.replace(true) {
      contract_violation("EscapableHandleScope::escape called twice");
    }
    self.scope.with_context(|cx, _| {
      let value = local.resolve(cx);
      let stored = cx.heap_mut().root_stack_mut().set(self.escape_slot, value);
      debug_assert!(stored, "escape slot released before its EscapableHandleScope");
    });
    Local::from_slot(self.escape_slot)
  }
}

impl<'i> Deref for EscapableHandleScope<'i> {
  type Target = HandleScope<'i>;

  fn deref(&self) -> &Self::Target {
    &self.scope
  }
}
