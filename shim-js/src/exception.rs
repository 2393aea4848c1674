use crate::data::{Object, String, Value};
use crate::isolate::Isolate;
use crate::local::Local;
use crate::maybe::MaybeLocal;
use crate::scope::{EscapableHandleScope, HandleScope};

/// Constructors for error objects.
///
/// Errors are ordinary objects carrying `name` and `message` properties.
pub enum Exception {}

impl Exception {
  #[track_caller]
  pub fn error(scope: &HandleScope<'_>, message: Local<String>) -> MaybeLocal<Value> {
    new_error(scope, "Error", message)
  }

  #[track_caller]
  pub fn type_error(scope: &HandleScope<'_>, message: Local<String>) -> MaybeLocal<Value> {
    new_error(scope, "TypeError", message)
  }

  #[track_caller]
  pub fn range_error(scope: &HandleScope<'_>, message: Local<String>) -> MaybeLocal<Value> {
    new_error(scope, "RangeError", message)
  }
}

#[track_caller]
fn new_error(scope: &HandleScope<'_>, name: &str, message: Local<String>) -> MaybeLocal<Value> {
  let inner = EscapableHandleScope::new(scope.isolate());
  let Some(error) = build_error(&inner, name, message) else {
    return MaybeLocal::empty();
  };
  inner.escape(error.into_value()).into()
}

fn build_error(
  scope: &HandleScope<'_>,
  name: &str,
  message: Local<String>,
) -> Option<Local<Object>> {
  let error = Object::new(scope).to_local()?;
  let name_key = String::new(scope, "name").to_local()?;
  let name = String::new(scope, name).to_local()?;
  let message_key = String::new(scope, "message").to_local()?;
  error.set(scope, name_key, name).to_option()?;
  error.set(scope, message_key, message).to_option()?;
  Some(error)
}

/// Observes exceptions thrown while it is alive.
///
/// An exception that was already pending when the `TryCatch` was created is not caught: it is
/// neither reported nor cleared. When dropped, a caught exception is cleared unless
/// [`TryCatch::rethrow`] was called.
pub struct TryCatch<'i> {
  isolate: &'i Isolate,
  thrown_before: u64,
  rethrow: bool,
}

impl<'i> TryCatch<'i> {
  pub fn new(scope: &HandleScope<'i>) -> Self {
    let isolate = scope.isolate();
    Self {
      isolate,
      thrown_before: isolate.exceptions_thrown(),
      rethrow: false,
    }
  }

  pub fn has_caught(&self) -> bool {
    self.isolate.has_pending_exception() && self.isolate.exceptions_thrown() > self.thrown_before
  }

  /// The caught exception, rooted in `scope`.
  pub fn exception(&self, scope: &HandleScope<'_>) -> Option<Local<Value>> {
    if !self.has_caught() {
      return None;
    }
    self.isolate.pending_exception(scope)
  }

  /// Discards the caught exception.
  pub fn reset(&mut self) {
    if self.has_caught() {
      self.isolate.clear_pending_exception();
    }
  }

  /// Leaves the exception pending when this `TryCatch` is dropped.
  pub fn rethrow(&mut self) {
    self.rethrow = true;
  }
}

impl Drop for TryCatch<'_> {
  fn drop(&mut self) {
    if !self.rethrow && self.has_caught() {
      self.isolate.clear_pending_exception();
    }
  }
}
