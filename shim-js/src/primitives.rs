//! Immediate values. None of these allocate on the engine heap, so their constructors cannot fail,
//! but the handles are still rooted through the scope like every other `Local`.

use crate::data::{Boolean, Integer, Number, Primitive};
use crate::engine::Value;
use crate::local::Local;
use crate::scope::HandleScope;

pub fn undefined(scope: &HandleScope<'_>) -> Local<Primitive> {
  scope.root(Value::Undefined)
}

pub fn null(scope: &HandleScope<'_>) -> Local<Primitive> {
  scope.root(Value::Null)
}

impl Boolean {
  pub fn new(scope: &HandleScope<'_>, value: bool) -> Local<Boolean> {
    scope.root(Value::Bool(value))
  }
}

impl Local<Boolean> {
  #[track_caller]
  pub fn value(self, scope: &HandleScope<'_>) -> bool {
    match scope.resolve(self) {
      Value::Bool(b) => b,
      other => unreachable!("Local<Boolean> rooted {other:?}"),
    }
  }
}

impl Number {
  pub fn new(scope: &HandleScope<'_>, value: f64) -> Local<Number> {
    scope.root(Value::Number(value))
  }
}

impl Local<Number> {
  #[track_caller]
  pub fn value(self, scope: &HandleScope<'_>) -> f64 {
    match scope.resolve(self) {
      Value::Number(n) => n,
      other => unreachable!("Local<Number> rooted {other:?}"),
    }
  }
}

impl Integer {
  pub fn new(scope: &HandleScope<'_>, value: i32) -> Local<Integer> {
    scope.root(Value::Number(value as f64))
  }

  pub fn new_from_unsigned(scope: &HandleScope<'_>, value: u32) -> Local<Integer> {
    scope.root(Value::Number(value as f64))
  }
}

impl Local<Integer> {
  #[track_caller]
  pub fn value(self, scope: &HandleScope<'_>) -> i64 {
    match scope.resolve(self) {
      Value::Number(n) => n as i64,
      other => unreachable!("Local<Integer> rooted {other:?}"),
    }
  }
}
