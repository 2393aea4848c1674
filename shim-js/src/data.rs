//! Value kinds that parameterize [`Local`].
//!
//! Every kind is an uninhabited marker type; a `Local<Kind>` is the same slot reference whatever
//! the kind, and the kind only decides which operations are available. New kinds only need a
//! [`ValueKind`] impl and their upcasts.

use crate::engine::{self, Heap, ObjectKind};
use crate::local::Local;
use crate::scope::HandleScope;

mod sealed {
  pub trait Sealed {}
}

/// A kind of value a [`Local`] can refer to.
pub trait ValueKind: sealed::Sealed {
  const NAME: &'static str;

  /// Returns `true` if `value` belongs to this kind.
  fn matches(value: engine::Value, heap: &Heap) -> bool;
}

macro_rules! value_kinds {
  ($($(#[$meta:meta])* $name:ident => |$value:ident, $heap:ident| $matches:expr;)*) => {
    $(
      $(#[$meta])*
      pub enum $name {}

      impl sealed::Sealed for $name {}

      impl ValueKind for $name {
        const NAME: &'static str = stringify!($name);

        #[allow(unused_variables)]
        fn matches($value: engine::Value, $heap: &Heap) -> bool {
          $matches
        }
      }
    )*
  };
}

value_kinds! {
  /// Any value.
  Value => |value, heap| true;
  /// `undefined`, `null`, booleans, numbers and strings.
  Primitive => |value, heap| !matches!(value, engine::Value::Object(_));
  String => |value, heap| matches!(value, engine::Value::String(_));
  Number => |value, heap| matches!(value, engine::Value::Number(_));
  /// A number holding an integral value representable as `i32` or `u32`.
  Integer => |value, heap| matches!(value, engine::Value::Number(n) if is_integer(n));
  Boolean => |value, heap| matches!(value, engine::Value::Bool(_));
  /// Ordinary objects and arrays.
  Object => |value, heap| matches!(value, engine::Value::Object(_));
  Array => |value, heap| match value {
    engine::Value::Object(obj) => matches!(heap.object_kind(obj), Ok(ObjectKind::Array)),
    _ => false,
  };
}

fn is_integer(n: f64) -> bool {
  n.fract() == 0.0
    && n >= i32::MIN as f64
    && n <= u32::MAX as f64
    && !(n == 0.0 && n.is_sign_negative())
}

fn is_int32(n: f64) -> bool {
  is_integer(n) && n <= i32::MAX as f64
}

macro_rules! upcasts {
  ($($from:ident => $($to:ident),+;)*) => {
    $($(
      impl From<Local<$from>> for Local<$to> {
        fn from(local: Local<$from>) -> Self {
          local.reinterpret()
        }
      }
    )+)*
  };
}

upcasts! {
  Primitive => Value;
  String => Primitive, Value;
  Number => Primitive, Value;
  Integer => Number, Primitive, Value;
  Boolean => Primitive, Value;
  Object => Value;
  Array => Object, Value;
}

impl<T: ValueKind> Local<T> {
  /// Widens the handle to `Local<Value>`.
  pub fn into_value(self) -> Local<Value> {
    self.reinterpret()
  }

  /// Checked downcast. Returns `None` if the value is not a `U`.
  #[track_caller]
  pub fn try_cast<U: ValueKind>(self, scope: &HandleScope<'_>) -> Option<Local<U>> {
    self.is_kind::<U>(scope).then(|| self.reinterpret())
  }

  #[track_caller]
  fn is_kind<U: ValueKind>(self, scope: &HandleScope<'_>) -> bool {
    scope.with_context(|cx, _| U::matches(self.resolve(cx), cx.heap()))
  }

  #[track_caller]
  pub fn is_undefined(self, scope: &HandleScope<'_>) -> bool {
    matches!(scope.resolve(self), engine::Value::Undefined)
  }

  #[track_caller]
  pub fn is_null(self, scope: &HandleScope<'_>) -> bool {
    matches!(scope.resolve(self), engine::Value::Null)
  }

  /// `undefined` or `null`.
  #[track_caller]
  pub fn is_null_or_undefined(self, scope: &HandleScope<'_>) -> bool {
    matches!(
      scope.resolve(self),
      engine::Value::Null | engine::Value::Undefined
    )
  }

  #[track_caller]
  pub fn is_boolean(self, scope: &HandleScope<'_>) -> bool {
    self.is_kind::<Boolean>(scope)
  }

  #[track_caller]
  pub fn is_number(self, scope: &HandleScope<'_>) -> bool {
    self.is_kind::<Number>(scope)
  }

  #[track_caller]
  pub fn is_int32(self, scope: &HandleScope<'_>) -> bool {
    matches!(scope.resolve(self), engine::Value::Number(n) if is_int32(n))
  }

  #[track_caller]
  pub fn is_string(self, scope: &HandleScope<'_>) -> bool {
    self.is_kind::<String>(scope)
  }

  #[track_caller]
  pub fn is_object(self, scope: &HandleScope<'_>) -> bool {
    self.is_kind::<Object>(scope)
  }

  #[track_caller]
  pub fn is_array(self, scope: &HandleScope<'_>) -> bool {
    self.is_kind::<Array>(scope)
  }

  /// `===`.
  #[track_caller]
  pub fn strict_equals<U: ValueKind>(self, scope: &HandleScope<'_>, other: Local<U>) -> bool {
    scope.with_context(|cx, _| self.resolve(cx).strict_equals(other.resolve(cx), cx.heap()))
  }

  /// ECMAScript `SameValue`.
  #[track_caller]
  pub fn same_value<U: ValueKind>(self, scope: &HandleScope<'_>, other: Local<U>) -> bool {
    scope.with_context(|cx, _| self.resolve(cx).same_value(other.resolve(cx), cx.heap()))
  }

  /// ECMAScript `ToBoolean`.
  #[track_caller]
  pub fn boolean_value(self, scope: &HandleScope<'_>) -> bool {
    scope.with_context(|cx, _| match self.resolve(cx) {
      engine::Value::Undefined | engine::Value::Null => false,
      engine::Value::Bool(b) => b,
      engine::Value::Number(n) => !(n == 0.0 || n.is_nan()),
      engine::Value::String(s) => cx.heap().get_string(s).is_ok_and(|s| !s.is_empty()),
      engine::Value::Object(_) => true,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn integer_range() {
    assert!(is_integer(0.0));
    assert!(!is_integer(-0.0));
    assert!(is_integer(u32::MAX as f64));
    assert!(!is_integer(u32::MAX as f64 + 1.0));
    assert!(is_integer(i32::MIN as f64));
    assert!(!is_integer(1.5));
    assert!(!is_integer(f64::NAN));
    assert!(!is_int32(i32::MAX as f64 + 1.0));
  }
}
