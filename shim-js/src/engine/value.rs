use super::{GcObject, GcString, Heap};

/// An engine value.
///
/// Heap-allocated values are represented using GC-managed ids (e.g. [`GcString`]); everything else
/// is stored inline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
  Undefined,
  Null,
  Bool(bool),
  /// IEEE-754 double.
  Number(f64),
  String(GcString),
  Object(GcObject),
}

impl Value {
  /// ECMAScript `IsStrictlyEqual(x, y)`.
  pub fn strict_equals(self, other: Self, heap: &Heap) -> bool {
    match (self, other) {
      (Value::Number(a), Value::Number(b)) => a == b,
      _ => self.same_value(other, heap),
    }
  }

  /// ECMAScript `SameValue(x, y)`.
  ///
  /// This differs from `===` for Numbers:
  /// - `NaN` is the same as `NaN`
  /// - `+0` and `-0` are distinct
  pub fn same_value(self, other: Self, heap: &Heap) -> bool {
    match (self, other) {
      (Value::Undefined, Value::Undefined) => true,
      (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => {
        if a.is_nan() && b.is_nan() {
          return true;
        }
        if a == 0.0 && b == 0.0 {
          return a.to_bits() == b.to_bits();
        }
        a == b
      }
      (Value::String(a), Value::String(b)) => {
        let Ok(a) = heap.get_string(a) else {
          return false;
        };
        let Ok(b) = heap.get_string(b) else {
          return false;
        };
        a.as_code_units() == b.as_code_units()
      }
      (Value::Object(a), Value::Object(b)) => a == b,
      _ => false,
    }
  }
}

impl From<GcString> for Value {
  fn from(value: GcString) -> Self {
    Self::String(value)
  }
}

impl From<GcObject> for Value {
  fn from(value: GcObject) -> Self {
    Self::Object(value)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Self::Number(value)
  }
}
