use crate::data::{Array, Object, String, Value};
use crate::engine::{self, Context, FrameId, GcObject, ObjectKind, PropertyKey};
use crate::local::Local;
use crate::maybe::{Maybe, MaybeLocal};
use crate::scope::HandleScope;

fn alloc_object(scope: &HandleScope<'_>, kind: ObjectKind, length: usize) -> MaybeLocal<Object> {
  scope.with_context(|cx, frame| match cx.heap_mut().alloc_object(kind, length) {
    Ok(obj) => Local::from_slot(cx.root(frame, engine::Value::Object(obj))).into(),
    Err(err) => {
      tracing::debug!(%err, ?kind, "object construction failed");
      MaybeLocal::empty()
    }
  })
}

#[track_caller]
fn resolve_object(cx: &Context, local: Local<Object>) -> GcObject {
  match local.resolve(cx) {
    engine::Value::Object(obj) => obj,
    other => unreachable!("Local<Object> rooted {other:?}"),
  }
}

#[track_caller]
fn resolve_key(cx: &Context, key: Local<String>) -> PropertyKey {
  match key.resolve(cx) {
    engine::Value::String(s) => PropertyKey::String(s),
    other => unreachable!("Local<String> rooted {other:?}"),
  }
}

fn root_property(
  cx: &mut Context,
  frame: FrameId,
  obj: GcObject,
  key: PropertyKey,
) -> MaybeLocal<Value> {
  match cx.heap().get_property(obj, key) {
    Ok(value) => {
      let value = value.unwrap_or(engine::Value::Undefined);
      Local::from_slot(cx.root(frame, value)).into()
    }
    Err(_) => MaybeLocal::empty(),
  }
}

impl Object {
  /// Creates an empty ordinary object.
  pub fn new(scope: &HandleScope<'_>) -> MaybeLocal<Object> {
    alloc_object(scope, ObjectKind::Ordinary, 0)
  }
}

impl Local<Object> {
  /// Creates or overwrites the own data property `key`.
  ///
  /// Returns `nothing` if the engine cannot grow the object.
  #[track_caller]
  pub fn set(
    self,
    scope: &HandleScope<'_>,
    key: Local<String>,
    value: impl Into<Local<Value>>,
  ) -> Maybe<bool> {
    let value = value.into();
    scope.with_context(|cx, _| {
      let obj = resolve_object(cx, self);
      let key = resolve_key(cx, key);
      let value = value.resolve(cx);
      cx.heap_mut()
        .set_property(obj, key, value)
        .ok()
        .map(|()| true)
        .into()
    })
  }

  /// Reads the own property `key`. Missing properties read as `undefined`.
  #[track_caller]
  pub fn get(self, scope: &HandleScope<'_>, key: Local<String>) -> MaybeLocal<Value> {
    scope.with_context(|cx, frame| {
      let obj = resolve_object(cx, self);
      let key = resolve_key(cx, key);
      root_property(cx, frame, obj, key)
    })
  }

  #[track_caller]
  pub fn has(self, scope: &HandleScope<'_>, key: Local<String>) -> Maybe<bool> {
    scope.with_context(|cx, _| {
      let obj = resolve_object(cx, self);
      let key = resolve_key(cx, key);
      cx.heap().has_property(obj, key).ok().into()
    })
  }

  /// Removes the own property `key`. Returns `just(true)` whether or not it existed.
  #[track_caller]
  pub fn delete(self, scope: &HandleScope<'_>, key: Local<String>) -> Maybe<bool> {
    scope.with_context(|cx, _| {
      let obj = resolve_object(cx, self);
      let key = resolve_key(cx, key);
      cx.heap_mut()
        .delete_property(obj, key)
        .ok()
        .map(|_| true)
        .into()
    })
  }

  /// Writes the element `index`. On arrays, writing past the end grows the array.
  #[track_caller]
  pub fn set_index(
    self,
    scope: &HandleScope<'_>,
    index: u32,
    value: impl Into<Local<Value>>,
  ) -> Maybe<bool> {
    let value = value.into();
    scope.with_context(|cx, _| {
      let obj = resolve_object(cx, self);
      let value = value.resolve(cx);
      cx.heap_mut()
        .set_property(obj, PropertyKey::Index(index), value)
        .ok()
        .map(|()| true)
        .into()
    })
  }

  /// Reads the element `index`. Missing elements and holes read as `undefined`.
  #[track_caller]
  pub fn get_index(self, scope: &HandleScope<'_>, index: u32) -> MaybeLocal<Value> {
    scope.with_context(|cx, frame| {
      let obj = resolve_object(cx, self);
      root_property(cx, frame, obj, PropertyKey::Index(index))
    })
  }

  /// `false` for holes, even when the index is below an array's length.
  #[track_caller]
  pub fn has_index(self, scope: &HandleScope<'_>, index: u32) -> Maybe<bool> {
    scope.with_context(|cx, _| {
      let obj = resolve_object(cx, self);
      cx.heap()
        .has_property(obj, PropertyKey::Index(index))
        .ok()
        .into()
    })
  }

  /// Removes the element `index`. On arrays this leaves a hole and keeps the length.
  #[track_caller]
  pub fn delete_index(self, scope: &HandleScope<'_>, index: u32) -> Maybe<bool> {
    scope.with_context(|cx, _| {
      let obj = resolve_object(cx, self);
      cx.heap_mut()
        .delete_property(obj, PropertyKey::Index(index))
        .ok()
        .map(|_| true)
        .into()
    })
  }
}

impl Array {
  /// Creates an array of `length` holes.
  pub fn new(scope: &HandleScope<'_>, length: usize) -> MaybeLocal<Array> {
    match alloc_object(scope, ObjectKind::Array, length).to_local() {
      Some(obj) => MaybeLocal::from(obj.reinterpret::<Array>()),
      None => MaybeLocal::empty(),
    }
  }
}

impl Local<Array> {
  #[track_caller]
  pub fn length(self, scope: &HandleScope<'_>) -> u32 {
    scope.with_context(|cx, _| {
      let obj = resolve_object(cx, self.into());
      match cx.heap().array_length(obj) {
        Ok(len) => len,
        Err(_) => unreachable!("Local<Array> rooted a non-array"),
      }
    })
  }
}
