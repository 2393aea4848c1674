use shim_js::{
  CreateParams, Exception, HandleScope, Isolate, Local, MaybeLocal, Number, Object, ShimError,
  String as JsString, TryCatch, Value,
};

fn read_string_property(
  scope: &HandleScope<'_>,
  obj: Local<Object>,
  name: &str,
) -> Option<std::string::String> {
  let key = JsString::new(scope, name).to_local()?;
  let value = obj.get(scope, key).to_local()?;
  let value = value.try_cast::<JsString>(scope)?;
  Some(value.to_rust_string_lossy(scope))
}

#[test]
fn try_catch_observes_and_clears_the_pending_exception() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  {
    let try_catch = TryCatch::new(&scope);
    assert!(!try_catch.has_caught());
    let thrown = Number::new(&scope, 7.0);
    let result = scope.throw_exception(thrown.into());
    assert!(result.is_undefined(&scope));

    assert!(try_catch.has_caught());
    let caught = try_catch.exception(&scope).expect("caught exception");
    assert!(caught.strict_equals(&scope, thrown));
  }
  assert!(!isolate.has_pending_exception());

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn rethrow_leaves_the_exception_pending() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  {
    let mut try_catch = TryCatch::new(&scope);
    scope.throw_exception(Number::new(&scope, 1.0).into());
    try_catch.rethrow();
  }
  assert!(isolate.has_pending_exception());
  let pending = isolate.pending_exception(&scope).expect("pending exception");
  assert!(pending.is_number(&scope));

  isolate.clear_pending_exception();
  assert!(!isolate.has_pending_exception());
  assert!(isolate.pending_exception(&scope).is_none());

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn a_new_exception_overwrites_an_unhandled_one() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);
  let baseline = isolate.heap_statistics().persistent_handles;

  let first = Number::new(&scope, 1.0);
  let second = Number::new(&scope, 2.0);
  let mut try_catch = TryCatch::new(&scope);
  scope.throw_exception(first.into());
  scope.throw_exception(second.into());
  // Only one pending slot is ever held.
  assert_eq!(isolate.heap_statistics().persistent_handles, baseline + 1);

  let caught = try_catch.exception(&scope).expect("caught exception");
  assert!(caught.strict_equals(&scope, second));
  try_catch.reset();
  assert!(!try_catch.has_caught());
  drop(try_catch);

  assert_eq!(isolate.heap_statistics().persistent_handles, baseline);

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn pending_exception_survives_scope_exit_and_collection() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;

  {
    let scope = HandleScope::new(&isolate);
    let message = JsString::new(&scope, "thrown from an inner scope").to_local_checked();
    let error = Exception::error(&scope, message).to_local_checked();
    scope.throw_exception(error);
  }
  isolate.collect_garbage();

  let scope = HandleScope::new(&isolate);
  let pending = isolate.pending_exception(&scope).expect("pending exception");
  let pending = pending.try_cast::<Object>(&scope).expect("error object");
  assert_eq!(
    read_string_property(&scope, pending, "message").as_deref(),
    Some("thrown from an inner scope")
  );
  isolate.clear_pending_exception();

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn try_catch_ignores_an_exception_pending_before_it() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  let earlier = Number::new(&scope, 1.0);
  scope.throw_exception(earlier.into());
  {
    let mut try_catch = TryCatch::new(&scope);
    assert!(!try_catch.has_caught());
    assert!(try_catch.exception(&scope).is_none());
    try_catch.reset();
  }
  // Neither reported nor cleared.
  let pending = isolate.pending_exception(&scope).expect("pending exception");
  assert!(pending.strict_equals(&scope, earlier));

  // A throw inside the block replaces it and is caught.
  let later = Number::new(&scope, 2.0);
  {
    let try_catch = TryCatch::new(&scope);
    scope.throw_exception(later.into());
    assert!(try_catch.has_caught());
    let caught = try_catch.exception(&scope).expect("caught exception");
    assert!(caught.strict_equals(&scope, later));
  }
  assert!(!isolate.has_pending_exception());

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn error_constructors_set_name_and_message() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  let message = JsString::new(&scope, "bad argument").to_local_checked();
  type Constructor = fn(&HandleScope<'_>, Local<JsString>) -> MaybeLocal<Value>;
  let cases: [(Constructor, &str); 3] = [
    (Exception::error, "Error"),
    (Exception::type_error, "TypeError"),
    (Exception::range_error, "RangeError"),
  ];
  for (construct, name) in cases {
    let before = isolate.heap_statistics().handle_count;
    let error: Local<Value> = construct(&scope, message).to_local_checked();
    // Temporaries of the constructor are released; only the error itself is added.
    assert_eq!(isolate.heap_statistics().handle_count, before + 1);

    let error = error.try_cast::<Object>(&scope).expect("error object");
    assert_eq!(read_string_property(&scope, error, "name").as_deref(), Some(name));
    assert_eq!(
      read_string_property(&scope, error, "message").as_deref(),
      Some("bad argument")
    );
  }
  // Building errors never throws.
  assert!(!isolate.has_pending_exception());

  drop(scope);
  isolate.dispose();
  Ok(())
}
