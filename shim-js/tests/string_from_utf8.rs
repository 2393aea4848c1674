use proptest::prelude::*;
use shim_js::{
  CreateParams, HandleScope, Isolate, Local, NewStringType, ShimError, String as JsString,
};

fn decode(scope: &HandleScope<'_>, data: &[u8], length: i32) -> std::string::String {
  JsString::new_from_utf8(scope, data, NewStringType::Normal, length)
    .to_local_checked()
    .to_rust_string_lossy(scope)
}

#[test]
fn explicit_length_copies_exactly_that_many_bytes() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  assert_eq!(decode(&scope, b"hi", 2), "hi");
  assert_eq!(decode(&scope, b"hello", 3), "hel");
  // An explicit length copies embedded zeros too.
  let s = JsString::new_from_utf8(&scope, b"a\0b", NewStringType::Normal, 3).to_local_checked();
  assert_eq!(s.length(&scope), 3);

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn negative_length_stops_at_the_first_zero_byte() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  assert_eq!(decode(&scope, b"hi\0ignored", -1), "hi");
  assert_eq!(decode(&scope, b"no terminator", -1), "no terminator");
  assert_eq!(decode(&scope, b"\0", -7), "");

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn empty_buffer_gives_an_empty_string_not_a_failure() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  let maybe = JsString::new_from_utf8(&scope, b"", NewStringType::Normal, 0);
  assert!(!maybe.is_empty());
  let s = maybe.to_local_checked();
  assert_eq!(s.length(&scope), 0);
  assert!(s.strict_equals(&scope, JsString::empty(&scope)));

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn malformed_utf8_is_replaced_by_the_decoder() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  assert_eq!(decode(&scope, b"a\xffb", 3), "a\u{fffd}b");
  // Cutting a multi-byte sequence in half is malformed as well.
  assert_eq!(decode(&scope, "é".as_bytes(), 1), "\u{fffd}");

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn identical_bytes_give_distinct_handles_with_equal_content() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);
  let baseline = isolate.heap_statistics().live_allocations;

  let a = JsString::new_from_utf8(&scope, b"same", NewStringType::Normal, -1).to_local_checked();
  let b = JsString::new_from_utf8(&scope, b"same", NewStringType::Normal, -1).to_local_checked();
  assert_ne!(a, b);
  assert!(a.strict_equals(&scope, b));
  assert_eq!(a.to_rust_string_lossy(&scope), b.to_rust_string_lossy(&scope));

  // Copies of one handle are the same handle.
  let copy = a;
  assert_eq!(copy, a);

  // Two allocations, not one shared string.
  let stats = isolate.heap_statistics();
  assert_eq!(stats.live_allocations, baseline + 2);
  assert_eq!(stats.handle_count, 2);

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
#[should_panic(expected = "internalized strings are not supported")]
fn internalized_mode_is_a_fatal_assertion() {
  let isolate = Isolate::new(CreateParams::default()).unwrap();
  let scope = HandleScope::new(&isolate);
  let _ = JsString::new_from_utf8(&scope, b"hi", NewStringType::Internalized, 2);
}

#[test]
#[should_panic(expected = "exceeds")]
fn length_past_the_buffer_is_rejected() {
  let isolate = Isolate::new(CreateParams::default()).unwrap();
  let scope = HandleScope::new(&isolate);
  let _ = JsString::new_from_utf8(&scope, b"hi", NewStringType::Normal, 3);
}

#[test]
fn raw_mode_ids_map_to_string_types() {
  assert_eq!(NewStringType::try_from(0i32), Ok(NewStringType::Normal));
  assert_eq!(NewStringType::try_from(1i32), Ok(NewStringType::Internalized));
  assert_eq!(
    NewStringType::try_from(9i32),
    Err(ShimError::UnknownStringType(9))
  );
}

#[test]
fn legacy_shape_matches_the_fallible_one() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  let s = JsString::new_from_utf8_legacy(&scope, b"hi\0", NewStringType::Normal, -1);
  assert!(!s.is_empty());
  assert_eq!(s.to_rust_string_lossy(&scope), "hi");

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn one_byte_and_two_byte_construction() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  let latin1 =
    JsString::new_from_one_byte(&scope, b"caf\xe9\0!", NewStringType::Normal, -1).to_local_checked();
  assert_eq!(latin1.to_rust_string_lossy(&scope), "café");
  assert_eq!(latin1.length(&scope), 4);
  assert_eq!(latin1.utf8_length(&scope), 5);

  let units: Vec<u16> = "π≈3".encode_utf16().collect();
  let utf16 = JsString::new_from_two_byte(&scope, &units, NewStringType::Normal, 2)
    .to_local_checked();
  assert_eq!(utf16.to_rust_string_lossy(&scope), "π≈");

  let lone = JsString::new_from_two_byte(&scope, &[0x61, 0xD800, 0], NewStringType::Normal, -1)
    .to_local_checked();
  assert_eq!(lone.length(&scope), 2);
  assert_eq!(lone.utf8_length(&scope), 4);
  assert_eq!(lone.to_rust_string_lossy(&scope), "a\u{fffd}");

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn concat_and_write_utf8() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);

  let left = JsString::new(&scope, "grüß ").to_local_checked();
  let right = JsString::new(&scope, "dich").to_local_checked();
  let joined = JsString::concat(&scope, left, right).to_local_checked();
  assert_eq!(joined.to_rust_string_lossy(&scope), "grüß dich");
  assert_eq!(joined.utf8_length(&scope), "grüß dich".len());

  let mut buf = [0u8; 4];
  // "grü" is 4 bytes; the next character does not fit.
  assert_eq!(joined.write_utf8(&scope, &mut buf), 4);
  assert_eq!(&buf, "grü".as_bytes());

  let mut small = [0u8; 3];
  // Never splits "ü" in half.
  assert_eq!(joined.write_utf8(&scope, &mut small), 2);
  assert_eq!(&small[..2], b"gr");

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn empty_local_only_supports_emptiness_and_equality() {
  let a: Local<JsString> = Local::empty();
  let b = Local::<JsString>::default();
  assert!(a.is_empty());
  assert_eq!(a, b);
}

proptest! {
  #[test]
  fn explicit_length_decodes_the_prefix(
    bytes in prop::collection::vec(any::<u8>(), 0..64),
    cut in any::<prop::sample::Index>(),
  ) {
    let len = cut.index(bytes.len() + 1);
    let isolate = Isolate::new(CreateParams::default()).unwrap();
    {
      let scope = HandleScope::new(&isolate);
      let expected = std::string::String::from_utf8_lossy(&bytes[..len]).into_owned();
      prop_assert_eq!(decode(&scope, &bytes, len as i32), expected);
    }
    isolate.dispose();
  }

  #[test]
  fn zero_terminated_decodes_up_to_the_terminator(
    prefix in prop::collection::vec(1u8..=255, 0..64),
    tail in prop::collection::vec(any::<u8>(), 0..16),
  ) {
    let mut bytes = prefix.clone();
    bytes.push(0);
    bytes.extend_from_slice(&tail);

    let isolate = Isolate::new(CreateParams::default()).unwrap();
    {
      let scope = HandleScope::new(&isolate);
      let expected = std::string::String::from_utf8_lossy(&prefix).into_owned();
      prop_assert_eq!(decode(&scope, &bytes, -1), expected);
    }
    isolate.dispose();
  }
}
