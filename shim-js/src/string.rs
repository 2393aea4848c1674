use crate::data::String;
use crate::engine::{Context, FrameId, GcString, Value};
use crate::error::ShimError;
use crate::local::Local;
use crate::maybe::MaybeLocal;
use crate::scope::HandleScope;

/// How a new string is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NewStringType {
  /// A fresh string on every call.
  Normal,
  /// A deduplicated string from the string table. Not supported yet.
  Internalized,
}

impl TryFrom<i32> for NewStringType {
  type Error = ShimError;

  fn try_from(raw: i32) -> Result<Self, ShimError> {
    match raw {
      0 => Ok(Self::Normal),
      1 => Ok(Self::Internalized),
      other => Err(ShimError::UnknownStringType(other)),
    }
  }
}

/// Panics for modes the bridge does not implement.
///
/// Interning needs a string table owned by the context. Add the `Internalized` arm here once the
/// context has one.
#[track_caller]
fn check_mode(mode: NewStringType) {
  match mode {
    NewStringType::Normal => {}
    NewStringType::Internalized => {
      panic!("unsupported string construction mode: internalized strings are not supported")
    }
  }
}

/// Allocates with `alloc` and roots the result in `frame` before anything else can allocate.
///
/// Allocation failure yields an empty result; nothing is rooted in that case.
fn alloc_rooted(
  scope: &HandleScope<'_>,
  alloc: impl FnOnce(&mut Context) -> Result<GcString, ShimError>,
) -> MaybeLocal<String> {
  scope.with_context(|cx, frame: FrameId| match alloc(cx) {
    Ok(s) => Local::from_slot(cx.root(frame, Value::String(s))).into(),
    Err(err) => {
      tracing::debug!(%err, "string construction failed");
      MaybeLocal::empty()
    }
  })
}

/// Resolves a foreign-API length argument: `None` means "up to the terminator".
#[track_caller]
fn checked_length(length: i32, available: usize) -> Option<usize> {
  let length = usize::try_from(length).ok()?;
  assert!(
    length <= available,
    "length {length} exceeds the {available} element(s) of the buffer"
  );
  Some(length)
}

impl String {
  /// Creates a string from UTF-8 `data`.
  ///
  /// With `length >= 0` exactly `length` bytes are copied; with a negative `length` the bytes up
  /// to the first zero byte (or the end of `data`) are copied. Malformed UTF-8 is replaced by the
  /// engine's decoder.
  ///
  /// Returns an empty result if the engine cannot allocate the string. That failure does not
  /// touch the isolate's pending exception.
  ///
  /// # Panics
  ///
  /// If `mode` is [`NewStringType::Internalized`], or `length` exceeds `data.len()`.
  #[track_caller]
  pub fn new_from_utf8(
    scope: &HandleScope<'_>,
    data: &[u8],
    mode: NewStringType,
    length: i32,
  ) -> MaybeLocal<String> {
    check_mode(mode);
    match checked_length(length, data.len()) {
      Some(length) => alloc_rooted(scope, |cx| cx.new_string_copy_n(&data[..length])),
      None => alloc_rooted(scope, |cx| cx.new_string_copy_z(data)),
    }
  }

  /// The legacy non-fallible shape of [`String::new_from_utf8`].
  ///
  /// Allocation failure is reported as an empty handle, so the cause is lost.
  #[track_caller]
  pub fn new_from_utf8_legacy(
    scope: &HandleScope<'_>,
    data: &[u8],
    mode: NewStringType,
    length: i32,
  ) -> Local<String> {
    Self::new_from_utf8(scope, data, mode, length).from_maybe(Local::empty())
  }

  pub fn new(scope: &HandleScope<'_>, value: &str) -> MaybeLocal<String> {
    alloc_rooted(scope, |cx| cx.new_string_copy_n(value.as_bytes()))
  }

  /// Creates a string from Latin-1 `data`. `length` follows [`String::new_from_utf8`].
  #[track_caller]
  pub fn new_from_one_byte(
    scope: &HandleScope<'_>,
    data: &[u8],
    mode: NewStringType,
    length: i32,
  ) -> MaybeLocal<String> {
    check_mode(mode);
    let end = checked_length(length, data.len())
      .unwrap_or_else(|| data.iter().position(|&b| b == 0).unwrap_or(data.len()));
    alloc_rooted(scope, |cx| {
      cx.heap_mut().alloc_string_from_latin1(&data[..end])
    })
  }

  /// Creates a string from UTF-16 `data`. A negative `length` stops at the first zero code unit.
  #[track_caller]
  pub fn new_from_two_byte(
    scope: &HandleScope<'_>,
    data: &[u16],
    mode: NewStringType,
    length: i32,
  ) -> MaybeLocal<String> {
    check_mode(mode);
    let end = checked_length(length, data.len())
      .unwrap_or_else(|| data.iter().position(|&u| u == 0).unwrap_or(data.len()));
    alloc_rooted(scope, |cx| {
      cx.heap_mut().alloc_string_from_code_units(&data[..end])
    })
  }

  /// The context's canonical empty string. Never allocates.
  pub fn empty(scope: &HandleScope<'_>) -> Local<String> {
    scope.with_context(|cx, frame| {
      let empty = cx.empty_string();
      Local::from_slot(cx.root(frame, Value::String(empty)))
    })
  }

  /// Creates `left + right`.
  #[track_caller]
  pub fn concat(
    scope: &HandleScope<'_>,
    left: Local<String>,
    right: Local<String>,
  ) -> MaybeLocal<String> {
    alloc_rooted(scope, |cx| {
      let (Value::String(left), Value::String(right)) = (left.resolve(cx), right.resolve(cx))
      else {
        return Err(ShimError::InvalidHandle);
      };
      cx.heap_mut().alloc_string_concat(left, right)
    })
  }
}

impl Local<String> {
  fn with_string<R>(
    self,
    scope: &HandleScope<'_>,
    f: impl FnOnce(&crate::engine::JsString) -> R,
  ) -> R {
    scope.with_context(|cx, _| {
      let Value::String(s) = self.resolve(cx) else {
        unreachable!("Local<String> rooted a non-string value");
      };
      match cx.heap().get_string(s) {
        Ok(s) => f(s),
        Err(_) => unreachable!("rooted string was collected"),
      }
    })
  }

  /// Length in UTF-16 code units.
  #[track_caller]
  pub fn length(self, scope: &HandleScope<'_>) -> usize {
    self.with_string(scope, |s| s.len_code_units())
  }

  /// Length of the UTF-8 encoding in bytes.
  #[track_caller]
  pub fn utf8_length(self, scope: &HandleScope<'_>) -> usize {
    self.with_string(scope, |s| s.utf8_len())
  }

  /// Writes as many whole characters as fit into `buffer` as UTF-8 and returns the number of
  /// bytes written. No terminator is appended.
  #[track_caller]
  pub fn write_utf8(self, scope: &HandleScope<'_>, buffer: &mut [u8]) -> usize {
    self.with_string(scope, |s| {
      let mut written = 0;
      for c in char::decode_utf16(s.as_code_units().iter().copied()) {
        let c = c.unwrap_or(char::REPLACEMENT_CHARACTER);
        let len = c.len_utf8();
        if written + len > buffer.len() {
          break;
        }
        c.encode_utf8(&mut buffer[written..]);
        written += len;
      }
      written
    })
  }

  /// Decodes the string, replacing lone surrogates with U+FFFD.
  #[track_caller]
  pub fn to_rust_string_lossy(self, scope: &HandleScope<'_>) -> std::string::String {
    self.with_string(scope, |s| s.to_utf8_lossy())
  }
}
