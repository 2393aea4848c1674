use crate::error::ShimError;
use std::fmt;

/// The engine's string payload.
///
/// Strings are sequences of UTF-16 code units and may contain unpaired surrogates.
#[derive(Clone, PartialEq, Eq)]
pub struct JsString {
  units: Box<[u16]>,
}

impl JsString {
  /// Collects exactly `len` code units into a fallibly allocated buffer.
  pub(crate) fn try_collect(
    len: usize,
    units: impl IntoIterator<Item = u16>,
  ) -> Result<Self, ShimError> {
    let mut buf: Vec<u16> = Vec::new();
    buf
      .try_reserve_exact(len)
      .map_err(|_| ShimError::OutOfMemory)?;
    buf.extend(units.into_iter().take(len));
    debug_assert_eq!(buf.len(), len);
    Ok(Self::from_u16_vec(buf))
  }

  fn from_u16_vec(units: Vec<u16>) -> Self {
    Self {
      units: units.into_boxed_slice(),
    }
  }

  pub fn len_code_units(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  pub fn as_code_units(&self) -> &[u16] {
    self.units.as_ref()
  }

  pub fn to_utf8_lossy(&self) -> String {
    String::from_utf16_lossy(self.as_code_units())
  }

  /// Number of bytes in the UTF-8 encoding, with lone surrogates encoded as U+FFFD.
  pub fn utf8_len(&self) -> usize {
    char::decode_utf16(self.units.iter().copied())
      .map(|c| c.map_or(3, char::len_utf8))
      .sum()
  }

  pub(crate) fn heap_size_bytes(&self) -> usize {
    Self::heap_size_bytes_for_len(self.units.len())
  }

  pub(crate) fn heap_size_bytes_for_len(units_len: usize) -> usize {
    // Headers live inline in the slot table; only the UTF-16 payload is accounted.
    units_len.checked_mul(2).unwrap_or(usize::MAX)
  }
}

impl fmt::Debug for JsString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("JsString")
      .field("len_code_units", &self.len_code_units())
      .field("utf8_lossy", &self.to_utf8_lossy())
      .finish()
  }
}
