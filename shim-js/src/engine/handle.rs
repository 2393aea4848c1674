use core::fmt;

/// A stable identifier for an allocation in the engine [`Heap`](super::Heap).
///
/// This is a packed `{ index: u32, generation: u32 }`.
/// - `index` selects a slot in the heap's slot vector.
/// - `generation` is incremented each time that slot is freed.
///
/// A `HeapId` is **only valid** if the slot at `index` is occupied and its generation matches
/// this id's generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HeapId(pub(crate) u64);

impl HeapId {
  pub(crate) fn from_parts(index: u32, generation: u32) -> Self {
    Self((index as u64) | ((generation as u64) << 32))
  }

  #[inline]
  pub fn index(self) -> u32 {
    self.0 as u32
  }

  #[inline]
  pub fn generation(self) -> u32 {
    (self.0 >> 32) as u32
  }
}

impl fmt::Debug for HeapId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HeapId")
      .field("index", &self.index())
      .field("generation", &self.generation())
      .finish()
  }
}

/// A GC-managed engine string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct GcString(pub(crate) HeapId);

impl GcString {
  #[inline]
  pub fn id(self) -> HeapId {
    self.0
  }
}

/// A GC-managed engine object (ordinary object or array).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct GcObject(pub(crate) HeapId);

impl GcObject {
  #[inline]
  pub fn id(self) -> HeapId {
    self.0
  }
}

/// An ID for a persistent root stored in the heap.
///
/// Returned by [`Heap::add_root`](super::Heap::add_root) and later passed to
/// [`Heap::remove_root`](super::Heap::remove_root).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct RootId(pub(crate) u32);

impl RootId {
  /// The underlying index into the heap's persistent root table.
  #[inline]
  pub fn index(self) -> u32 {
    self.0
  }
}
