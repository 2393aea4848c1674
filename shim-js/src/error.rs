/// Errors produced by the engine and the bridge.
///
/// Only construction of an [`Isolate`](crate::Isolate) and raw engine calls surface these
/// directly. Bridge operations convert [`ShimError::OutOfMemory`] into an empty
/// [`MaybeLocal`](crate::MaybeLocal) / [`Maybe`](crate::Maybe) at the point of allocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShimError {
  /// The heap has exceeded its configured memory limit, or the host allocator refused a backing
  /// buffer.
  #[error("out of memory")]
  OutOfMemory,

  /// A GC id was used after the underlying allocation was freed (or the id is otherwise
  /// malformed).
  #[error("invalid handle")]
  InvalidHandle,

  /// Heap limits whose GC threshold lies above the hard memory limit.
  #[error("invalid heap limits: gc_threshold {gc_threshold} exceeds max_bytes {max_bytes}")]
  InvalidHeapLimits {
    max_bytes: usize,
    gc_threshold: usize,
  },

  /// A raw string construction mode id that maps to no [`NewStringType`](crate::NewStringType).
  #[error("unknown string construction mode {0}")]
  UnknownStringType(i32),
}
