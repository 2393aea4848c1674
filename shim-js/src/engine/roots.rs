//! The rooting stack walked by the collector.
//!
//! Every value reachable from a live handle sits in exactly one slot of this stack. Slots are
//! grouped into frames that are pushed and popped in strict LIFO order; popping a frame releases
//! every slot created while it was on top.
//!
//! Slots are identified by [`SlotRef`] `{ stack, index, generation }`. The per-index generation
//! counter is bumped each time the slot is released, so a reference that outlives its frame is
//! detected even after the index has been reused by a later frame. The stack id catches references
//! handed to a different stack (and so a different isolate).

use super::Value;
use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide identity of a [`RootStack`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StackId(u64);

impl StackId {
  fn next() -> Self {
    Self(NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed))
  }
}

/// A reference to a rooted slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
  stack: StackId,
  index: u32,
  generation: u32,
}

impl SlotRef {
  /// The stack the slot belongs to.
  #[inline]
  pub fn stack(self) -> StackId {
    self.stack
  }

  #[inline]
  pub fn index(self) -> u32 {
    self.index
  }

  #[inline]
  pub fn generation(self) -> u32 {
    self.generation
  }
}

impl fmt::Debug for SlotRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SlotRef")
      .field("stack", &self.stack.0)
      .field("index", &self.index)
      .field("generation", &self.generation)
      .finish()
  }
}

/// Identity of a pushed frame.
///
/// Ids are never reused within one stack, so a stale id cannot accidentally match a newer frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FrameId(u64);

#[derive(Debug)]
struct Frame {
  id: FrameId,
  base: usize,
}

#[derive(Debug)]
pub struct RootStack {
  id: StackId,
  values: Vec<Value>,
  // Never shrinks; indexed by slot index.
  generations: Vec<u32>,
  frames: Vec<Frame>,
  next_frame_id: u64,
}

impl Default for RootStack {
  fn default() -> Self {
    Self {
      id: StackId::next(),
      values: Vec::new(),
      generations: Vec::new(),
      frames: Vec::new(),
      next_frame_id: 0,
    }
  }
}

impl RootStack {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn id(&self) -> StackId {
    self.id
  }

  /// Returns `true` if `slot` was created by this stack, live or not.
  pub fn owns(&self, slot: SlotRef) -> bool {
    slot.stack == self.id
  }

  /// Number of open frames.
  pub fn depth(&self) -> usize {
    self.frames.len()
  }

  /// Number of live slots across all frames.
  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// The innermost frame, if any.
  pub fn top(&self) -> Option<FrameId> {
    self.frames.last().map(|frame| frame.id)
  }

  /// All currently rooted values, outermost frame first.
  pub fn values(&self) -> &[Value] {
    &self.values
  }

  pub fn push_frame(&mut self) -> FrameId {
    let id = FrameId(self.next_frame_id);
    self.next_frame_id += 1;
    self.frames.push(Frame {
      id,
      base: self.values.len(),
    });
    id
  }

  /// Pops frame `id`, releasing every slot it owns.
  ///
  /// `id` must be the innermost frame. Checked builds panic otherwise; release builds also unwind
  /// every frame entered after `id`.
  pub fn pop_frame(&mut self, id: FrameId) {
    let Some(pos) = self.frames.iter().rposition(|frame| frame.id == id) else {
      debug_assert!(false, "HandleScope exited twice: {id:?}");
      return;
    };
    debug_assert!(
      pos + 1 == self.frames.len(),
      "HandleScope exited out of order: {} later scope(s) still open",
      self.frames.len() - pos - 1
    );
    let base = self.frames[pos].base;
    self.frames.truncate(pos);
    self.release_from(base);
  }

  /// Registers `value` in frame `frame`, which must be the innermost frame.
  pub fn root(&mut self, frame: FrameId, value: Value) -> SlotRef {
    debug_assert_eq!(
      self.top(),
      Some(frame),
      "handles can only be created in the innermost HandleScope"
    );
    let index = self.values.len();
    self.values.push(value);
    if self.generations.len() <= index {
      self.generations.push(0);
    }
    SlotRef {
      stack: self.id,
      index: index as u32,
      generation: self.generations[index],
    }
  }

  /// Returns the value held by `slot`, or `None` if the slot was released.
  pub fn get(&self, slot: SlotRef) -> Option<Value> {
    let idx = self.validate(slot)?;
    Some(self.values[idx])
  }

  /// Overwrites the value held by `slot`. Returns `false` if the slot was released.
  pub fn set(&mut self, slot: SlotRef, value: Value) -> bool {
    match self.validate(slot) {
      Some(idx) => {
        self.values[idx] = value;
        true
      }
      None => false,
    }
  }

  pub fn is_valid(&self, slot: SlotRef) -> bool {
    self.validate(slot).is_some()
  }

  fn validate(&self, slot: SlotRef) -> Option<usize> {
    if !self.owns(slot) {
      return None;
    }
    let idx = slot.index as usize;
    if idx >= self.values.len() {
      return None;
    }
    if self.generations[idx] != slot.generation {
      return None;
    }
    Some(idx)
  }

  fn release_from(&mut self, base: usize) {
    for generation in &mut self.generations[base..self.values.len()] {
      *generation = generation.wrapping_add(1);
    }
    self.values.truncate(base);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn popping_a_frame_releases_its_slots() {
    let mut stack = RootStack::new();
    let outer = stack.push_frame();
    let kept = stack.root(outer, Value::Number(1.0));

    let inner = stack.push_frame();
    let dropped = stack.root(inner, Value::Number(2.0));
    assert_eq!(stack.len(), 2);
    stack.pop_frame(inner);

    assert_eq!(stack.get(kept), Some(Value::Number(1.0)));
    assert_eq!(stack.get(dropped), None);
    assert_eq!(stack.depth(), 1);
    stack.pop_frame(outer);
    assert!(stack.is_empty());
  }

  #[test]
  fn reused_index_gets_new_generation() {
    let mut stack = RootStack::new();
    let first_frame = stack.push_frame();
    let first = stack.root(first_frame, Value::Bool(true));
    stack.pop_frame(first_frame);

    let second_frame = stack.push_frame();
    let second = stack.root(second_frame, Value::Bool(false));

    assert_eq!(first.index(), second.index());
    assert_ne!(first.generation(), second.generation());
    assert_eq!(stack.get(first), None);
    assert_eq!(stack.get(second), Some(Value::Bool(false)));
    stack.pop_frame(second_frame);
  }

  #[test]
  fn set_ignores_released_slots() {
    let mut stack = RootStack::new();
    let frame = stack.push_frame();
    let slot = stack.root(frame, Value::Undefined);
    assert!(stack.set(slot, Value::Null));
    assert_eq!(stack.get(slot), Some(Value::Null));
    stack.pop_frame(frame);
    assert!(!stack.set(slot, Value::Bool(true)));
  }

  #[test]
  fn slots_of_another_stack_are_not_readable() {
    let mut a = RootStack::new();
    let mut b = RootStack::new();
    let frame_a = a.push_frame();
    let frame_b = b.push_frame();
    let slot_a = a.root(frame_a, Value::Number(1.0));
    let slot_b = b.root(frame_b, Value::Number(2.0));

    // Same index and generation, different stacks.
    assert_eq!(slot_a.index(), slot_b.index());
    assert_ne!(slot_a, slot_b);
    assert!(!b.owns(slot_a));
    assert_eq!(b.get(slot_a), None);
    assert!(!b.set(slot_a, Value::Null));
    assert_eq!(b.get(slot_b), Some(Value::Number(2.0)));
  }

  #[test]
  #[cfg(debug_assertions)]
  #[should_panic(expected = "exited out of order")]
  fn out_of_order_pop_is_rejected() {
    let mut stack = RootStack::new();
    let a = stack.push_frame();
    let _b = stack.push_frame();
    stack.pop_frame(a);
  }

  #[test]
  #[cfg(not(debug_assertions))]
  fn out_of_order_pop_unwinds_later_frames() {
    let mut stack = RootStack::new();
    let a = stack.push_frame();
    let b = stack.push_frame();
    let slot = stack.root(b, Value::Null);
    stack.pop_frame(a);
    assert_eq!(stack.depth(), 0);
    assert_eq!(stack.get(slot), None);
  }

  #[test]
  #[cfg(debug_assertions)]
  #[should_panic(expected = "innermost HandleScope")]
  fn rooting_into_outer_frame_is_rejected() {
    let mut stack = RootStack::new();
    let outer = stack.push_frame();
    let _inner = stack.push_frame();
    stack.root(outer, Value::Null);
  }
}
