use super::roots::RootStack;
use super::string::JsString;
use super::{GcObject, GcString, HeapId, RootId, Value};
use crate::error::ShimError;
use core::mem;
use serde::{Deserialize, Serialize};

/// Heap configuration and memory limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapLimits {
  /// Hard memory limit for live heap allocations, in bytes.
  pub max_bytes: usize,
  /// When an allocation would cause `used_bytes` to exceed this threshold, the heap will trigger a
  /// GC cycle before attempting the allocation.
  pub gc_threshold: usize,
}

impl HeapLimits {
  pub fn new(max_bytes: usize, gc_threshold: usize) -> Self {
    Self {
      max_bytes,
      gc_threshold,
    }
  }

  /// Checks that a collection can run before the hard limit is reached.
  pub fn validate(self) -> Result<Self, ShimError> {
    if self.gc_threshold > self.max_bytes {
      return Err(ShimError::InvalidHeapLimits {
        max_bytes: self.max_bytes,
        gc_threshold: self.gc_threshold,
      });
    }
    Ok(self)
  }
}

impl Default for HeapLimits {
  fn default() -> Self {
    Self::new(64 * 1024 * 1024, 16 * 1024 * 1024)
  }
}

/// The class of an engine object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
  Ordinary,
  Array,
}

/// A property key: either a string or an array index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
  String(GcString),
  Index(u32),
}

/// A non-moving, precise mark/sweep heap.
///
/// Objects live in a `Vec` of slots addressed by [`HeapId`] `{ index, generation }`. The collector
/// only knows about values reachable from the rooting stack and the persistent root table, so any
/// value held by the host must be registered in one of them before the next allocation.
pub struct Heap {
  limits: HeapLimits,

  /// Bytes used by live allocations.
  used_bytes: usize,
  gc_runs: u64,

  slots: Vec<Slot>,
  marks: Vec<u8>,
  free_list: Vec<u32>,

  // Root sets.
  root_stack: RootStack,
  persistent_roots: Vec<Option<Value>>,
  persistent_roots_free: Vec<u32>,
}

impl Heap {
  pub fn new(limits: HeapLimits) -> Self {
    debug_assert!(
      limits.gc_threshold <= limits.max_bytes,
      "gc_threshold should be <= max_bytes"
    );

    Self {
      limits,
      used_bytes: 0,
      gc_runs: 0,
      slots: Vec::new(),
      marks: Vec::new(),
      free_list: Vec::new(),
      root_stack: RootStack::new(),
      persistent_roots: Vec::new(),
      persistent_roots_free: Vec::new(),
    }
  }

  pub fn limits(&self) -> HeapLimits {
    self.limits
  }

  /// Bytes currently used by live heap allocations.
  pub fn used_bytes(&self) -> usize {
    self.used_bytes
  }

  /// Total number of GC cycles that have run.
  pub fn gc_runs(&self) -> u64 {
    self.gc_runs
  }

  /// Number of occupied slots.
  pub fn live_allocations(&self) -> usize {
    self.slots.len() - self.free_list.len()
  }

  pub fn root_stack(&self) -> &RootStack {
    &self.root_stack
  }

  pub fn root_stack_mut(&mut self) -> &mut RootStack {
    &mut self.root_stack
  }

  #[cfg(debug_assertions)]
  fn debug_assert_used_bytes_is_correct(&self) {
    let recomputed = self
      .slots
      .iter()
      .filter(|slot| slot.value.is_some())
      .fold(0usize, |acc, slot| acc.saturating_add(slot.bytes));
    debug_assert_eq!(
      self.used_bytes, recomputed,
      "Heap::used_bytes mismatch: used_bytes={}, recomputed={}",
      self.used_bytes, recomputed
    );
  }

  /// Explicitly runs a GC cycle.
  pub fn collect_garbage(&mut self) {
    self.gc_runs += 1;

    // Mark.
    {
      debug_assert_eq!(self.slots.len(), self.marks.len());

      let mut tracer = Tracer::new(&self.slots, &mut self.marks[..]);
      for value in self.root_stack.values() {
        tracer.trace_value(*value);
      }
      for value in self.persistent_roots.iter().flatten() {
        tracer.trace_value(*value);
      }

      while let Some(id) = tracer.pop_work() {
        let Some(idx) = tracer.validate(id) else {
          continue;
        };
        if tracer.marks[idx] != 0 {
          continue;
        }
        tracer.marks[idx] = 1;

        let Some(obj) = tracer.slots[idx].value.as_ref() else {
          debug_assert!(false, "validated heap id points to a free slot: {id:?}");
          continue;
        };
        obj.trace(&mut tracer);
      }
    }

    // Sweep.
    let mut freed = 0usize;
    for (idx, slot) in self.slots.iter_mut().enumerate() {
      let marked = self.marks[idx] != 0;
      self.marks[idx] = 0;

      if slot.value.is_none() {
        debug_assert!(!marked);
        continue;
      }
      if marked {
        continue;
      }

      self.used_bytes = self.used_bytes.saturating_sub(slot.bytes);
      slot.value = None;
      slot.bytes = 0;
      slot.generation = slot.generation.wrapping_add(1);
      self.free_list.push(idx as u32);
      freed += 1;
    }

    tracing::trace!(
      gc_runs = self.gc_runs,
      freed,
      used_bytes = self.used_bytes,
      "gc cycle finished"
    );

    #[cfg(debug_assertions)]
    self.debug_assert_used_bytes_is_correct();
  }

  /// Adds a persistent root, keeping `value` live until the returned [`RootId`] is removed.
  pub fn add_root(&mut self, value: Value) -> RootId {
    // Root sets should not contain stale handles; detect issues early in debug builds.
    debug_assert!(self.is_valid_or_primitive(value));

    let idx = match self.persistent_roots_free.pop() {
      Some(idx) => idx as usize,
      None => {
        self.persistent_roots.push(None);
        self.persistent_roots.len() - 1
      }
    };
    debug_assert!(self.persistent_roots[idx].is_none());
    self.persistent_roots[idx] = Some(value);
    RootId(idx as u32)
  }

  /// Returns the current value of a persistent root.
  pub fn get_root(&self, id: RootId) -> Option<Value> {
    self
      .persistent_roots
      .get(id.0 as usize)
      .and_then(|slot| *slot)
  }

  /// Removes a persistent root previously created by [`Heap::add_root`].
  pub fn remove_root(&mut self, id: RootId) {
    let idx = id.0 as usize;
    debug_assert!(idx < self.persistent_roots.len(), "invalid RootId");
    if idx >= self.persistent_roots.len() {
      return;
    }
    debug_assert!(
      self.persistent_roots[idx].is_some(),
      "RootId already removed"
    );
    if self.persistent_roots[idx].take().is_some() {
      self.persistent_roots_free.push(id.0);
    }
  }

  /// Number of persistent roots currently registered.
  pub fn persistent_root_count(&self) -> usize {
    self.persistent_roots.len() - self.persistent_roots_free.len()
  }

  pub fn is_valid_string(&self, s: GcString) -> bool {
    matches!(self.get_heap_object(s.0), Ok(HeapObject::String(_)))
  }

  pub fn is_valid_object(&self, obj: GcObject) -> bool {
    matches!(self.get_heap_object(obj.0), Ok(HeapObject::Object(_)))
  }

  /// Returns `true` if `value` is a primitive or a live heap value.
  pub fn is_valid_or_primitive(&self, value: Value) -> bool {
    match value {
      Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) => true,
      Value::String(s) => self.is_valid_string(s),
      Value::Object(o) => self.is_valid_object(o),
    }
  }

  /// Gets the string contents for `s`.
  pub fn get_string(&self, s: GcString) -> Result<&JsString, ShimError> {
    match self.get_heap_object(s.0)? {
      HeapObject::String(s) => Ok(s),
      _ => Err(ShimError::InvalidHandle),
    }
  }

  pub fn object_kind(&self, obj: GcObject) -> Result<ObjectKind, ShimError> {
    Ok(self.get_object(obj)?.kind)
  }

  /// Number of elements in an array object.
  pub fn array_length(&self, obj: GcObject) -> Result<u32, ShimError> {
    let obj = self.get_object(obj)?;
    match obj.kind {
      ObjectKind::Array => Ok(obj.elements.len() as u32),
      ObjectKind::Ordinary => Err(ShimError::InvalidHandle),
    }
  }

  /// Allocates a string decoded from UTF-8 bytes (malformed sequences become U+FFFD).
  pub fn alloc_string_from_utf8(&mut self, bytes: &[u8]) -> Result<GcString, ShimError> {
    let decoded = String::from_utf8_lossy(bytes);
    let units_len = decoded.encode_utf16().count();
    self.alloc_string_with(units_len, || decoded.encode_utf16())
  }

  /// Allocates a string whose code units are the Latin-1 `bytes`.
  pub fn alloc_string_from_latin1(&mut self, bytes: &[u8]) -> Result<GcString, ShimError> {
    self.alloc_string_with(bytes.len(), || bytes.iter().map(|&b| b as u16))
  }

  pub fn alloc_string_from_code_units(&mut self, units: &[u16]) -> Result<GcString, ShimError> {
    self.alloc_string_with(units.len(), || units.iter().copied())
  }

  /// Allocates `left + right`.
  ///
  /// Both operands must be rooted by the caller: making room for the result may run a GC cycle.
  pub fn alloc_string_concat(
    &mut self,
    left: GcString,
    right: GcString,
  ) -> Result<GcString, ShimError> {
    let units_len = self
      .get_string(left)?
      .len_code_units()
      .saturating_add(self.get_string(right)?.len_code_units());
    self.ensure_can_allocate(JsString::heap_size_bytes_for_len(units_len))?;

    let left = self.get_string(left)?.as_code_units();
    let right = self.get_string(right)?.as_code_units();
    let js = JsString::try_collect(units_len, left.iter().chain(right).copied())?;
    let new_bytes = js.heap_size_bytes();
    Ok(GcString(
      self.alloc_unchecked(HeapObject::String(js), new_bytes),
    ))
  }

  fn alloc_string_with<I>(
    &mut self,
    units_len: usize,
    units: impl FnOnce() -> I,
  ) -> Result<GcString, ShimError>
  where
    I: Iterator<Item = u16>,
  {
    let new_bytes = JsString::heap_size_bytes_for_len(units_len);
    self.ensure_can_allocate(new_bytes)?;

    let js = JsString::try_collect(units_len, units())?;
    debug_assert_eq!(new_bytes, js.heap_size_bytes());
    Ok(GcString(
      self.alloc_unchecked(HeapObject::String(js), new_bytes),
    ))
  }

  /// Allocates an empty object of the given kind. Arrays start with `length` holes.
  pub fn alloc_object(&mut self, kind: ObjectKind, length: usize) -> Result<GcObject, ShimError> {
    let new_bytes = JsObject::heap_size_bytes_for_counts(0, length);
    self.ensure_can_allocate(new_bytes)?;

    let mut elements: Vec<Option<Value>> = Vec::new();
    elements
      .try_reserve_exact(length)
      .map_err(|_| ShimError::OutOfMemory)?;
    elements.resize(length, None);

    let obj = JsObject {
      kind,
      properties: Vec::new(),
      elements,
    };
    Ok(GcObject(
      self.alloc_unchecked(HeapObject::Object(obj), new_bytes),
    ))
  }

  /// Looks up an own property. Missing properties and array holes read as `None`.
  pub fn get_property(&self, obj: GcObject, key: PropertyKey) -> Result<Option<Value>, ShimError> {
    let object = self.get_object(obj)?;
    if let (ObjectKind::Array, PropertyKey::Index(index)) = (object.kind, key) {
      return Ok(object.elements.get(index as usize).copied().flatten());
    }
    let pos = self.find_property(object, key)?;
    Ok(pos.map(|pos| object.properties[pos].value))
  }

  pub fn has_property(&self, obj: GcObject, key: PropertyKey) -> Result<bool, ShimError> {
    Ok(self.get_property(obj, key)?.is_some())
  }

  /// Creates or overwrites an own data property.
  ///
  /// `key` and `value` must be rooted by the caller: growing the object may run a GC cycle.
  pub fn set_property(
    &mut self,
    obj: GcObject,
    key: PropertyKey,
    value: Value,
  ) -> Result<(), ShimError> {
    debug_assert!(self.is_valid_or_primitive(value));

    let object = self.get_object(obj)?;
    if let (ObjectKind::Array, PropertyKey::Index(index)) = (object.kind, key) {
      return self.set_element(obj, index as usize, value);
    }
    if let Some(pos) = self.find_property(object, key)? {
      self.get_object_mut(obj)?.properties[pos].value = value;
      return Ok(());
    }

    let (property_count, element_count) = (object.properties.len(), object.elements.len());
    let new_bytes = JsObject::heap_size_bytes_for_counts(property_count + 1, element_count);
    self.ensure_can_allocate_growth(obj.0, new_bytes)?;

    let properties = &mut self.get_object_mut(obj)?.properties;
    properties
      .try_reserve(1)
      .map_err(|_| ShimError::OutOfMemory)?;
    properties.push(PropertyEntry { key, value });
    self.update_slot_bytes(obj.0, new_bytes);
    Ok(())
  }

  /// Removes an own property. Returns `true` if it existed.
  pub fn delete_property(&mut self, obj: GcObject, key: PropertyKey) -> Result<bool, ShimError> {
    let object = self.get_object(obj)?;
    if let (ObjectKind::Array, PropertyKey::Index(index)) = (object.kind, key) {
      // Deleting an element leaves a hole; the length is unchanged.
      let index = index as usize;
      if index >= object.elements.len() {
        return Ok(false);
      }
      return Ok(self.get_object_mut(obj)?.elements[index].take().is_some());
    }
    let Some(pos) = self.find_property(object, key)? else {
      return Ok(false);
    };
    let (property_count, element_count) = (object.properties.len(), object.elements.len());
    self.get_object_mut(obj)?.properties.remove(pos);
    self.update_slot_bytes(
      obj.0,
      JsObject::heap_size_bytes_for_counts(property_count - 1, element_count),
    );
    Ok(true)
  }

  fn set_element(&mut self, obj: GcObject, index: usize, value: Value) -> Result<(), ShimError> {
    let object = self.get_object(obj)?;
    if index < object.elements.len() {
      self.get_object_mut(obj)?.elements[index] = Some(value);
      return Ok(());
    }

    let new_len = index.checked_add(1).ok_or(ShimError::OutOfMemory)?;
    let new_bytes = JsObject::heap_size_bytes_for_counts(object.properties.len(), new_len);
    self.ensure_can_allocate_growth(obj.0, new_bytes)?;

    let elements = &mut self.get_object_mut(obj)?.elements;
    elements
      .try_reserve_exact(new_len - elements.len())
      .map_err(|_| ShimError::OutOfMemory)?;
    elements.resize(new_len, None);
    elements[index] = Some(value);
    self.update_slot_bytes(obj.0, new_bytes);
    Ok(())
  }

  fn find_property(&self, object: &JsObject, key: PropertyKey) -> Result<Option<usize>, ShimError> {
    match key {
      PropertyKey::Index(_) => Ok(object.properties.iter().position(|entry| entry.key == key)),
      PropertyKey::String(name) => {
        let name = self.get_string(name)?.as_code_units();
        for (pos, entry) in object.properties.iter().enumerate() {
          let PropertyKey::String(existing) = entry.key else {
            continue;
          };
          if self.get_string(existing)?.as_code_units() == name {
            return Ok(Some(pos));
          }
        }
        Ok(None)
      }
    }
  }

  fn get_object(&self, obj: GcObject) -> Result<&JsObject, ShimError> {
    match self.get_heap_object(obj.0)? {
      HeapObject::Object(o) => Ok(o),
      _ => Err(ShimError::InvalidHandle),
    }
  }

  fn get_object_mut(&mut self, obj: GcObject) -> Result<&mut JsObject, ShimError> {
    match self.get_heap_object_mut(obj.0)? {
      HeapObject::Object(o) => Ok(o),
      _ => Err(ShimError::InvalidHandle),
    }
  }

  fn get_heap_object(&self, id: HeapId) -> Result<&HeapObject, ShimError> {
    let idx = self.validate(id).ok_or(ShimError::InvalidHandle)?;
    self.slots[idx].value.as_ref().ok_or(ShimError::InvalidHandle)
  }

  fn get_heap_object_mut(&mut self, id: HeapId) -> Result<&mut HeapObject, ShimError> {
    let idx = self.validate(id).ok_or(ShimError::InvalidHandle)?;
    self.slots[idx].value.as_mut().ok_or(ShimError::InvalidHandle)
  }

  fn validate(&self, id: HeapId) -> Option<usize> {
    let idx = id.index() as usize;
    let slot = self.slots.get(idx)?;
    if slot.generation != id.generation() {
      return None;
    }
    if slot.value.is_none() {
      return None;
    }
    Some(idx)
  }

  fn ensure_can_allocate(&mut self, new_bytes: usize) -> Result<(), ShimError> {
    let after = self.used_bytes.saturating_add(new_bytes);
    if after > self.limits.gc_threshold {
      self.collect_garbage();
    }

    let after = self.used_bytes.saturating_add(new_bytes);
    if after > self.limits.max_bytes {
      tracing::debug!(
        requested = new_bytes,
        used_bytes = self.used_bytes,
        max_bytes = self.limits.max_bytes,
        "heap allocation refused"
      );
      return Err(ShimError::OutOfMemory);
    }
    Ok(())
  }

  /// Like [`Heap::ensure_can_allocate`] for an existing allocation growing to `new_bytes`.
  fn ensure_can_allocate_growth(&mut self, id: HeapId, new_bytes: usize) -> Result<(), ShimError> {
    let idx = self.validate(id).ok_or(ShimError::InvalidHandle)?;
    let delta = new_bytes.saturating_sub(self.slots[idx].bytes);
    self.ensure_can_allocate(delta)?;
    // The object itself is rooted by the caller, so a collection cannot have freed it.
    self.validate(id).ok_or(ShimError::InvalidHandle)?;
    Ok(())
  }

  fn update_slot_bytes(&mut self, id: HeapId, new_bytes: usize) {
    let Some(idx) = self.validate(id) else {
      debug_assert!(false, "updating bytes of a free slot: {id:?}");
      return;
    };
    let slot = &mut self.slots[idx];
    let old_bytes = slot.bytes;

    if new_bytes >= old_bytes {
      self.used_bytes = self.used_bytes.saturating_add(new_bytes - old_bytes);
    } else {
      self.used_bytes = self.used_bytes.saturating_sub(old_bytes - new_bytes);
    }

    slot.bytes = new_bytes;
  }

  fn alloc_unchecked(&mut self, obj: HeapObject, new_bytes: usize) -> HeapId {
    let idx = match self.free_list.pop() {
      Some(idx) => idx as usize,
      None => {
        let idx = self.slots.len();
        self.slots.push(Slot::new());
        self.marks.push(0);
        idx
      }
    };

    let slot = &mut self.slots[idx];
    debug_assert!(slot.value.is_none(), "free list returned an occupied slot");

    slot.value = Some(obj);
    slot.bytes = new_bytes;
    self.used_bytes = self.used_bytes.saturating_add(new_bytes);

    let id = HeapId::from_parts(idx as u32, slot.generation);

    #[cfg(debug_assertions)]
    self.debug_assert_used_bytes_is_correct();

    id
  }
}

struct Slot {
  generation: u32,
  value: Option<HeapObject>,
  bytes: usize,
}

impl Slot {
  fn new() -> Self {
    Self {
      generation: 0,
      value: None,
      bytes: 0,
    }
  }
}

#[derive(Debug)]
enum HeapObject {
  String(JsString),
  Object(JsObject),
}

impl Trace for HeapObject {
  fn trace(&self, tracer: &mut Tracer<'_>) {
    match self {
      // Strings have no outgoing GC references.
      HeapObject::String(_) => {}
      HeapObject::Object(o) => o.trace(tracer),
    }
  }
}

#[derive(Debug, Clone, Copy)]
struct PropertyEntry {
  key: PropertyKey,
  value: Value,
}

#[derive(Debug)]
struct JsObject {
  kind: ObjectKind,
  properties: Vec<PropertyEntry>,
  /// `None` is a hole.
  elements: Vec<Option<Value>>,
}

impl JsObject {
  fn heap_size_bytes_for_counts(property_count: usize, element_count: usize) -> usize {
    let props_bytes = property_count
      .checked_mul(mem::size_of::<PropertyEntry>())
      .unwrap_or(usize::MAX);
    let elements_bytes = element_count
      .checked_mul(mem::size_of::<Option<Value>>())
      .unwrap_or(usize::MAX);

    mem::size_of::<Self>()
      .checked_add(props_bytes)
      .and_then(|v| v.checked_add(elements_bytes))
      .unwrap_or(usize::MAX)
  }
}

impl Trace for JsObject {
  fn trace(&self, tracer: &mut Tracer<'_>) {
    for entry in &self.properties {
      if let PropertyKey::String(s) = entry.key {
        tracer.trace_value(Value::String(s));
      }
      tracer.trace_value(entry.value);
    }
    for value in self.elements.iter().flatten() {
      tracer.trace_value(*value);
    }
  }
}

trait Trace {
  fn trace(&self, tracer: &mut Tracer<'_>);
}

struct Tracer<'a> {
  slots: &'a [Slot],
  marks: &'a mut [u8],
  worklist: Vec<HeapId>,
}

impl<'a> Tracer<'a> {
  fn new(slots: &'a [Slot], marks: &'a mut [u8]) -> Self {
    Self {
      slots,
      marks,
      worklist: Vec::new(),
    }
  }

  fn pop_work(&mut self) -> Option<HeapId> {
    self.worklist.pop()
  }

  fn trace_value(&mut self, value: Value) {
    match value {
      Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) => {}
      Value::String(s) => self.trace_heap_id(s.0),
      Value::Object(o) => self.trace_heap_id(o.0),
    }
  }

  fn trace_heap_id(&mut self, id: HeapId) {
    let Some(idx) = self.validate(id) else {
      return;
    };
    if self.marks[idx] != 0 {
      return;
    }
    self.worklist.push(id);
  }

  fn validate(&self, id: HeapId) -> Option<usize> {
    let idx = id.index() as usize;
    let slot = self.slots.get(idx)?;
    if slot.generation != id.generation() {
      debug_assert!(false, "stale handle during GC: {id:?}");
      return None;
    }
    if slot.value.is_none() {
      debug_assert!(false, "handle points at a free slot during GC: {id:?}");
      return None;
    }
    Some(idx)
  }
}
