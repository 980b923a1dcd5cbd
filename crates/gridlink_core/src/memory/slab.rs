//! # Generational Slab
//!
//! Growable slot storage with free-list reuse and generation-checked handles.

/// Handle to a value stored in a [`Slab`].
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into the slot array
/// - Upper 32 bits: Generation counter for detecting stale handles
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SlotId(u64);

impl SlotId {
    /// Creates a slot ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the packed representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage addressed by [`SlotId`].
///
/// Removing a value bumps the slot generation, so any handle still pointing
/// at the old occupant resolves to `None` instead of aliasing the new one.
///
/// # Example
///
/// ```rust,ignore
/// let mut routers: Slab<Router> = Slab::new();
/// let id = routers.insert(Router::new(7));
/// routers.remove(id);
/// assert!(routers.get(id).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Slab<T> {
    slots: Vec<Slot<T>>,
    /// Free list - indices of vacant slots, reused LIFO.
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    /// Creates an empty slab.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Creates an empty slab with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Returns the number of occupied slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no slot is occupied.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores a value and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots are ever allocated.
    pub fn insert(&mut self, value: T) -> SlotId {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return SlotId::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).expect("slab exhausted u32 index space");
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        SlotId::new(index, 0)
    }

    /// Returns the handle the next [`insert`](Self::insert) will hand out.
    ///
    /// Lets a value be built knowing its own handle, e.g. when a child record
    /// must point back at its owner.
    #[must_use]
    pub fn next_id(&self) -> SlotId {
        match self.free_list.last() {
            Some(&index) => SlotId::new(index, self.slots[index as usize].generation),
            None => SlotId::new(u32::try_from(self.slots.len()).unwrap_or(u32::MAX), 0),
        }
    }

    /// Removes a value, invalidating its handle.
    ///
    /// Returns `None` if the handle is stale or was never issued.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index());
        self.len -= 1;
        Some(value)
    }

    /// Returns true if the handle points at a live value.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    /// Gets a reference to a live value.
    #[inline]
    #[must_use]
    pub fn get(&self, id: SlotId) -> Option<&T> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Gets a mutable reference to a live value.
    #[inline]
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Iterates over live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|v| (SlotId::new(index as u32, slot.generation), v))
        })
    }

    /// Iterates mutably over live values in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|v| (SlotId::new(index as u32, generation), v))
        })
    }

    /// Returns the handles of all live values, in slot order.
    ///
    /// Useful when the caller needs to mutate the slab while walking it.
    #[must_use]
    pub fn ids(&self) -> Vec<SlotId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Removes every value. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(index as u32);
            }
        }
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_id_packing() {
        let id = SlotId::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 67890);
    }

    #[test]
    fn test_insert_get_remove() {
        let mut slab: Slab<u32> = Slab::new();

        let id = slab.insert(42);
        assert_eq!(slab.get(id), Some(&42));
        assert_eq!(slab.len(), 1);

        assert_eq!(slab.remove(id), Some(42));
        assert!(slab.is_empty());
        assert!(slab.get(id).is_none());
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut slab: Slab<&str> = Slab::new();

        let old = slab.insert("old");
        slab.remove(old);
        let new = slab.insert("new");

        // Same slot reused, different generation
        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert!(slab.get(old).is_none());
        assert!(slab.remove(old).is_none());
        assert_eq!(slab.get(new), Some(&"new"));
    }

    #[test]
    fn test_next_id_predicts_insert() {
        let mut slab = Slab::new();
        let predicted = slab.next_id();
        assert_eq!(slab.insert("a"), predicted);

        let b = slab.insert("b");
        slab.remove(b);
        let predicted = slab.next_id();
        assert_eq!(predicted.index(), b.index());
        assert_eq!(slab.insert("c"), predicted);
    }

    #[test]
    fn test_iteration_is_slot_ordered() {
        let mut slab: Slab<u32> = Slab::with_capacity(4);
        let a = slab.insert(1);
        let _b = slab.insert(2);
        let _c = slab.insert(3);
        slab.remove(a);

        let values: Vec<u32> = slab.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2, 3]);

        for (_, v) in slab.iter_mut() {
            *v *= 10;
        }
        let values: Vec<u32> = slab.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![20, 30]);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut slab: Slab<u32> = Slab::new();
        let a = slab.insert(1);
        let b = slab.insert(2);

        slab.clear();
        assert!(slab.is_empty());
        assert!(!slab.contains(a));
        assert!(!slab.contains(b));

        let c = slab.insert(3);
        assert_eq!(slab.get(c), Some(&3));
        assert_eq!(slab.ids(), vec![c]);
    }
}
