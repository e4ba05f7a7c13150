//! Per-batch texture slot table.
//!
//! Slot 0 permanently holds the fallback texture. Textures used by the current
//! batch are appended from slot 1 onward; the same texture resolves to the same
//! slot until the table is reset at the next flush.

use super::backend::TextureId;

#[derive(Debug, Clone)]
pub struct TextureSlots {
    slots: Vec<TextureId>,
    capacity: usize,
}

impl TextureSlots {
    /// `capacity` includes the fallback slot and must be at least 2.
    pub fn new(fallback: TextureId, capacity: usize) -> Self {
        debug_assert!(capacity >= 2, "texture slot table needs room beyond the fallback");
        let mut slots = Vec::with_capacity(capacity);
        slots.push(fallback);
        Self { slots, capacity }
    }

    /// Returns the slot of `texture`, assigning the next free one if needed.
    ///
    /// `None` means the table is full and the batch must be flushed first.
    pub fn resolve(&mut self, texture: TextureId) -> Option<u32> {
        if let Some(slot) = self.slots.iter().position(|&t| t == texture) {
            return Some(slot as u32);
        }
        if self.slots.len() >= self.capacity {
            return None;
        }
        self.slots.push(texture);
        Some((self.slots.len() - 1) as u32)
    }

    /// Drops every assignment except the fallback in slot 0.
    pub fn reset(&mut self) {
        self.slots.truncate(1);
    }

    /// Assigned textures, indexed by slot.
    #[inline]
    pub fn as_slice(&self) -> &[TextureId] {
        &self.slots
    }

    /// Index the next newly seen texture would receive.
    #[inline]
    pub fn next_free(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn fallback(&self) -> TextureId {
        self.slots[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex(i: u32) -> TextureId {
        TextureId(i)
    }

    #[test]
    fn fallback_occupies_slot_zero() {
        let mut slots = TextureSlots::new(tex(0), 4);
        assert_eq!(slots.next_free(), 1);
        assert_eq!(slots.resolve(tex(0)), Some(0));
        assert_eq!(slots.as_slice(), &[tex(0)]);
    }

    #[test]
    fn same_texture_reuses_slot() {
        let mut slots = TextureSlots::new(tex(0), 4);
        assert_eq!(slots.resolve(tex(7)), Some(1));
        assert_eq!(slots.resolve(tex(9)), Some(2));
        assert_eq!(slots.resolve(tex(7)), Some(1));
        assert_eq!(slots.as_slice(), &[tex(0), tex(7), tex(9)]);
    }

    #[test]
    fn full_table_reports_exhaustion_but_still_resolves_known() {
        let mut slots = TextureSlots::new(tex(0), 3);
        slots.resolve(tex(1));
        slots.resolve(tex(2));
        assert_eq!(slots.resolve(tex(3)), None);
        assert_eq!(slots.resolve(tex(2)), Some(2));
    }

    #[test]
    fn reset_keeps_only_fallback() {
        let mut slots = TextureSlots::new(tex(0), 3);
        slots.resolve(tex(1));
        slots.resolve(tex(2));
        slots.reset();
        assert_eq!(slots.as_slice(), &[tex(0)]);
        assert_eq!(slots.resolve(tex(2)), Some(1));
    }
}
