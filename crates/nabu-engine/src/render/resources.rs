//! Handle-indexed storage for backend-owned GPU resources.

/// Append-only table of resources addressed by `u32` handles.
///
/// Slots are never reused: once a handle is removed it stays dead, so a stale
/// handle can never alias a newer resource.
#[derive(Debug)]
pub(crate) struct ResourceTable<T> {
    entries: Vec<Option<T>>,
    live: usize,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            live: 0,
        }
    }
}

impl<T> ResourceTable<T> {
    pub fn insert(&mut self, value: T) -> u32 {
        let index = self.entries.len() as u32;
        self.entries.push(Some(value));
        self.live += 1;
        index
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.entries.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.entries.get_mut(index as usize).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, index: u32) -> Option<T> {
        let taken = self.entries.get_mut(index as usize).and_then(Option::take);
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.live
    }
}
