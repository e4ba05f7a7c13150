//! Lock-free set of held keys.
//!
//! Written from the platform event thread, read from the update thread.
//! Every operation is a single atomic op on one word; nothing blocks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::Key;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = Key::COUNT.div_ceil(WORD_BITS);

#[derive(Default)]
pub struct KeySet {
    words: [AtomicU64; WORDS],
}

#[inline]
fn locate(key: Key) -> Option<(usize, u64)> {
    let i = key.index()?;
    Some((i / WORD_BITS, 1u64 << (i % WORD_BITS)))
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as held. Returns `true` if it was not held before.
    ///
    /// `Key::Unknown` is not tracked and always returns `false`.
    pub fn insert(&self, key: Key) -> bool {
        let Some((word, bit)) = locate(key) else {
            return false;
        };
        self.words[word].fetch_or(bit, Ordering::AcqRel) & bit == 0
    }

    /// Marks `key` as released. Returns `true` if it was held.
    pub fn remove(&self, key: Key) -> bool {
        let Some((word, bit)) = locate(key) else {
            return false;
        };
        self.words[word].fetch_and(!bit, Ordering::AcqRel) & bit != 0
    }

    pub fn contains(&self, key: Key) -> bool {
        locate(key).is_some_and(|(word, bit)| self.words[word].load(Ordering::Acquire) & bit != 0)
    }

    /// Releases every key.
    pub fn clear(&self) {
        for word in &self.words {
            word.store(0, Ordering::Release);
        }
    }

    pub fn len(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as usize)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| w.load(Ordering::Acquire) == 0)
    }

    /// Held keys in index order.
    ///
    /// Each word is loaded once; keys changing concurrently may or may not show up.
    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        self.words.iter().enumerate().flat_map(|(w, word)| {
            let bits = word.load(Ordering::Acquire);
            (0..WORD_BITS)
                .filter(move |b| bits & (1u64 << b) != 0)
                .filter_map(move |b| Key::from_index(w * WORD_BITS + b))
        })
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
