use std::ops::Range;

use glob::PatternError;
use hashbrown::HashMap;

use crate::path::{MATCH_OPTIONS, compile_pattern};
use super::entry::Entry;


/// The key of the root directory.
pub(crate) const ROOT: &str = "/";

/// Entries of a [`MemoryFs`], indexed by absolute key (e.g. `/dir0/file01.txt`).
///
/// `keys` is kept sorted, and always holds exactly the keys of `entries`. Since every descendant
/// of `/a` starts with `/a/`, the descendants of a key form one contiguous run of `keys`.
///
/// [`MemoryFs`]: super::MemoryFs
#[derive(Debug, Default)]
pub(crate) struct Store {
    keys:    Vec<String>,
    entries: HashMap<String, Entry>,
}

impl Store {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    #[inline]
    #[must_use]
    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    /// Insert or replace the entry at `key`, returning the entry it replaced.
    pub(crate) fn put(&mut self, key: String, entry: Entry) -> Option<Entry> {
        if let Err(idx) = self.keys.binary_search(&key) {
            self.keys.insert(idx, key.clone());
        }
        self.entries.insert(key, entry)
    }

    /// Remove exactly the entry at `key`, if present.
    pub(crate) fn remove(&mut self, key: &str) -> Option<Entry> {
        let idx = self.keys.binary_search_by(|probe| probe.as_str().cmp(key)).ok()?;
        self.keys.remove(idx);
        self.entries.remove(key)
    }

    /// Remove the entry at `prefix` and every entry beneath it, returning how many were removed.
    ///
    /// The root entry itself is never removed; `remove_all("/")` empties the store down to it.
    pub(crate) fn remove_all(&mut self, prefix: &str) -> usize {
        let range = self.descendants(prefix);
        let removed_len = range.len();
        for key in self.keys.drain(range) {
            self.entries.remove(&key);
        }

        if prefix != ROOT && self.remove(prefix).is_some() {
            removed_len + 1
        } else {
            removed_len
        }
    }

    /// The keys of the direct children of `prefix`, in sorted order.
    ///
    /// Empty if nothing is stored at `prefix`.
    #[must_use]
    pub(crate) fn prefix_keys(&self, prefix: &str) -> Vec<&str> {
        if !self.entries.contains_key(prefix) {
            return Vec::new();
        }

        let child_prefix = child_prefix(prefix);
        self.descendant_keys(prefix)
            .filter(|key| {
                key.strip_prefix(child_prefix.as_str())
                    .is_some_and(|name| !name.contains('/'))
            })
            .collect()
    }

    /// The keys beneath `prefix` whose path relative to `prefix` matches `pattern`, in sorted
    /// order.
    ///
    /// The pattern is compiled first, so a malformed pattern is reported even if nothing is
    /// stored at `prefix`.
    pub(crate) fn prefix_glob_keys(
        &self,
        prefix:  &str,
        pattern: &str,
    ) -> Result<Vec<&str>, PatternError> {
        let pattern = compile_pattern(pattern)?;

        if !self.entries.contains_key(prefix) {
            return Ok(Vec::new());
        }

        let child_prefix = child_prefix(prefix);
        Ok(self.descendant_keys(prefix)
            .filter(|key| {
                key.strip_prefix(child_prefix.as_str())
                    .is_some_and(|rel| pattern.matches_with(rel, MATCH_OPTIONS))
            })
            .collect())
    }

    /// Every key in sorted order.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn keys(&self) -> &[String] {
        &self.keys
    }

    #[cfg(test)]
    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    fn descendant_keys(&self, prefix: &str) -> impl Iterator<Item = &str> {
        #[expect(
            clippy::indexing_slicing,
            reason = "`descendants` returns a range within `self.keys`",
        )]
        let keys = &self.keys[self.descendants(prefix)];
        keys.iter().map(String::as_str)
    }

    /// The range of `keys` holding the strict descendants of `prefix`.
    ///
    /// The search starts from `prefix/` rather than from `prefix`, since an unrelated sibling
    /// such as `/dir!x` sorts between `/dir` and `/dir/...`.
    fn descendants(&self, prefix: &str) -> Range<usize> {
        let child_prefix = child_prefix(prefix);

        let mut start = self.keys.partition_point(|key| key.as_str() < child_prefix.as_str());
        // Only relevant at the root, where `prefix == child_prefix`.
        if self.keys.get(start).is_some_and(|key| key == prefix) {
            start += 1;
        }

        #[expect(
            clippy::indexing_slicing,
            reason = "`partition_point` returns at most `self.keys.len()`, and `start` is only \
                      incremented if it was a valid index",
        )]
        let len = self.keys[start..]
            .iter()
            .take_while(|key| key.starts_with(child_prefix.as_str()))
            .count();

        start..start + len
    }
}

/// `prefix` with a trailing `/`; the root is returned unchanged.
fn child_prefix(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_owned()
    } else {
        format!("{prefix}/")
    }
}
