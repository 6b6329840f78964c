//! Ordered collection of named source frames.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Named byte buffers plus the order in which their names first appeared.
///
/// The order drives frame indexing, so it is kept separately from the lookup
/// map. A name may be declared without data (for example an array with no
/// parsable values); the assembler reports such entries and skips them.
#[derive(Debug, Clone, Default)]
pub struct NamedBuffers {
    order: Vec<String>,
    /// Every name in `order`; `None` for names declared without data.
    entries: HashMap<String, Option<Vec<u8>>>,
}

impl NamedBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a lookup map and an explicit name order.
    ///
    /// Names in `order` missing from `buffers` are declared without data;
    /// buffers whose name is not in `order` are appended in arbitrary order.
    pub fn from_parts(buffers: HashMap<String, Vec<u8>>, order: Vec<String>) -> Self {
        let mut named = Self::new();
        for name in order {
            named.declare(name);
        }
        for (name, data) in buffers {
            named.insert(name, data);
        }
        named
    }

    /// Append a buffer. Returns false (and keeps the first one) if `name`
    /// already holds data.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) -> bool {
        match self.entries.entry(name.into()) {
            Entry::Occupied(mut slot) => {
                if slot.get().is_some() {
                    return false;
                }
                slot.insert(Some(data));
            }
            Entry::Vacant(slot) => {
                self.order.push(slot.key().clone());
                slot.insert(Some(data));
            }
        }
        true
    }

    /// Record a name in the order without data.
    pub fn declare(&mut self, name: impl Into<String>) {
        if let Entry::Vacant(slot) = self.entries.entry(name.into()) {
            self.order.push(slot.key().clone());
            slot.insert(None);
        }
    }

    /// Names in first-appearance order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).and_then(|data| data.as_deref())
    }

    /// Number of names in the order.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of names that carry data.
    pub fn buffer_count(&self) -> usize {
        self.entries.values().filter(|data| data.is_some()).count()
    }

    /// Iterate `(name, data)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&[u8]>)> {
        self.order.iter().map(|name| (name.as_str(), self.get(name)))
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<u8>)> for NamedBuffers {
    fn from_iter<I: IntoIterator<Item = (S, Vec<u8>)>>(iter: I) -> Self {
        let mut buffers = NamedBuffers::new();
        for (name, data) in iter {
            buffers.insert(name, data);
        }
        buffers
    }
}
