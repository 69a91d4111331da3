use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// A fetched entry with a stable identity.
///
/// Everything besides `id()` is payload the feed never inspects.
pub trait Record {
    type Id: Eq + Hash + Clone + fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// Ordered, deduplicated collection of records.
///
/// Insertion order is render order. No two elements share an id: `merge`
/// appends only records whose id has not been seen yet, and never reorders
/// what is already present.
#[derive(Debug, Clone)]
pub struct RecordSet<R: Record> {
    items: Vec<R>,
    seen: HashSet<R::Id>,
}

impl<R: Record> Default for RecordSet<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<R: Record> RecordSet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `incoming` in order, skipping ids already present (including
    /// duplicates within `incoming` itself). Returns how many were appended.
    pub fn merge<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = R>,
    {
        let before = self.items.len();
        for record in incoming {
            // HashSet::insert returns false for an id we already hold
            if self.seen.insert(record.id()) {
                self.items.push(record);
            }
        }
        self.items.len() - before
    }

    pub fn contains(&self, id: &R::Id) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[R] {
        &self.items
    }

    pub fn ids(&self) -> impl Iterator<Item = R::Id> + '_ {
        self.items.iter().map(Record::id)
    }
}

impl<'a, R: Record> IntoIterator for &'a RecordSet<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
