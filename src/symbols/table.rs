use std::collections::btree_map::{self, BTreeMap};

use super::entry::SymbolEntry;

/// Result of merging an entry into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Key was new
    Inserted,
    /// A forward declaration was replaced by the full one
    Replaced,
    /// The incoming forward declaration added nothing
    Kept,
    /// Both declarations are full; the existing entry stays
    Conflict,
}

/// Every entry of a run, keyed by [`SymbolEntry::key`].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: BTreeMap<String, SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SymbolEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut SymbolEntry> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, SymbolEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, SymbolEntry> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, SymbolEntry> {
        self.entries.keys()
    }

    /// Struct, class and union entries in key order.
    pub fn structs(&self) -> impl Iterator<Item = (&String, &SymbolEntry)> {
        self.entries.iter().filter(|(_, entry)| entry.is_struct())
    }

    /// Adds an entry. Full declarations replace forward ones; deciding
    /// between two full declarations is left to the caller.
    pub fn merge(&mut self, entry: SymbolEntry) -> MergeOutcome {
        let key = entry.key();
        match self.entries.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                MergeOutcome::Inserted
            }
            btree_map::Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if entry.forward {
                    if existing.doc.is_none() && entry.doc.is_some() {
                        existing.doc = entry.doc;
                    }
                    MergeOutcome::Kept
                } else if existing.forward {
                    let forward = std::mem::replace(existing, entry);
                    existing.absorb_forward(forward);
                    MergeOutcome::Replaced
                } else {
                    MergeOutcome::Conflict
                }
            }
        }
    }

    /// Records `member` as declared inside `scope`. Unknown scopes are ignored.
    pub fn add_member(&mut self, scope: &str, member: &str) -> bool {
        match self.entries.get_mut(scope) {
            Some(parent) => {
                if !parent.members.iter().any(|m| m == member) {
                    parent.members.push(member.to_string());
                }
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = (&'a String, &'a SymbolEntry);
    type IntoIter = btree_map::Iter<'a, String, SymbolEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
