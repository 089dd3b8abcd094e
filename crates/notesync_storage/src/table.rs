//! Insertion-ordered note table shared by the store implementations.

use notesync_protocol::Note;
use std::collections::{BTreeMap, HashMap};

/// Notes keyed by `local_id`, iterated in insertion order.
#[derive(Debug, Default)]
pub(crate) struct NoteTable {
    /// Slot number -> note. Slots only grow, so iteration is insertion order.
    slots: BTreeMap<u64, Note>,
    /// local_id -> slot number.
    index: HashMap<String, u64>,
    next_slot: u64,
}

impl NoteTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces. Returns true if a note was replaced.
    pub(crate) fn put(&mut self, note: Note) -> bool {
        if let Some(&slot) = self.index.get(&note.local_id) {
            self.slots.insert(slot, note);
            return true;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.index.insert(note.local_id.clone(), slot);
        self.slots.insert(slot, note);
        false
    }

    pub(crate) fn get(&self, local_id: &str) -> Option<&Note> {
        self.index.get(local_id).and_then(|slot| self.slots.get(slot))
    }

    pub(crate) fn remove(&mut self, local_id: &str) -> Option<Note> {
        let slot = self.index.remove(local_id)?;
        self.slots.remove(&slot)
    }

    pub(crate) fn list(&self) -> Vec<Note> {
        self.slots.values().cloned().collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Note> {
        self.slots.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_keeps_position() {
        let mut table = NoteTable::new();
        let a = Note::new("a");
        let b = Note::new("b");
        table.put(a.clone());
        table.put(b.clone());

        let mut a2 = a.clone();
        a2.title = "a2".into();
        assert!(table.put(a2));

        let titles: Vec<_> = table.list().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["a2", "b"]);
    }

    #[test]
    fn remove_then_reinsert_goes_to_end() {
        let mut table = NoteTable::new();
        let a = Note::new("a");
        let b = Note::new("b");
        table.put(a.clone());
        table.put(b.clone());

        assert!(table.remove(&a.local_id).is_some());
        assert!(table.remove(&a.local_id).is_none());
        table.put(a.clone());

        let titles: Vec<_> = table.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
        assert_eq!(table.len(), 2);
    }
}
