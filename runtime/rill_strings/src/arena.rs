//! Index-based storage for entry records.
//!
//! Bucket chains link entries by arena index rather than by address, so a
//! reference to a freed entry is detected loudly instead of dangling.
//! Vacant slots form an intrusive free list and are reused by later
//! allocations; an [`EntryRef`] is stable for as long as its entry lives.

use crate::entry::{Entry, EntryRef};

#[derive(Debug)]
enum Slot {
    Occupied(Entry),
    Vacant { next_free: Option<u32> },
}

#[derive(Debug, Default)]
pub(crate) struct EntryArena {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
}

impl EntryArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store an entry, reusing a vacant slot when one exists.
    pub(crate) fn alloc(&mut self, entry: Entry) -> EntryRef {
        self.live += 1;
        if let Some(index) = self.free_head {
            let next_free = match &self.slots[index as usize] {
                Slot::Vacant { next_free } => *next_free,
                Slot::Occupied(_) => unreachable!("free list points at an occupied slot"),
            };
            self.slots[index as usize] = Slot::Occupied(entry);
            self.free_head = next_free;
            return EntryRef::new(index);
        }
        let index = u32::try_from(self.slots.len())
            .unwrap_or_else(|_| panic!("entry arena exceeded u32::MAX slots"));
        self.slots.push(Slot::Occupied(entry));
        EntryRef::new(index)
    }

    /// # Panics
    /// Panics if the entry behind `r` has been freed.
    #[track_caller]
    pub(crate) fn get(&self, r: EntryRef) -> &Entry {
        match &self.slots[r.index()] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant { .. } => panic!("stale {r:?}: the entry has been freed"),
        }
    }

    /// # Panics
    /// Panics if the entry behind `r` has been freed.
    #[track_caller]
    pub(crate) fn get_mut(&mut self, r: EntryRef) -> &mut Entry {
        match &mut self.slots[r.index()] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant { .. } => panic!("stale {r:?}: the entry has been freed"),
        }
    }

    pub(crate) fn try_get(&self, r: EntryRef) -> Option<&Entry> {
        match self.slots.get(r.index()) {
            Some(Slot::Occupied(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Remove the entry behind `r` and put its slot on the free list.
    /// The caller must have unlinked it from its bucket chain first.
    #[track_caller]
    pub(crate) fn free(&mut self, r: EntryRef) -> Entry {
        let slot = std::mem::replace(
            &mut self.slots[r.index()],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        match slot {
            Slot::Occupied(entry) => {
                self.free_head = Some(r.raw());
                self.live -= 1;
                entry
            }
            Slot::Vacant { .. } => panic!("double free of {r:?}"),
        }
    }

    /// Number of live entries.
    pub(crate) fn live(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Mark;
    use pretty_assertions::assert_eq;

    #[test]
    fn alloc_and_get_round_trip() {
        let mut arena = EntryArena::new();
        let a = arena.alloc(Entry::new_str(b"a", 1));
        let b = arena.alloc(Entry::new_str(b"b", 2));

        assert_ne!(a, b);
        assert_eq!(arena.get(a).str_content(), Some(&b"a"[..]));
        assert_eq!(arena.get(b).str_content(), Some(&b"b"[..]));
        assert_eq!(arena.live(), 2);
    }

    #[test]
    fn freed_slot_is_reused() {
        let mut arena = EntryArena::new();
        let a = arena.alloc(Entry::new_str(b"a", 1));
        let _b = arena.alloc(Entry::new_str(b"b", 2));

        arena.free(a);
        assert_eq!(arena.live(), 1);

        let c = arena.alloc(Entry::new_str(b"c", 3));
        assert_eq!(c, a, "vacant slot should be reused first");
        assert_eq!(arena.get(c).str_content(), Some(&b"c"[..]));
        assert_eq!(arena.live(), 2);
    }

    #[test]
    fn get_mut_mutates_in_place() {
        let mut arena = EntryArena::new();
        let a = arena.alloc(Entry::new_str(b"a", 1));
        arena.get_mut(a).mark = Mark::Marked;
        assert_eq!(arena.get(a).mark, Mark::Marked);
    }

    #[test]
    fn try_get_reports_vacancy() {
        let mut arena = EntryArena::new();
        let a = arena.alloc(Entry::new_str(b"a", 1));
        assert!(arena.try_get(a).is_some());
        arena.free(a);
        assert!(arena.try_get(a).is_none());
    }

    #[test]
    #[should_panic(expected = "has been freed")]
    fn get_after_free_panics() {
        let mut arena = EntryArena::new();
        let a = arena.alloc(Entry::new_str(b"a", 1));
        arena.free(a);
        let _ = arena.get(a);
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn double_free_panics() {
        let mut arena = EntryArena::new();
        let a = arena.alloc(Entry::new_str(b"a", 1));
        arena.free(a);
        arena.free(a);
    }
}
