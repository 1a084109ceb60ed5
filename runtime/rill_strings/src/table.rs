//! One open-chained bucket table.
//!
//! Capacity is always a power of two, so `hash & (capacity - 1)` is the
//! same bucket as `hash % capacity`. Every table starts at capacity 1 and
//! doubles exactly when its live count exceeds its capacity. A resize
//! relinks existing entries into new chains without touching their arena
//! slots, so outstanding [`EntryRef`]s survive it.

use crate::arena::EntryArena;
use crate::entry::EntryRef;

#[derive(Debug)]
pub(crate) struct Table {
    /// Chain heads; the vector length is the capacity.
    chains: Vec<Option<EntryRef>>,
    /// Live entries reachable through this table.
    count: usize,
}

impl Table {
    pub(crate) fn new() -> Self {
        Table {
            chains: vec![None],
            count: 0,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.chains.len()
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Bucket index for `hash` under the current capacity.
    #[inline]
    pub(crate) fn bucket(&self, hash: u32) -> usize {
        (hash as usize) & (self.chains.len() - 1)
    }

    #[inline]
    pub(crate) fn head(&self, bucket: usize) -> Option<EntryRef> {
        self.chains[bucket]
    }

    #[inline]
    pub(crate) fn set_head(&mut self, bucket: usize, head: Option<EntryRef>) {
        self.chains[bucket] = head;
    }

    pub(crate) fn dec_count(&mut self) {
        self.count -= 1;
    }

    /// Push a freshly allocated entry onto its chain head, then double the
    /// table if it is now too crowded.
    pub(crate) fn insert(&mut self, arena: &mut EntryArena, r: EntryRef, hash: u32) {
        let bucket = self.bucket(hash);
        arena.get_mut(r).chain_next = self.chains[bucket];
        self.chains[bucket] = Some(r);
        self.count += 1;
        if self.count > self.chains.len() {
            self.resize(arena, self.chains.len() * 2);
        }
    }

    /// Full rehash into `new_capacity` chains. Each entry is re-placed by
    /// its stored hash (strings) or its recomputed address hash
    /// (identities); only chain membership changes.
    fn resize(&mut self, arena: &mut EntryArena, new_capacity: usize) {
        debug_assert!(new_capacity.is_power_of_two());
        tracing::trace!(
            old = self.chains.len(),
            new = new_capacity,
            "bucket table resize"
        );
        let mut new_chains = vec![None; new_capacity];
        for head in std::mem::take(&mut self.chains) {
            let mut cur = head;
            while let Some(r) = cur {
                let next = arena.get(r).chain_next;
                let bucket = (arena.get(r).placement_hash() as usize) & (new_capacity - 1);
                let entry = arena.get_mut(r);
                entry.chain_next = new_chains[bucket];
                new_chains[bucket] = Some(r);
                cur = next;
            }
        }
        self.chains = new_chains;
    }

    /// Remove `r` from its chain. The entry itself stays in the arena;
    /// freeing it is the caller's job.
    ///
    /// # Panics
    /// Panics if `r` is not linked in the bucket `hash` maps to, which
    /// means the chain structure is corrupt.
    #[track_caller]
    pub(crate) fn unlink(&mut self, arena: &mut EntryArena, r: EntryRef, hash: u32) {
        let bucket = self.bucket(hash);
        let mut prev: Option<EntryRef> = None;
        let mut cur = self.chains[bucket];
        while let Some(c) = cur {
            let next = arena.get(c).chain_next;
            if c == r {
                match prev {
                    None => self.chains[bucket] = next,
                    Some(p) => arena.get_mut(p).chain_next = next,
                }
                self.count -= 1;
                return;
            }
            prev = Some(c);
            cur = next;
        }
        panic!("{r:?} is not linked in its bucket chain");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::hash::hash_bytes;
    use pretty_assertions::assert_eq;

    fn insert_str(table: &mut Table, arena: &mut EntryArena, content: &[u8]) -> EntryRef {
        let hash = hash_bytes(content);
        let r = arena.alloc(Entry::new_str(content, hash));
        table.insert(arena, r, hash);
        r
    }

    fn collect_refs(table: &Table, arena: &EntryArena) -> Vec<EntryRef> {
        let mut refs = Vec::new();
        for bucket in 0..table.capacity() {
            let mut cur = table.head(bucket);
            while let Some(r) = cur {
                refs.push(r);
                cur = arena.get(r).chain_next;
            }
        }
        refs
    }

    #[test]
    fn starts_at_capacity_one() {
        let table = Table::new();
        assert_eq!(table.capacity(), 1);
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn doubles_when_count_exceeds_capacity() {
        let mut table = Table::new();
        let mut arena = EntryArena::new();
        for i in 0..10u32 {
            insert_str(&mut table, &mut arena, format!("entry-{i}").as_bytes());
        }
        assert_eq!(table.count(), 10);
        assert_eq!(table.capacity(), 16);
        assert!(table.capacity().is_power_of_two());
    }

    #[test]
    fn resize_relinks_every_entry() {
        let mut table = Table::new();
        let mut arena = EntryArena::new();
        let mut inserted = Vec::new();
        for i in 0..50u32 {
            inserted.push(insert_str(
                &mut table,
                &mut arena,
                format!("entry-{i}").as_bytes(),
            ));
        }

        let mut reachable = collect_refs(&table, &arena);
        reachable.sort_unstable();
        inserted.sort_unstable();
        assert_eq!(reachable, inserted);
    }

    #[test]
    fn resize_places_entries_by_stored_hash() {
        let mut table = Table::new();
        let mut arena = EntryArena::new();
        for i in 0..20u32 {
            insert_str(&mut table, &mut arena, format!("entry-{i}").as_bytes());
        }
        for bucket in 0..table.capacity() {
            let mut cur = table.head(bucket);
            while let Some(r) = cur {
                let entry = arena.get(r);
                assert_eq!(table.bucket(entry.placement_hash()), bucket);
                cur = entry.chain_next;
            }
        }
    }

    #[test]
    fn unlink_removes_head_and_interior_entries() {
        let mut table = Table::new();
        let mut arena = EntryArena::new();
        let a = insert_str(&mut table, &mut arena, b"alpha");
        let b = insert_str(&mut table, &mut arena, b"beta");
        let c = insert_str(&mut table, &mut arena, b"gamma");

        table.unlink(&mut arena, b, hash_bytes(b"beta"));
        table.unlink(&mut arena, a, hash_bytes(b"alpha"));
        assert_eq!(table.count(), 1);
        assert_eq!(collect_refs(&table, &arena), vec![c]);
    }

    #[test]
    #[should_panic(expected = "not linked")]
    fn unlink_of_missing_entry_panics() {
        let mut table = Table::new();
        let mut arena = EntryArena::new();
        let a = insert_str(&mut table, &mut arena, b"alpha");
        table.unlink(&mut arena, a, hash_bytes(b"alpha"));
        table.unlink(&mut arena, a, hash_bytes(b"alpha"));
    }
}
