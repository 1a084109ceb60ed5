//! The interning engine: shard partition, intern operations, and the
//! collector-facing surface.
//!
//! The pool is a fixed partition of 63 independent bucket tables. Strings
//! go to one of 32 shards picked by a cheap first-plus-last-byte pre-hash;
//! identities go to one of 31 shards picked by address modulo. Keeping the
//! namespace statically sharded keeps every chain short without a global
//! resize storm: only the one overfull table doubles.
//!
//! The pool never collects garbage on its own. An external collector
//! drives entry lifetime through [`StringPool::mark`], [`StringPool::pin`],
//! [`StringPool::sweep_unreachable`] and [`StringPool::release`], and reads
//! [`StringPool::mem_used`] for its memory accounting.

use crate::arena::EntryArena;
use crate::entry::{Entry, EntryRef, HostRef, Mark, Payload};
use crate::error::PoolError;
use crate::hash::{hash_bytes, hash_host};
use crate::table::Table;

/// Number of bucket tables reserved for string interning. A power of two:
/// the shard is selected by masking the first-plus-last-byte pre-hash.
pub const STR_SHARDS: usize = 32;

/// Number of bucket tables reserved for identity interning. Deliberately
/// not a power of two: host addresses are aligned and therefore regular,
/// and selecting the shard with `%` by a non-power-of-two count
/// decorrelates it from the masked bucket index used inside the shard.
/// Two `&` selections on an aligned address would correlate badly.
pub const IDENT_SHARDS: usize = 31;

const NUM_SHARDS: usize = STR_SHARDS + IDENT_SHARDS;

/// Wildcard tag for [`StringPool::intern_identity`]: matches an existing
/// entry for the host regardless of its tag. An entry created through a
/// wildcard request stores tag 0.
pub const ANY_TAG: i32 = -1;

/// The interning engine.
///
/// Guarantees that every distinct byte sequence and every distinct
/// `(host, tag)` pair is represented by exactly one live entry, so callers
/// compare [`EntryRef`]s instead of content. Single-threaded by design:
/// the runtime owns one mutable pool and every operation runs to
/// completion. A multi-threaded host would need per-shard locking; the
/// shards are already independent.
#[derive(Debug)]
pub struct StringPool {
    shards: [Table; NUM_SHARDS],
    arena: EntryArena,
    /// Bytes currently charged to the collector's memory accounting.
    mem_used: usize,
}

impl StringPool {
    /// Create an empty pool: 63 tables at capacity 1, nothing charged.
    #[must_use]
    pub fn new() -> Self {
        StringPool {
            shards: std::array::from_fn(|_| Table::new()),
            arena: EntryArena::new(),
            mem_used: 0,
        }
    }

    /// String shard for `content`. The empty sequence always routes to
    /// shard 0; anything else mixes its first and last byte.
    fn str_shard(content: &[u8]) -> usize {
        match (content.first(), content.last()) {
            (Some(&first), Some(&last)) => (usize::from(first) + usize::from(last)) & (STR_SHARDS - 1),
            _ => 0,
        }
    }

    /// Identity shard for a pre-hashed address, offset past the string
    /// shards.
    fn ident_shard(hash: u32) -> usize {
        STR_SHARDS + (hash as usize) % IDENT_SHARDS
    }

    /// Intern a byte sequence, returning the canonical entry for its
    /// content.
    ///
    /// A hit returns the existing entry with no allocation and no
    /// accounting change. A miss copies the content into a new entry
    /// (plus a trailing NUL for C-string consumers), links it into its
    /// shard, and charges the collector's accounting with the entry's
    /// footprint. Equality is decided by full byte comparison, never by
    /// hash alone.
    pub fn intern_bytes(&mut self, content: &[u8]) -> EntryRef {
        let hash = hash_bytes(content);
        let table = &mut self.shards[Self::str_shard(content)];

        let mut cur = table.head(table.bucket(hash));
        while let Some(r) = cur {
            let entry = self.arena.get(r);
            if entry.str_content() == Some(content) {
                return r;
            }
            cur = entry.chain_next;
        }

        let entry = Entry::new_str(content, hash);
        self.mem_used += entry.footprint();
        let r = self.arena.alloc(entry);
        table.insert(&mut self.arena, r, hash);
        r
    }

    /// Intern a string slice. Convenience over [`Self::intern_bytes`].
    pub fn intern(&mut self, s: &str) -> EntryRef {
        self.intern_bytes(s.as_bytes())
    }

    /// Intern a string slice and pin the result so the collector never
    /// frees it. Used for literals that must outlive every cycle.
    pub fn intern_pinned(&mut self, s: &str) -> EntryRef {
        let r = self.intern_bytes(s.as_bytes());
        self.pin(r);
        r
    }

    /// Intern a `(host, tag)` identity pair.
    ///
    /// The host address itself is the key: two different hosts are always
    /// distinct entries. Passing [`ANY_TAG`] matches an existing entry for
    /// the host regardless of tag; if none exists, the new entry stores
    /// tag 0.
    pub fn intern_identity(&mut self, host: HostRef, tag: i32) -> EntryRef {
        let hash = hash_host(host.addr());
        let table = &mut self.shards[Self::ident_shard(hash)];

        let mut cur = table.head(table.bucket(hash));
        while let Some(r) = cur {
            let entry = self.arena.get(r);
            if let Payload::Ident {
                host: stored,
                tag: stored_tag,
            } = &entry.payload
            {
                if *stored == host && (*stored_tag == tag || tag == ANY_TAG) {
                    return r;
                }
            }
            cur = entry.chain_next;
        }

        let stored_tag = if tag == ANY_TAG { 0 } else { tag };
        let entry = Entry::new_ident(host, stored_tag);
        self.mem_used += entry.footprint();
        let r = self.arena.alloc(entry);
        table.insert(&mut self.arena, r, hash);
        r
    }

    /// Content of a string entry, without the trailing terminator.
    pub fn try_content(&self, r: EntryRef) -> Result<&[u8], PoolError> {
        let entry = self.arena.try_get(r).ok_or(PoolError::Freed)?;
        entry.str_content().ok_or(PoolError::NotString)
    }

    /// Content of a string entry, without the trailing terminator.
    ///
    /// # Panics
    /// Panics if `r` is an identity entry or has been freed. Use
    /// [`Self::try_content`] to handle those as errors.
    #[track_caller]
    pub fn content(&self, r: EntryRef) -> &[u8] {
        self.try_content(r).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Content of a string entry including the trailing NUL, for handing
    /// to C-string consumers.
    ///
    /// # Panics
    /// Panics if `r` is an identity entry or has been freed.
    #[track_caller]
    pub fn content_with_nul(&self, r: EntryRef) -> &[u8] {
        match &self.arena.get(r).payload {
            Payload::Str { bytes, .. } => bytes,
            Payload::Ident { .. } => panic!("{}", PoolError::NotString),
        }
    }

    /// Host and tag of an identity entry.
    pub fn try_identity(&self, r: EntryRef) -> Result<(HostRef, i32), PoolError> {
        let entry = self.arena.try_get(r).ok_or(PoolError::Freed)?;
        match &entry.payload {
            Payload::Ident { host, tag } => Ok((*host, *tag)),
            Payload::Str { .. } => Err(PoolError::NotIdentity),
        }
    }

    /// Host and tag of an identity entry.
    ///
    /// # Panics
    /// Panics if `r` is a string entry or has been freed. Use
    /// [`Self::try_identity`] to handle those as errors.
    #[track_caller]
    pub fn identity(&self, r: EntryRef) -> (HostRef, i32) {
        self.try_identity(r).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Collector mark phase: flag `r` as reachable for the current cycle.
    /// Never overwrites a pinned entry.
    pub fn mark(&mut self, r: EntryRef) {
        let entry = self.arena.get_mut(r);
        if entry.mark == Mark::Unmarked {
            entry.mark = Mark::Marked;
        }
    }

    /// Permanently exempt `r` from collection.
    ///
    /// Only an unmarked entry transitions to pinned; an entry currently
    /// marked by an in-progress cycle is left as is.
    pub fn pin(&mut self, r: EntryRef) {
        let entry = self.arena.get_mut(r);
        if entry.mark == Mark::Unmarked {
            entry.mark = Mark::Pinned;
        }
    }

    pub fn is_pinned(&self, r: EntryRef) -> bool {
        self.arena.get(r).mark == Mark::Pinned
    }

    pub fn is_marked(&self, r: EntryRef) -> bool {
        self.arena.get(r).mark == Mark::Marked
    }

    /// Collector sweep phase: free every entry left unmarked by the mark
    /// phase, demote marked survivors back to unmarked for the next cycle,
    /// and leave pinned entries untouched. Returns the number of entries
    /// freed.
    pub fn sweep_unreachable(&mut self) -> usize {
        let mut freed = 0;
        for table in &mut self.shards {
            for bucket in 0..table.capacity() {
                let mut prev: Option<EntryRef> = None;
                let mut cur = table.head(bucket);
                while let Some(r) = cur {
                    let next = self.arena.get(r).chain_next;
                    match self.arena.get(r).mark {
                        Mark::Pinned => prev = Some(r),
                        Mark::Marked => {
                            self.arena.get_mut(r).mark = Mark::Unmarked;
                            prev = Some(r);
                        }
                        Mark::Unmarked => {
                            match prev {
                                None => table.set_head(bucket, next),
                                Some(p) => self.arena.get_mut(p).chain_next = next,
                            }
                            table.dec_count();
                            let entry = self.arena.free(r);
                            self.mem_used -= entry.footprint();
                            freed += 1;
                        }
                    }
                    cur = next;
                }
            }
        }
        tracing::debug!(freed, live = self.arena.live(), "string pool sweep");
        freed
    }

    /// Release a single entry the host has relinquished: unlink it from
    /// its chain, uncharge its exact footprint, and free its slot.
    ///
    /// # Panics
    /// Panics if the entry is pinned (pinned entries must never reach the
    /// release path) or if `r` is stale.
    #[track_caller]
    pub fn release(&mut self, r: EntryRef) {
        let entry = self.arena.get(r);
        assert!(
            entry.mark != Mark::Pinned,
            "released a pinned entry: {r:?}"
        );
        let (shard, hash) = match &entry.payload {
            Payload::Str { bytes, hash } => {
                (Self::str_shard(&bytes[..bytes.len() - 1]), *hash)
            }
            Payload::Ident { host, .. } => {
                let hash = hash_host(host.addr());
                (Self::ident_shard(hash), hash)
            }
        };
        self.shards[shard].unlink(&mut self.arena, r, hash);
        let entry = self.arena.free(r);
        self.mem_used -= entry.footprint();
    }

    /// Number of live entries across every shard.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.live()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently charged to the collector's external memory
    /// accounting: header plus content length per string entry, the fixed
    /// header size per identity entry.
    #[must_use]
    pub fn mem_used(&self) -> usize {
        self.mem_used
    }

    /// Tear the pool down.
    ///
    /// Pinned entries live exactly until teardown and are freed here. Any
    /// other surviving entry means the collector or a caller leaked it,
    /// which is a programming error, not a recoverable condition.
    ///
    /// # Panics
    /// Panics if any bucket table still holds live unpinned entries.
    pub fn teardown(mut self) {
        for table in &mut self.shards {
            for bucket in 0..table.capacity() {
                let mut prev: Option<EntryRef> = None;
                let mut cur = table.head(bucket);
                while let Some(r) = cur {
                    let next = self.arena.get(r).chain_next;
                    if self.arena.get(r).mark == Mark::Pinned {
                        match prev {
                            None => table.set_head(bucket, next),
                            Some(p) => self.arena.get_mut(p).chain_next = next,
                        }
                        table.dec_count();
                        let entry = self.arena.free(r);
                        self.mem_used -= entry.footprint();
                    } else {
                        prev = Some(r);
                    }
                    cur = next;
                }
            }
        }

        for table in &self.shards {
            assert!(table.count() == 0, "non-empty string table at teardown");
        }
        debug_assert_eq!(self.mem_used, 0, "accounting out of balance at teardown");
        tracing::debug!("string pool torn down");
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}
