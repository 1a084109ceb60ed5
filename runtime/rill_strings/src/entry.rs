//! Entry records: the interned unit, its payload, and stable references.

use std::fmt;

use crate::hash::hash_host;

/// Stable reference to an interned entry.
///
/// A thin index into the pool's entry arena. References stay valid across
/// bucket table resizes, so comparing two `EntryRef`s is the canonical
/// O(1) equality for the values they intern.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntryRef(u32);

impl EntryRef {
    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        EntryRef(index)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryRef({})", self.0)
    }
}

/// Identity of an object owned by the host runtime.
///
/// Only the address participates in interning: two distinct hosts are
/// distinct entries even when their tags and pointed-to contents coincide.
/// The address is treated as an opaque value and never dereferenced.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct HostRef(usize);

impl HostRef {
    /// Wrap a host object address.
    #[must_use]
    pub fn from_addr(addr: usize) -> Self {
        HostRef(addr)
    }

    /// The wrapped address.
    #[must_use]
    pub fn addr(self) -> usize {
        self.0
    }
}

/// Collector-facing mark state of an entry.
///
/// The collector's mark phase moves entries `Unmarked -> Marked`; the sweep
/// phase frees entries still `Unmarked` and demotes `Marked` survivors back
/// to `Unmarked` for the next cycle. `Pinned` is terminal: a pinned entry
/// survives every sweep and is freed only at pool teardown.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mark {
    Unmarked,
    Marked,
    Pinned,
}

/// What an entry interns.
#[derive(Debug)]
pub(crate) enum Payload {
    /// Owned byte content, stored with one trailing NUL so C-string
    /// consumers can borrow it directly. The content hash is cached for
    /// re-placement at resize.
    Str { bytes: Box<[u8]>, hash: u32 },
    /// Identity of a host object plus its integer tag.
    Ident { host: HostRef, tag: i32 },
}

/// One interned entry.
///
/// Entries are owned by the arena; bucket chains link them by index
/// through `chain_next`.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) payload: Payload,
    pub(crate) chain_next: Option<EntryRef>,
    pub(crate) mark: Mark,
}

impl Entry {
    pub(crate) fn new_str(content: &[u8], hash: u32) -> Self {
        let mut bytes = Vec::with_capacity(content.len() + 1);
        bytes.extend_from_slice(content);
        bytes.push(0); // terminator for C-string consumers
        Entry {
            payload: Payload::Str {
                bytes: bytes.into_boxed_slice(),
                hash,
            },
            chain_next: None,
            mark: Mark::Unmarked,
        }
    }

    pub(crate) fn new_ident(host: HostRef, tag: i32) -> Self {
        Entry {
            payload: Payload::Ident { host, tag },
            chain_next: None,
            mark: Mark::Unmarked,
        }
    }

    /// String content without the trailing terminator; `None` for identity
    /// entries.
    pub(crate) fn str_content(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Str { bytes, .. } => Some(&bytes[..bytes.len() - 1]),
            Payload::Ident { .. } => None,
        }
    }

    /// Hash used for bucket placement. String entries reuse the cached
    /// content hash; identity entries recompute it from the address.
    pub(crate) fn placement_hash(&self) -> u32 {
        match &self.payload {
            Payload::Str { hash, .. } => *hash,
            Payload::Ident { host, .. } => hash_host(host.addr()),
        }
    }

    /// Bytes charged against the collector's memory accounting: header
    /// plus content length for strings, the bare header for identities.
    pub(crate) fn footprint(&self) -> usize {
        let header = std::mem::size_of::<Entry>();
        match &self.payload {
            Payload::Str { bytes, .. } => header + (bytes.len() - 1),
            Payload::Ident { .. } => header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn string_entry_keeps_terminator() {
        let entry = Entry::new_str(b"cat", 42);
        assert_eq!(entry.str_content(), Some(&b"cat"[..]));
        match &entry.payload {
            Payload::Str { bytes, hash } => {
                assert_eq!(&bytes[..], b"cat\0");
                assert_eq!(*hash, 42);
            }
            Payload::Ident { .. } => panic!("expected a string payload"),
        }
    }

    #[test]
    fn empty_string_entry() {
        let entry = Entry::new_str(b"", 0);
        assert_eq!(entry.str_content(), Some(&b""[..]));
        assert_eq!(entry.footprint(), std::mem::size_of::<Entry>());
    }

    #[test]
    fn footprints() {
        let header = std::mem::size_of::<Entry>();
        assert_eq!(Entry::new_str(b"cats", 0).footprint(), header + 4);
        assert_eq!(
            Entry::new_ident(HostRef::from_addr(0x1000), 3).footprint(),
            header
        );
    }

    #[test]
    fn identity_entry_has_no_string_content() {
        let entry = Entry::new_ident(HostRef::from_addr(8), 1);
        assert_eq!(entry.str_content(), None);
        assert_eq!(entry.placement_hash(), 8);
    }

    #[test]
    fn new_entries_start_unmarked_and_unchained() {
        let entry = Entry::new_str(b"x", 1);
        assert_eq!(entry.mark, Mark::Unmarked);
        assert_eq!(entry.chain_next, None);
    }
}
