//! String and identity interning for the Rill runtime.
//!
//! Every distinct immutable byte sequence, and every distinct
//! `(host, tag)` identity pair, is represented by exactly one entry for
//! the lifetime of a [`StringPool`]. Callers hold [`EntryRef`]s to the
//! canonical entries, so equality is a single index comparison and
//! repeated literals cost one allocation total.
//!
//! # Layout
//!
//! The pool statically partitions its namespace across 63 small
//! open-chained hash tables: [`STR_SHARDS`] string tables selected by a
//! first-plus-last-byte pre-hash, then [`IDENT_SHARDS`] identity tables
//! selected by address modulo (see the constants for why the two use
//! different operators). Each table starts at capacity 1 and doubles when
//! overfull; entries live in an index-based arena, so references survive
//! every resize.
//!
//! # Collection
//!
//! The pool never frees entries on its own. An external collector drives
//! lifetime through [`StringPool::mark`], [`StringPool::pin`],
//! [`StringPool::sweep_unreachable`] and [`StringPool::release`], and
//! reads [`StringPool::mem_used`] for its memory accounting.
//!
//! Single-threaded by design: the runtime owns one mutable pool and every
//! operation runs to completion without yielding.

mod arena;
mod entry;
mod error;
mod hash;
mod pool;
mod table;

pub use entry::{EntryRef, HostRef, Mark};
pub use error::PoolError;
pub use hash::hash_bytes;
pub use pool::{StringPool, ANY_TAG, IDENT_SHARDS, STR_SHARDS};
