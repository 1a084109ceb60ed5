//! Byte-sampling hash over immutable byte sequences.
//!
//! The accumulator is seeded with the sequence length, then bytes are
//! folded in from the end of the sequence at a stride of `(len >> 6) + 1`.
//! Inputs longer than 64 bytes are therefore sub-sampled: hashing stays
//! cheap for long literals, and any resulting collision is resolved by the
//! bucket chain's exact byte comparison. The hash is never trusted on its
//! own.

/// Hash a byte sequence.
///
/// Deterministic and pure; byte-equal content always hashes equally, and
/// the empty sequence is well-defined (it hashes to its length seed, 0).
/// Equal hashes do not imply equal content.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the seed only needs the low bits of the length"
    )]
    let mut h = bytes.len() as u32;
    let step = (bytes.len() >> 6) + 1;
    for i in (0..bytes.len()).rev().step_by(step) {
        h ^= (h << 5)
            .wrapping_add(h >> 2)
            .wrapping_add(u32::from(bytes[i]));
    }
    h
}

/// Pre-hash for identity entries: the low bits of the host address.
///
/// The address is hashed by value; it is never dereferenced.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the low bits of an address carry its entropy"
)]
#[must_use]
pub(crate) fn hash_host(addr: usize) -> u32 {
    addr as u32
}
