//! Fixed-seed shard shuffling.
//!
//! The distribution decorrelates shard positions from the sorted
//! instance order through a permutation that is a pure function of the
//! ring size. Every process computes the same permutation, so all
//! distributors agree on placement without coordination.
//!
//! The permutation is an incremental Fisher–Yates: element `i` is
//! inserted by swapping with a position `j ∈ [0, i]` drawn from an
//! immutable arena of splitmix64 values built once at process start.
//! Because insertion is incremental, growing the ring from `m` to `n`
//! displaces only O(n − m) positions.

use std::sync::OnceLock;

const SHUFFLE_SEED: u64 = 0x5EED_FA11_DEAD_C0DE;

/// Swap indices are precomputed for rings up to this size; larger rings
/// fall back to computing them on the fly from the same function.
const ARENA_SIZE: usize = 4096;

static ARENA: OnceLock<Vec<u32>> = OnceLock::new();

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Swap index for insertion step `i`: a value in `[0, i]`.
fn delta(i: usize) -> u32 {
    (splitmix64(SHUFFLE_SEED ^ i as u64) % (i as u64 + 1)) as u32
}

fn arena() -> &'static [u32] {
    ARENA.get_or_init(|| (0..ARENA_SIZE).map(delta).collect())
}

/// The shard permutation for a ring of `n` positions.
///
/// Pure function of `n`: `permutation(n)[i]` is the pre-shuffle position
/// whose owner serves shard `i`.
pub fn permutation(n: usize) -> Vec<u32> {
    let deltas = arena();
    let mut v: Vec<u32> = Vec::with_capacity(n);
    for i in 0..n {
        let j = if i < deltas.len() { deltas[i] } else { delta(i) } as usize;
        if j == i {
            v.push(i as u32);
        } else {
            let displaced = v[j];
            v[j] = i as u32;
            v.push(displaced);
        }
    }
    v
}
