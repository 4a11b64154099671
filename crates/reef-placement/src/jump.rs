//! Jump consistent hash (Lamping & Veach).

/// Map `key` to a bucket in `[0, buckets)`.
///
/// Pure and deterministic: the same inputs always yield the same bucket,
/// buckets are filled uniformly, and changing `buckets` reassigns only
/// the minimal necessary fraction of keys. Returns 0 when `buckets` is 0.
pub fn jump(mut key: u64, buckets: u32) -> u32 {
    if buckets == 0 {
        return 0;
    }
    let mut b: i64 = -1;
    let mut j: i64 = 0;
    while j < i64::from(buckets) {
        b = j;
        key = key.wrapping_mul(2862933555777941757).wrapping_add(1);
        j = ((b + 1) as f64 * ((1u64 << 31) as f64 / ((key >> 33) + 1) as f64)) as i64;
    }
    b as u32
}
