//! Deterministic string hashing for the hashing trick.
//!
//! Indices have to agree between the file a model was trained on and the
//! file it scores, possibly produced by a different process on a different
//! machine, so nothing here is seeded. The digest is MD5 read as a 128-bit
//! big-endian integer, which matches the indices produced by the older
//! conversion scripts.

/// Maps `key` into `[0, nr_bins)`.
///
/// For `nr_bins >= 2` the output avoids zero and lies in `[1, nr_bins)`.
/// A single bin always maps to 0. Zero bins is a configuration error and is
/// caught before any hashing happens, but still maps to 0 here.
pub fn hash_str(key: &str, nr_bins: u64) -> u64 {
    if nr_bins < 2 {
        return 0;
    }
    let digest = md5::compute(key.as_bytes());
    let wide = u128::from_be_bytes(digest.0);
    (wide % u128::from(nr_bins - 1)) as u64 + 1
}

/// Hash key for a field value: the field discriminator followed directly by
/// the value, so equal values in different fields land in different bins.
pub fn field_key(discriminator: u32, value: &str) -> String {
    format!("{}{}", discriminator, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_digest() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        let wide = 0xd41d8cd98f00b204e9800998ecf8427e_u128;
        let expected = (wide % 9_999_999) as u64 + 1;
        assert_eq!(hash_str("", 10_000_000), expected);
    }

    #[test]
    fn single_bin() {
        assert_eq!(hash_str("anything", 1), 0);
        assert_eq!(hash_str("", 1), 0);
    }

    #[test]
    fn discriminator_separates_fields() {
        assert_eq!(field_key(1, "1500"), "11500");
        assert_eq!(field_key(2, ""), "2");
        assert_ne!(
            hash_str(&field_key(3, "abc"), 1 << 40),
            hash_str(&field_key(4, "abc"), 1 << 40)
        );
    }

    #[test]
    fn spreads_over_bins() {
        let nr_bins = 16;
        let mut seen = vec![0usize; nr_bins as usize];
        for i in 0..4096 {
            seen[hash_str(&format!("key{}", i), nr_bins) as usize] += 1;
        }
        assert_eq!(seen[0], 0);
        // 4096 keys over 15 bins, expect ~273 per bin
        for &count in &seen[1..] {
            assert!(count > 150 && count < 400, "skewed bin count {}", count);
        }
    }

    proptest! {
        #[test]
        fn prop_in_range(key in ".*", nr_bins in 1_u64..u64::MAX) {
            let h = hash_str(&key, nr_bins);
            prop_assert!(h < nr_bins);
        }

        #[test]
        fn prop_deterministic(key in ".*", nr_bins in 1_u64..1_000_000_000) {
            prop_assert_eq!(hash_str(&key, nr_bins), hash_str(&key.clone(), nr_bins));
        }
    }
}
